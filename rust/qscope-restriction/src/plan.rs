//! Turning condition sets into evaluation plans.
//!
//! Planning is also where fields are checked against the metadata store: a
//! condition on a field the corpus does not have, or on a free-text field,
//! fails with a parse error just like a malformed string.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use qscope_backend::{FieldFilter, FieldKind};
use qscope_common::{Result, error::Error};
use qscope_format::{ConditionSet, Family, RestrictionSpec};

use crate::ScopeContext;

/// How one condition set is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SetPlan {
    /// Texts whose metadata matches `filters`; no filters means any text.
    Texts { filters: Vec<FieldFilter> },
    /// Any region of `element`.
    Within { element: String },
    /// Regions of `element` whose `handle` value is one of `values`.
    Values {
        element: String,
        handle: String,
        kind: FieldKind,
        values: BTreeSet<String>,
    },
    /// Regions of `element` whose `handle` value is a linked row matching
    /// `filters`.
    Linked {
        element: String,
        handle: String,
        filters: Vec<FieldFilter>,
    },
    /// Regions of `element` passing every test, checked one region at a time.
    Tabulated {
        element: String,
        tests: Vec<RegionTest>,
    },
}

/// One test of a tabulated plan, against the value of `handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegionTest {
    pub handle: String,
    pub accept: Accept,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Accept {
    Values(BTreeSet<String>),
    LinkedRows(Vec<FieldFilter>),
}

impl SetPlan {
    pub fn element(&self) -> &str {
        match self {
            SetPlan::Texts { .. } => Family::TEXT_ELEMENT,
            SetPlan::Within { element }
            | SetPlan::Values { element, .. }
            | SetPlan::Linked { element, .. }
            | SetPlan::Tabulated { element, .. } => element,
        }
    }
}

/// Plans every set of `spec`, in the spec's family order.
pub(crate) fn plan(ctx: &ScopeContext<'_>, spec: &RestrictionSpec) -> Result<Vec<SetPlan>> {
    spec.sets().map(|set| plan_set(ctx, set)).collect()
}

fn plan_set(ctx: &ScopeContext<'_>, set: &ConditionSet) -> Result<SetPlan> {
    match set.family() {
        Family::Text => plan_texts(ctx, set),
        Family::Element(element) => plan_element(ctx, element, set),
    }
}

fn plan_texts(ctx: &ScopeContext<'_>, set: &ConditionSet) -> Result<SetPlan> {
    let mut filters = Vec::new();
    for (key, values) in set.grouped() {
        if key.linked_subfield.is_some() {
            return Err(Error::parse("text condition", set.serialise()));
        }
        match ctx.metadata.text_field_kind(ctx.corpus, &key.field)? {
            Some(FieldKind::Classification) => {}
            _ => return Err(Error::parse("text field", key.field)),
        }
        filters.push(FieldFilter::new(key.field, values));
    }
    Ok(SetPlan::Texts { filters })
}

fn plan_element(ctx: &ScopeContext<'_>, element: &str, set: &ConditionSet) -> Result<SetPlan> {
    let family = set.family();
    let groups = set.grouped();
    if groups.is_empty() {
        return Ok(SetPlan::Within {
            element: element.to_string(),
        });
    }

    let mut kinds = BTreeMap::new();
    for key in groups.keys() {
        let handle = family.attribute_handle(&key.field);
        let kind = match kinds.get(&handle) {
            Some(&kind) => kind,
            None => {
                let kind = ctx
                    .metadata
                    .xml_field_kind(ctx.corpus, &handle)?
                    .ok_or_else(|| Error::parse("attribute", handle.clone()))?;
                kinds.insert(handle.clone(), kind);
                kind
            }
        };
        let usable = match (kind, key.linked_subfield.is_some()) {
            (FieldKind::FreeText, _) => false,
            (FieldKind::IdLink, _) => true,
            (_, linked) => !linked,
        };
        if !usable {
            return Err(Error::parse("attribute", handle));
        }
    }

    let fields: Vec<&str> = groups.keys().map(|k| k.field.as_str()).dedup().collect();
    let all_linked = groups.keys().all(|k| k.linked_subfield.is_some());
    if let [field] = fields[..] {
        let handle = family.attribute_handle(field);
        if all_linked {
            return Ok(SetPlan::Linked {
                element: element.to_string(),
                handle,
                filters: linked_filters(&groups, field),
            });
        }
        if groups.len() == 1 {
            let values = groups.values().flatten().map(|v| v.to_string()).collect();
            return Ok(SetPlan::Values {
                element: element.to_string(),
                kind: kinds[&handle],
                handle,
                values,
            });
        }
    }

    let mut tests = Vec::new();
    for field in fields {
        let handle = family.attribute_handle(field);
        for (key, values) in groups.iter().filter(|(k, _)| k.field == field) {
            if key.linked_subfield.is_none() {
                tests.push(RegionTest {
                    handle: handle.clone(),
                    accept: Accept::Values(values.iter().map(|v| v.to_string()).collect()),
                });
            }
        }
        let filters = linked_filters(&groups, field);
        if !filters.is_empty() {
            tests.push(RegionTest {
                handle,
                accept: Accept::LinkedRows(filters),
            });
        }
    }
    Ok(SetPlan::Tabulated {
        element: element.to_string(),
        tests,
    })
}

/// One filter per linked column reached through `field`.
fn linked_filters(
    groups: &BTreeMap<qscope_format::condition::FieldKey, BTreeSet<&str>>,
    field: &str,
) -> Vec<FieldFilter> {
    groups
        .iter()
        .filter(|(key, _)| key.field == field)
        .filter_map(|(key, values)| {
            let column = key.linked_subfield.as_deref()?;
            Some(FieldFilter::new(column, values.iter().copied()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use qscope_testkit::TestEnv;

    use super::*;

    fn plan_str(env: &TestEnv, s: &str) -> Result<Vec<SetPlan>> {
        let metadata = env.metadata();
        let ctx = ScopeContext::new("demo", "alice", &env.config, &env.engine, &metadata, &env.db);
        plan(&ctx, &RestrictionSpec::parse(s)?)
    }

    #[test]
    fn test_plan_shapes() {
        let env = TestEnv::demo().unwrap();
        assert_eq!(
            plan_str(&env, "$^--text|genre~fiction.genre~news").unwrap(),
            vec![SetPlan::Texts {
                filters: vec![FieldFilter::new("genre", ["fiction", "news"])]
            }]
        );
        assert_eq!(
            plan_str(&env, "$^heading").unwrap(),
            vec![SetPlan::Within {
                element: "heading".into()
            }]
        );
        assert!(matches!(
            &plan_str(&env, "$^u|mode~tv").unwrap()[..],
            [SetPlan::Values { kind: FieldKind::Classification, handle, .. }] if handle == "u_mode"
        ));
        assert_eq!(
            plan_str(&env, "$^u|who/age~old.who/sex~f").unwrap(),
            vec![SetPlan::Linked {
                element: "u".into(),
                handle: "u_who".into(),
                filters: vec![
                    FieldFilter::new("age", ["old"]),
                    FieldFilter::new("sex", ["f"])
                ],
            }]
        );
    }

    #[test]
    fn test_multi_field_is_tabulated() {
        let env = TestEnv::demo().unwrap();
        let plans = plan_str(&env, "$^u|mode~radio.who/sex~f").unwrap();
        let [SetPlan::Tabulated { element, tests }] = &plans[..] else {
            panic!("unexpected {plans:?}");
        };
        assert_eq!(element, "u");
        assert_eq!(
            tests.iter().map(|t| t.handle.as_str()).collect::<Vec<_>>(),
            vec!["u_mode", "u_who"]
        );
    }

    #[test]
    fn test_unknown_and_free_text_fields_rejected() {
        let env = TestEnv::demo().unwrap();
        for s in [
            "$^--text|author~x",
            "$^--text|title~First",
            "$^u|colour~red",
            "$^u|mode/sex~f",
            "$^--text|genre/x~y",
        ] {
            let err = plan_str(&env, s).unwrap_err();
            assert!(err.is_parse_failure(), "{s}: {err}");
        }
    }
}
