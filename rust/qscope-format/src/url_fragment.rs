//! Scopes in URL query-string form:
//! `del=begin&t=ITEM&t=ITEM&del=end`.
//!
//! An `ITEM` is one of
//! - `FAMILY`: a "must occur within" marker (`-` is the whole-text family),
//! - `FAMILY|FIELD~VALUE` or `FAMILY|FIELD/SUBFIELD~VALUE`: a condition,
//! - `FIELD~VALUE`: a condition on the whole-text family,
//! - `~sc~ID`: a saved subcorpus.
//!
//! Parameters outside the `del=begin` ... `del=end` delimiters belong to other
//! parts of the request and are ignored.

use url::form_urlencoded;

use qscope_common::{Result, error::Error};

use crate::{
    condition::{Condition, Family},
    restriction_spec::RestrictionSpec,
    scope_string::SubcorpusId,
};

const SUBCORPUS_PREFIX: &str = "~sc~";
const DELETED_MARKER: &str = "deleted";

/// What a URL fragment selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlScope {
    WholeCorpus,
    Subcorpus(SubcorpusId),
    DeletedSubcorpus,
    Restriction(RestrictionSpec),
}

impl UrlScope {
    /// Parses the scope items out of a query string (with or without a
    /// leading `?`).
    ///
    /// No items at all selects the whole corpus. A malformed item fails the
    /// whole fragment.
    pub fn parse(query: &str) -> Result<UrlScope> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut inside = false;
        let mut items = Vec::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match (key.as_ref(), value.as_ref()) {
                ("del", "begin") => inside = true,
                ("del", "end") => inside = false,
                ("t", item) if inside => items.push(item.to_string()),
                _ => {}
            }
        }

        if items.is_empty() {
            return Ok(UrlScope::WholeCorpus);
        }

        if let Some(sc) = items.iter().find_map(|i| i.strip_prefix(SUBCORPUS_PREFIX)) {
            if items.len() > 1 {
                return Err(Error::parse(
                    "url scope",
                    "a subcorpus cannot be combined with other scope items",
                ));
            }
            if sc == DELETED_MARKER {
                return Ok(UrlScope::DeletedSubcorpus);
            }
            return sc.parse().map(UrlScope::Subcorpus);
        }

        let mut spec = RestrictionSpec::new();
        for item in &items {
            parse_item(item, &mut spec)?;
        }
        Ok(UrlScope::Restriction(spec))
    }

    pub fn serialise(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        out.append_pair("del", "begin");
        match self {
            UrlScope::WholeCorpus => {}
            UrlScope::Subcorpus(id) => {
                out.append_pair("t", &format!("{SUBCORPUS_PREFIX}{id}"));
            }
            UrlScope::DeletedSubcorpus => {
                out.append_pair("t", &format!("{SUBCORPUS_PREFIX}{DELETED_MARKER}"));
            }
            UrlScope::Restriction(spec) => {
                for item in restriction_items(spec) {
                    out.append_pair("t", &item);
                }
            }
        }
        out.append_pair("del", "end");
        out.finish()
    }
}

fn parse_item(item: &str, spec: &mut RestrictionSpec) -> Result<()> {
    if let Some((family, conditions)) = item.split_once('|') {
        let family = Family::from_name(family)?;
        for condition in conditions.split('.') {
            spec.add_condition(Condition::parse(family.clone(), condition)?)?;
        }
    } else if item.contains('~') {
        spec.add_condition(Condition::parse(Family::Text, item)?)?;
    } else {
        spec.add_within(Family::from_name(item)?);
    }
    Ok(())
}

/// One URL item per condition (or per within marker), in canonical order.
fn restriction_items(spec: &RestrictionSpec) -> Vec<String> {
    let mut sets: Vec<_> = spec.sets().map(|set| (set.serialise(), set)).collect();
    sets.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut items = Vec::new();
    for (_, set) in sets {
        let family = set.family().url_name();
        if set.is_within_only() {
            items.push(family.to_string());
            continue;
        }
        let mut conditions: Vec<String> = set.conditions().iter().map(|c| c.to_string()).collect();
        conditions.sort_unstable();
        items.extend(conditions.into_iter().map(|c| format!("{family}|{c}")));
    }
    items
}
