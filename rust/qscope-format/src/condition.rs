//! Typed restriction conditions.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use qscope_common::{Result, error::Error};

use crate::handle::{is_condition_value, is_handle};

/// An attribute family: the whole-text family, or an XML element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Text,
    Element(String),
}

impl Family {
    /// Name of the whole-text family inside restriction strings.
    pub const TEXT_SENTINEL: &'static str = "--text";

    /// Name of the whole-text family inside URL fragments.
    pub const TEXT_URL_SENTINEL: &'static str = "-";

    /// Name of the whole-text family as a structural attribute (and in item lists).
    pub const TEXT_ELEMENT: &'static str = "text";

    /// Interprets a family name from any of the string forms.
    pub fn from_name(name: &str) -> Result<Family> {
        match name {
            Self::TEXT_SENTINEL | Self::TEXT_URL_SENTINEL | Self::TEXT_ELEMENT => Ok(Family::Text),
            _ if is_handle(name) => Ok(Family::Element(name.to_string())),
            _ => Err(Error::parse("attribute family", name)),
        }
    }

    /// Form used in restriction serializations.
    pub fn serial_name(&self) -> &str {
        match self {
            Family::Text => Self::TEXT_SENTINEL,
            Family::Element(name) => name,
        }
    }

    /// Form used in URL fragments.
    pub fn url_name(&self) -> &str {
        match self {
            Family::Text => Self::TEXT_URL_SENTINEL,
            Family::Element(name) => name,
        }
    }

    /// Name of the structural attribute whose regions are the items of this family.
    pub fn element_name(&self) -> &str {
        match self {
            Family::Text => Self::TEXT_ELEMENT,
            Family::Element(name) => name,
        }
    }

    /// Handle of the structural attribute carrying `field` for this family,
    /// e.g. `u_who` or `text_genre`.
    pub fn attribute_handle(&self, field: &str) -> String {
        format!("{}_{field}", self.element_name())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Family::Text)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.serial_name())
    }
}

/// One `field~value` (or `field/subfield~value`) predicate.
///
/// `linked_subfield` is set when the predicate addresses a column of the table
/// linked through an id-link attribute: in `who/sex~f`, `who` holds ids into a
/// speaker table whose `sex` column must equal `f`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Condition {
    pub family: Family,
    pub field: String,
    pub linked_subfield: Option<String>,
    pub value: String,
}

impl Condition {
    pub fn new(family: Family, field: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let condition = Condition {
            family,
            field: field.into(),
            linked_subfield: None,
            value: value.into(),
        };
        condition.verify()?;
        Ok(condition)
    }

    pub fn linked(
        family: Family,
        field: impl Into<String>,
        subfield: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        let condition = Condition {
            family,
            field: field.into(),
            linked_subfield: Some(subfield.into()),
            value: value.into(),
        };
        condition.verify()?;
        Ok(condition)
    }

    /// Parses `FIELD~VALUE` or `FIELD/SUBFIELD~VALUE`.
    pub fn parse(family: Family, s: &str) -> Result<Self> {
        let (lhs, value) = s
            .split_once('~')
            .ok_or_else(|| Error::parse("condition", s))?;
        let (field, linked_subfield) = match lhs.split_once('/') {
            Some((field, sub)) => (field, Some(sub.to_string())),
            None => (lhs, None),
        };
        let condition = Condition {
            family,
            field: field.to_string(),
            linked_subfield,
            value: value.to_string(),
        };
        condition.verify().map_err(|_| Error::parse("condition", s))?;
        Ok(condition)
    }

    fn verify(&self) -> Result<()> {
        let shape_ok = is_handle(&self.field)
            && self.linked_subfield.as_deref().is_none_or(is_handle)
            && is_condition_value(&self.value);
        if shape_ok {
            Ok(())
        } else {
            Err(Error::parse("condition", self.to_string()))
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked_subfield.is_some()
    }

    /// The key predicates are grouped by: values under one key are alternatives.
    pub fn key(&self) -> FieldKey {
        FieldKey {
            field: self.field.clone(),
            linked_subfield: self.linked_subfield.clone(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.linked_subfield {
            Some(sub) => write!(f, "{}/{sub}~{}", self.field, self.value),
            None => write!(f, "{}~{}", self.field, self.value),
        }
    }
}

/// A field, or a linked-table column reached through a field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKey {
    pub field: String,
    pub linked_subfield: Option<String>,
}

/// All predicates on one attribute family.
///
/// An empty predicate set is the bare "must occur within" marker: any region
/// of the family qualifies. Otherwise predicates sharing a [`FieldKey`] are
/// alternatives, and distinct keys must all hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConditionSet {
    family: Family,
    conditions: BTreeSet<Condition>,
}

impl ConditionSet {
    pub fn within(family: Family) -> Self {
        ConditionSet {
            family,
            conditions: BTreeSet::new(),
        }
    }

    pub fn family(&self) -> &Family {
        &self.family
    }

    pub fn conditions(&self) -> &BTreeSet<Condition> {
        &self.conditions
    }

    pub fn is_within_only(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn insert(&mut self, condition: Condition) -> Result<()> {
        if condition.family != self.family {
            return Err(Error::invalid_arg(
                "condition",
                format!(
                    "condition on {} added to the {} set",
                    condition.family, self.family
                ),
            ));
        }
        self.conditions.insert(condition);
        Ok(())
    }

    /// Predicates grouped by field: `field -> accepted values`.
    pub fn grouped(&self) -> BTreeMap<FieldKey, BTreeSet<&str>> {
        let mut groups: BTreeMap<FieldKey, BTreeSet<&str>> = BTreeMap::new();
        for condition in &self.conditions {
            groups
                .entry(condition.key())
                .or_default()
                .insert(condition.value.as_str());
        }
        groups
    }

    /// Canonical form: `FAMILY` or `FAMILY|COND.COND`, conditions in binary order.
    pub fn serialise(&self) -> String {
        let mut out = self.family.serial_name().to_string();
        if !self.conditions.is_empty() {
            let mut conds: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
            conds.sort_unstable();
            out.push('|');
            out.push_str(&conds.join("."));
        }
        out
    }

    /// Parses `FAMILY` or `FAMILY|COND.COND`.
    pub fn parse(s: &str) -> Result<Self> {
        let (family, conds) = match s.split_once('|') {
            Some((family, conds)) => (family, Some(conds)),
            None => (s, None),
        };
        let family = Family::from_name(family).map_err(|_| Error::parse("condition set", s))?;
        let mut set = ConditionSet::within(family.clone());
        if let Some(conds) = conds {
            for cond in conds.split('.') {
                set.conditions.insert(Condition::parse(family.clone(), cond)?);
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_shapes() {
        let c = Condition::parse(Family::Text, "genre~fiction").unwrap();
        assert_eq!(c.field, "genre");
        assert!(c.linked_subfield.is_none());
        assert_eq!(c.to_string(), "genre~fiction");

        let c = Condition::parse(Family::Element("u".into()), "who/sex~f").unwrap();
        assert_eq!(c.field, "who");
        assert_eq!(c.linked_subfield.as_deref(), Some("sex"));
        assert_eq!(c.to_string(), "who/sex~f");

        for bad in ["genre", "~x", "genre~", "ge nre~x", "a/~x", "a/b/c~x", "a~b~c"] {
            assert!(
                Condition::parse(Family::Text, bad).unwrap_err().is_parse_failure(),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_family_names() {
        assert_eq!(Family::from_name("--text").unwrap(), Family::Text);
        assert_eq!(Family::from_name("-").unwrap(), Family::Text);
        assert_eq!(Family::from_name("text").unwrap(), Family::Text);
        assert_eq!(
            Family::from_name("heading").unwrap(),
            Family::Element("heading".into())
        );
        assert!(Family::from_name("").is_err());
        assert!(Family::from_name("a b").is_err());
        assert_eq!(Family::Text.attribute_handle("id"), "text_id");
    }

    #[test]
    fn test_set_serialise_sorts_conditions() {
        let set = ConditionSet::parse("u|who/sex~f.mode~spoken.mode~radio").unwrap();
        assert_eq!(set.serialise(), "u|mode~radio.mode~spoken.who/sex~f");
        assert_eq!(ConditionSet::parse(&set.serialise()).unwrap(), set);

        let within = ConditionSet::parse("heading").unwrap();
        assert!(within.is_within_only());
        assert_eq!(within.serialise(), "heading");
    }

    #[test]
    fn test_grouping() {
        let set = ConditionSet::parse("--text|genre~a.genre~b.year~1990").unwrap();
        let groups = set.grouped();
        assert_eq!(groups.len(), 2);
        let genre = FieldKey {
            field: "genre".into(),
            linked_subfield: None,
        };
        assert_eq!(groups[&genre].iter().copied().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_insert_checks_family() {
        let mut set = ConditionSet::within(Family::Text);
        let cond = Condition::new(Family::Element("u".into()), "who", "x").unwrap();
        assert!(set.insert(cond).is_err());
    }
}
