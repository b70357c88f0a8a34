//! The parsed, canonical form of a restriction.

use std::{collections::BTreeMap, fmt};

use itertools::Itertools;
use qscope_common::{Result, error::Error};

use crate::condition::{Condition, ConditionSet, Family};

/// Kind of item a scope is made of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// Whole texts.
    Text,
    /// Regions of one XML element.
    Element(String),
    /// More than one family is constrained; the scope's items are arbitrary
    /// intersections of regions.
    Mixed,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Text => f.write_str(Family::TEXT_ELEMENT),
            ItemType::Element(name) => f.write_str(name),
            ItemType::Mixed => f.write_str("mixed"),
        }
    }
}

/// A conjunction of condition sets, at most one per attribute family.
///
/// Sets are keyed by family so two specs built from the same conditions in any
/// order compare equal and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RestrictionSpec {
    sets: BTreeMap<Family, ConditionSet>,
}

impl RestrictionSpec {
    const SINGLE_PREFIX: &'static str = "$";
    const MULTI_PREFIX: &'static str = "@";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> impl Iterator<Item = &ConditionSet> {
        self.sets.values()
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn get(&self, family: &Family) -> Option<&ConditionSet> {
        self.sets.get(family)
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.sets.keys()
    }

    /// Requires matches to fall within some region of `family`.
    ///
    /// Has no effect when the family already carries predicates, since those
    /// imply the marker.
    pub fn add_within(&mut self, family: Family) {
        self.sets
            .entry(family.clone())
            .or_insert_with(|| ConditionSet::within(family));
    }

    pub fn add_condition(&mut self, condition: Condition) -> Result<()> {
        let family = condition.family.clone();
        self.sets
            .entry(family.clone())
            .or_insert_with(|| ConditionSet::within(family))
            .insert(condition)
    }

    fn add_set(&mut self, set: ConditionSet) -> Result<()> {
        let family = set.family().clone();
        if set.is_within_only() {
            self.add_within(family);
            return Ok(());
        }
        for condition in set.conditions() {
            self.add_condition(condition.clone())?;
        }
        Ok(())
    }

    pub fn item_type(&self) -> ItemType {
        let mut families = self.sets.keys();
        match (families.next(), families.next()) {
            (Some(Family::Text), None) => ItemType::Text,
            (Some(Family::Element(name)), None) => ItemType::Element(name.clone()),
            _ => ItemType::Mixed,
        }
    }

    /// The single family of a one-set restriction.
    pub fn single_family(&self) -> Option<&Family> {
        if self.sets.len() == 1 {
            self.sets.keys().next()
        } else {
            None
        }
    }

    /// Canonical string form: `$^SET` for one family, `@^SET^SET...` for
    /// several, sets in binary order of their own serialization.
    pub fn serialise(&self) -> String {
        let sets = self
            .sets
            .values()
            .map(ConditionSet::serialise)
            .sorted_unstable()
            .collect::<Vec<_>>();
        let prefix = if sets.len() == 1 {
            Self::SINGLE_PREFIX
        } else {
            Self::MULTI_PREFIX
        };
        std::iter::once(prefix.to_string()).chain(sets).join("^")
    }

    /// Parses a restriction string. The result is canonical: re-serializing it
    /// yields the canonical form even if `s` was differently ordered.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('^').collect();
        if parts.len() < 2 {
            return Err(Error::parse("restriction", s));
        }
        match parts[0] {
            Self::SINGLE_PREFIX if parts.len() == 2 => {}
            Self::MULTI_PREFIX => {}
            _ => return Err(Error::parse("restriction", s)),
        }
        let mut spec = RestrictionSpec::new();
        for part in &parts[1..] {
            let set = ConditionSet::parse(part).map_err(|_| Error::parse("restriction", s))?;
            spec.add_set(set)?;
        }
        Ok(spec)
    }

    /// True when `s` looks like a restriction string (by its first byte).
    pub fn is_restriction_string(s: &str) -> bool {
        s.starts_with(Self::SINGLE_PREFIX) || s.starts_with(Self::MULTI_PREFIX)
    }
}

impl fmt::Display for RestrictionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialise())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> RestrictionSpec {
        RestrictionSpec::parse(s).unwrap()
    }

    #[test]
    fn test_single_family_forms() {
        assert_eq!(spec("$^heading").serialise(), "$^heading");
        assert_eq!(
            spec("$^heading|rend~bold").serialise(),
            "$^heading|rend~bold"
        );
        assert_eq!(
            spec("$^--text|year~1990.genre~fiction").serialise(),
            "$^--text|genre~fiction.year~1990"
        );
        assert_eq!(spec("$^--text|genre~fiction").item_type(), ItemType::Text);
        assert_eq!(
            spec("$^u|who/sex~f").item_type(),
            ItemType::Element("u".into())
        );
    }

    #[test]
    fn test_multi_family_order() {
        let a = spec("@^u|who/sex~f^--text|genre~fiction^heading");
        let b = spec("@^heading^--text|genre~fiction^u|who/sex~f");
        assert_eq!(a, b);
        // '-' (0x2d) sorts before letters.
        assert_eq!(a.serialise(), "@^--text|genre~fiction^heading^u|who/sex~f");
        assert_eq!(a.item_type(), ItemType::Mixed);
        assert_eq!(a.set_count(), 3);
    }

    #[test]
    fn test_sets_sort_by_serialization_not_family() {
        // "ab|x~1" < "a|y~1" because 'b' (0x62) < '|' (0x7c).
        let s = spec("@^a|y~1^ab|x~1");
        assert_eq!(s.serialise(), "@^ab|x~1^a|y~1");
    }

    #[test]
    fn test_round_trip() {
        for s in [
            "$^heading",
            "$^--text|genre~fiction.genre~poetry",
            "@^--text|year~1990^u|mode~radio.who/age~30",
            "$^u|who/sex~f.who/sex~m",
        ] {
            let parsed = spec(s);
            assert_eq!(parsed.serialise(), s);
            assert_eq!(RestrictionSpec::parse(&parsed.serialise()).unwrap(), parsed);
        }
    }

    #[test]
    fn test_duplicate_families_merge() {
        assert_eq!(
            spec("@^u|mode~a^u|mode~b").serialise(),
            "$^u|mode~a.mode~b"
        );
        assert_eq!(spec("@^u^u|mode~a").serialise(), "$^u|mode~a");
    }

    #[test]
    fn test_parse_failures() {
        for bad in [
            "",
            "$",
            "@",
            "$^",
            "#^heading",
            "$^heading^u",
            "$^heading|rend",
            "$^heading|rend~",
            "$^|rend~bold",
            "$^heading|rend~bold.",
            "@^heading^",
        ] {
            assert!(
                RestrictionSpec::parse(bad).unwrap_err().is_parse_failure(),
                "{bad:?}"
            );
        }
    }
}
