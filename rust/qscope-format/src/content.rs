//! Subcorpus content strings.

use std::collections::BTreeSet;

use itertools::Itertools;
use qscope_common::{Result, error::Error};

use crate::{
    handle::{verify_handle, verify_item_id},
    restriction_spec::RestrictionSpec,
};

/// An explicit set of complete items of one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemList {
    /// Items named by the values of an id attribute (e.g. `text_id`).
    Identified {
        family: String,
        id_attribute: String,
        ids: BTreeSet<String>,
    },
    /// Items named by their zero-based position in the family's region sequence,
    /// for families without an id attribute.
    Positional {
        family: String,
        positions: BTreeSet<u32>,
    },
}

impl ItemList {
    /// Builds an identified list, validating the names and every id.
    /// Duplicates collapse.
    pub fn identified<I, S>(
        family: &str,
        id_attribute: &str,
        ids: I,
        max_id_len: usize,
    ) -> Result<ItemList>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        verify_handle("family", family)?;
        verify_handle("id attribute", id_attribute)?;
        let ids = ids
            .into_iter()
            .map(|id| {
                let id: String = id.into();
                verify_item_id(&id, max_id_len).map(|_| id)
            })
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(ItemList::Identified {
            family: family.to_string(),
            id_attribute: id_attribute.to_string(),
            ids,
        })
    }

    pub fn positional<I>(family: &str, positions: I) -> Result<ItemList>
    where
        I: IntoIterator<Item = u32>,
    {
        verify_handle("family", family)?;
        Ok(ItemList::Positional {
            family: family.to_string(),
            positions: positions.into_iter().collect(),
        })
    }

    /// Builds a list from textual items: ids when `id_attribute` is non-empty,
    /// sequence positions otherwise.
    pub fn from_strings<I, S>(
        family: &str,
        id_attribute: &str,
        items: I,
        max_id_len: usize,
    ) -> Result<ItemList>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if id_attribute.is_empty() {
            let positions = items
                .into_iter()
                .map(|s| {
                    let s = s.as_ref();
                    s.parse::<u32>().map_err(|_| {
                        Error::invalid_arg("item", format!("'{s}' is not a sequence position"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Self::positional(family, positions)
        } else {
            Self::identified(
                family,
                id_attribute,
                items.into_iter().map(|s| s.as_ref().to_string()),
                max_id_len,
            )
        }
    }

    pub fn family(&self) -> &str {
        match self {
            ItemList::Identified { family, .. } | ItemList::Positional { family, .. } => family,
        }
    }

    pub fn id_attribute(&self) -> Option<&str> {
        match self {
            ItemList::Identified { id_attribute, .. } => Some(id_attribute),
            ItemList::Positional { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ItemList::Identified { ids, .. } => ids.len(),
            ItemList::Positional { positions, .. } => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in their canonical order, as strings.
    pub fn items(&self) -> Vec<String> {
        match self {
            ItemList::Identified { ids, .. } => ids.iter().cloned().collect(),
            ItemList::Positional { positions, .. } => {
                positions.iter().map(|p| p.to_string()).collect()
            }
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        match self {
            ItemList::Identified { ids, .. } => ids.contains(item),
            ItemList::Positional { positions, .. } => item
                .parse::<u32>()
                .is_ok_and(|p| positions.contains(&p)),
        }
    }

    /// Returns a list with `items` added. Items are validated like on creation.
    pub fn with_added<I, S>(&self, items: I, max_id_len: usize) -> Result<ItemList>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = Self::from_strings(
            self.family(),
            self.id_attribute().unwrap_or_default(),
            items,
            max_id_len,
        )?;
        Ok(match (self.clone(), extra) {
            (
                ItemList::Identified {
                    family,
                    id_attribute,
                    mut ids,
                },
                ItemList::Identified { ids: more, .. },
            ) => {
                ids.extend(more);
                ItemList::Identified {
                    family,
                    id_attribute,
                    ids,
                }
            }
            (
                ItemList::Positional {
                    family,
                    mut positions,
                },
                ItemList::Positional {
                    positions: more, ..
                },
            ) => {
                positions.extend(more);
                ItemList::Positional { family, positions }
            }
            _ => unreachable!("extra list built with the same id attribute"),
        })
    }

    /// Returns a list with `items` removed. Unknown items are ignored.
    pub fn with_removed<I, S>(&self, items: I) -> ItemList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = self.clone();
        match &mut list {
            ItemList::Identified { ids, .. } => {
                for item in items {
                    ids.remove(item.as_ref());
                }
            }
            ItemList::Positional { positions, .. } => {
                for item in items {
                    if let Ok(p) = item.as_ref().parse::<u32>() {
                        positions.remove(&p);
                    }
                }
            }
        }
        list
    }

    /// `^FAMILY^SUBATTR^ID ID ...`
    pub fn serialise(&self) -> String {
        format!(
            "^{}^{}^{}",
            self.family(),
            self.id_attribute().unwrap_or_default(),
            self.items().iter().join(" ")
        )
    }
}

/// The content column of a saved subcorpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubcorpusContent {
    List(ItemList),
    Restriction(RestrictionSpec),
    /// The member intervals exist only in the subcorpus dumpfile.
    Arbitrary,
}

impl SubcorpusContent {
    pub const ARBITRARY: &'static str = "^^^";

    pub fn serialise(&self) -> String {
        match self {
            SubcorpusContent::List(list) => list.serialise(),
            SubcorpusContent::Restriction(spec) => spec.serialise(),
            SubcorpusContent::Arbitrary => Self::ARBITRARY.to_string(),
        }
    }

    /// Parses a content string. The first byte selects the mode: `^` for an
    /// item list or arbitrary content, `$`/`@` for a restriction.
    ///
    /// Stored ids are not re-validated against the length limit.
    pub fn parse(s: &str) -> Result<SubcorpusContent> {
        if RestrictionSpec::is_restriction_string(s) {
            return RestrictionSpec::parse(s).map(SubcorpusContent::Restriction);
        }
        if s == Self::ARBITRARY {
            return Ok(SubcorpusContent::Arbitrary);
        }
        let parts: Vec<&str> = s.split('^').collect();
        if parts.len() != 4 || !parts[0].is_empty() {
            return Err(Error::parse("subcorpus content", s));
        }
        let items = parts[3].split(' ').filter(|item| !item.is_empty());
        ItemList::from_strings(parts[1], parts[2], items, usize::MAX)
            .map(SubcorpusContent::List)
            .map_err(|_| Error::parse("subcorpus content", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identified_sorted_and_deduplicated() {
        let list = ItemList::identified("text", "id", ["B", "A", "A"], 255).unwrap();
        assert_eq!(list.items(), vec!["A", "B"]);
        assert_eq!(list.serialise(), "^text^id^A B");
    }

    #[test]
    fn test_binary_sort_of_ids() {
        let list = ItemList::identified("text", "id", ["b", "B", "a10", "a9"], 255).unwrap();
        assert_eq!(list.items(), vec!["B", "a10", "a9", "b"]);
    }

    #[test]
    fn test_positional_numeric_sort() {
        let list = ItemList::from_strings("p", "", ["10", "9", "100", "9"], 255).unwrap();
        assert_eq!(list.serialise(), "^p^^9 10 100");
        assert!(ItemList::from_strings("p", "", ["x"], 255).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(ItemList::identified("text", "id", ["A B"], 255).is_err());
        assert!(ItemList::identified("te xt", "id", ["A"], 255).is_err());
        assert!(ItemList::identified("text", "id", ["ABC"], 2).is_err());
    }

    #[test]
    fn test_add_remove() {
        let list = ItemList::identified("text", "id", ["A", "C"], 255).unwrap();
        let added = list.with_added(["B", "A"], 255).unwrap();
        assert_eq!(added.items(), vec!["A", "B", "C"]);
        let removed = added.with_removed(["A", "Z"]);
        assert_eq!(removed.items(), vec!["B", "C"]);
        assert!(list.with_added(["bad id"], 255).is_err());

        let pos = ItemList::positional("p", [3, 1]).unwrap();
        assert_eq!(pos.with_added(["2"], 255).unwrap().items(), vec!["1", "2", "3"]);
        assert_eq!(pos.with_removed(["3", "x"]).items(), vec!["1"]);
    }

    #[test]
    fn test_content_modes() {
        assert_eq!(
            SubcorpusContent::parse("^^^").unwrap(),
            SubcorpusContent::Arbitrary
        );
        let list = SubcorpusContent::parse("^text^id^A B").unwrap();
        assert_eq!(list.serialise(), "^text^id^A B");
        let empty = SubcorpusContent::parse("^text^id^").unwrap();
        assert!(matches!(empty, SubcorpusContent::List(l) if l.is_empty()));
        let spec = SubcorpusContent::parse("$^heading|rend~bold").unwrap();
        assert!(matches!(spec, SubcorpusContent::Restriction(_)));
        assert_eq!(spec.serialise(), "$^heading|rend~bold");
    }

    #[test]
    fn test_content_parse_failures() {
        for bad in ["", "text^id^A", "^text^id", "^text^id^A^B", "^^id^A", "x^^^"] {
            assert!(
                SubcorpusContent::parse(bad).unwrap_err().is_parse_failure(),
                "{bad:?}"
            );
        }
    }
}
