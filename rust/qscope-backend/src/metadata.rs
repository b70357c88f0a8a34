//! The metadata store: per-text metadata, XML attribute descriptions and
//! precomputed counts.

use std::{fmt, str::FromStr};

use qscope_common::{Result, error::Error};

use crate::ScopeSize;

/// How the values of a metadata field are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A closed set of category handles, with precomputed per-category counts.
    Classification,
    /// Ids into a linked table whose columns can be restricted on.
    IdLink,
    /// Free text; cannot be restricted on.
    FreeText,
    /// The unique id of each item.
    UniqueId,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Classification => "classification",
            FieldKind::IdLink => "idlink",
            FieldKind::FreeText => "free_text",
            FieldKind::UniqueId => "unique_id",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "classification" => Ok(FieldKind::Classification),
            "idlink" => Ok(FieldKind::IdLink),
            "free_text" => Ok(FieldKind::FreeText),
            "unique_id" => Ok(FieldKind::UniqueId),
            _ => Err(Error::parse("field kind", s)),
        }
    }
}

/// `field IN (values...)`. A slice of filters is their conjunction; an empty
/// slice matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub values: Vec<String>,
}

impl FieldFilter {
    pub fn new<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldFilter {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Lookups against the metadata store.
///
/// `handle` parameters name an XML attribute by its full handle (`u_who`).
pub trait MetadataStore {
    /// Kind of the per-text metadata field `field`, if it exists.
    fn text_field_kind(&self, corpus: &str, field: &str) -> Result<Option<FieldKind>>;

    /// Kind of the XML attribute `handle`, if it exists.
    fn xml_field_kind(&self, corpus: &str, handle: &str) -> Result<Option<FieldKind>>;

    /// The field holding unique ids of `family`'s regions (`id` for `u_id`),
    /// if the family has one.
    fn xml_id_field(&self, corpus: &str, family: &str) -> Result<Option<String>>;

    /// `count(*)` and `sum(tokens)` over texts matching `filters`.
    fn text_aggregate(&self, corpus: &str, filters: &[FieldFilter]) -> Result<ScopeSize>;

    /// Ids of texts matching `filters`, sorted.
    fn text_ids(&self, corpus: &str, filters: &[FieldFilter]) -> Result<Vec<String>>;

    /// `count(*)` and `sum(tokens)` over the texts named in `ids`. Unknown ids
    /// are not counted.
    fn text_size_for_ids(&self, corpus: &str, ids: &[String]) -> Result<ScopeSize>;

    /// Precomputed size of one category of the classification attribute `handle`.
    fn category_size(&self, corpus: &str, handle: &str, category: &str) -> Result<ScopeSize>;

    /// Sum of precomputed per-row counts over rows of the table linked through
    /// `handle` that match `filters`.
    fn idlink_aggregate(
        &self,
        corpus: &str,
        handle: &str,
        filters: &[FieldFilter],
    ) -> Result<ScopeSize>;

    /// Ids of linked-table rows matching `filters`, sorted.
    fn idlink_ids(&self, corpus: &str, handle: &str, filters: &[FieldFilter])
    -> Result<Vec<String>>;
}
