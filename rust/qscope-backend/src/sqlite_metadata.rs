//! [`MetadataStore`] over the metadata tables of a SQLite database.
//!
//! Shared tables:
//! - `text_metadata_fields (corpus, handle, datatype)`
//! - `xml_metadata (corpus, handle, att_family, datatype)`
//! - `xml_metadata_values (corpus, att_handle, handle, category_num_words,
//!   category_num_segments)`
//!
//! Per-corpus tables:
//! - `text_metadata_for_<corpus> (text_id, words, <field>...)`
//! - `idlink_xml_<corpus>_<handle> (__ID, n_items, n_tokens, <column>...)`

use itertools::Itertools;
use qscope_common::{Result, error::Error};
use qscope_db::{Database, DbResultExt};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::{FieldFilter, FieldKind, MetadataStore, ScopeSize};

/// Shared metadata tables. Statements are idempotent.
pub const METADATA_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS text_metadata_fields (
    corpus    TEXT NOT NULL,
    handle    TEXT NOT NULL,
    datatype  TEXT NOT NULL,
    PRIMARY KEY (corpus, handle)
);
CREATE TABLE IF NOT EXISTS xml_metadata (
    corpus      TEXT NOT NULL,
    handle      TEXT NOT NULL,
    att_family  TEXT NOT NULL,
    datatype    TEXT NOT NULL,
    PRIMARY KEY (corpus, handle)
);
CREATE TABLE IF NOT EXISTS xml_metadata_values (
    corpus                 TEXT    NOT NULL,
    att_handle             TEXT    NOT NULL,
    handle                 TEXT    NOT NULL,
    category_num_words     INTEGER NOT NULL DEFAULT 0,
    category_num_segments  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (corpus, att_handle, handle)
);
"#;

/// Largest number of ids bound into one `IN (...)` list.
const ID_CHUNK: usize = 500;

pub struct SqliteMetadataStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteMetadataStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        SqliteMetadataStore {
            conn: db.connection(),
        }
    }

    pub fn install_schema(db: &Database) -> Result<()> {
        db.connection()
            .execute_batch(METADATA_SCHEMA)
            .db_context("install metadata schema")
    }

    /// Name of the per-text metadata table of `corpus`.
    pub fn text_table(corpus: &str) -> Result<String> {
        verify_identifier("corpus", corpus)?;
        Ok(format!("text_metadata_for_{corpus}"))
    }

    /// Name of the table linked through the id-link attribute `handle`.
    pub fn idlink_table(corpus: &str, handle: &str) -> Result<String> {
        verify_identifier("corpus", corpus)?;
        verify_identifier("handle", handle)?;
        Ok(format!("idlink_xml_{corpus}_{handle}"))
    }

    fn aggregate(&self, sql: &str, params: &[String], context: &str) -> Result<ScopeSize> {
        self.conn
            .query_row(sql, params_from_iter(params), |row| {
                Ok(ScopeSize::new(
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64,
                ))
            })
            .db_context(context)
    }

    fn strings(&self, sql: &str, params: &[String], context: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql).db_context(context)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| row.get::<_, String>(0))
            .db_context(context)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().db_context(context)
    }
}

impl MetadataStore for SqliteMetadataStore<'_> {
    fn text_field_kind(&self, corpus: &str, field: &str) -> Result<Option<FieldKind>> {
        let kind = self
            .conn
            .query_row(
                "SELECT datatype FROM text_metadata_fields WHERE corpus = ?1 AND handle = ?2",
                params![corpus, field],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .db_context("look up text field")?;
        kind.map(|k| k.parse()).transpose()
    }

    fn xml_field_kind(&self, corpus: &str, handle: &str) -> Result<Option<FieldKind>> {
        let kind = self
            .conn
            .query_row(
                "SELECT datatype FROM xml_metadata WHERE corpus = ?1 AND handle = ?2",
                params![corpus, handle],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .db_context("look up xml attribute")?;
        kind.map(|k| k.parse()).transpose()
    }

    fn xml_id_field(&self, corpus: &str, family: &str) -> Result<Option<String>> {
        if family == "text" {
            return Ok(Some("id".to_string()));
        }
        let handle = self
            .conn
            .query_row(
                "SELECT handle FROM xml_metadata \
                 WHERE corpus = ?1 AND att_family = ?2 AND datatype = ?3 \
                 ORDER BY handle LIMIT 1",
                params![corpus, family, FieldKind::UniqueId.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .db_context("look up id attribute")?;
        Ok(handle.and_then(|h| h.strip_prefix(&format!("{family}_")).map(str::to_string)))
    }

    fn text_aggregate(&self, corpus: &str, filters: &[FieldFilter]) -> Result<ScopeSize> {
        let (clause, params) = where_clause(filters)?;
        let sql = format!(
            "SELECT COUNT(*), SUM(words) FROM {} WHERE {clause}",
            Self::text_table(corpus)?
        );
        self.aggregate(&sql, &params, "aggregate text metadata")
    }

    fn text_ids(&self, corpus: &str, filters: &[FieldFilter]) -> Result<Vec<String>> {
        let (clause, params) = where_clause(filters)?;
        let sql = format!(
            "SELECT text_id FROM {} WHERE {clause} ORDER BY text_id",
            Self::text_table(corpus)?
        );
        self.strings(&sql, &params, "select text ids")
    }

    fn text_size_for_ids(&self, corpus: &str, ids: &[String]) -> Result<ScopeSize> {
        let table = Self::text_table(corpus)?;
        ids.chunks(ID_CHUNK)
            .map(|chunk| {
                let sql = format!(
                    "SELECT COUNT(*), SUM(words) FROM {table} WHERE text_id IN ({})",
                    placeholders(chunk.len())
                );
                self.aggregate(&sql, chunk, "aggregate text sizes")
            })
            .sum()
    }

    fn category_size(&self, corpus: &str, handle: &str, category: &str) -> Result<ScopeSize> {
        let size = self
            .conn
            .query_row(
                "SELECT category_num_segments, category_num_words FROM xml_metadata_values \
                 WHERE corpus = ?1 AND att_handle = ?2 AND handle = ?3",
                params![corpus, handle, category],
                |row| {
                    Ok(ScopeSize::new(
                        row.get::<_, i64>(0)? as u64,
                        row.get::<_, i64>(1)? as u64,
                    ))
                },
            )
            .optional()
            .db_context("look up category size")?;
        Ok(size.unwrap_or_default())
    }

    fn idlink_aggregate(
        &self,
        corpus: &str,
        handle: &str,
        filters: &[FieldFilter],
    ) -> Result<ScopeSize> {
        let (clause, params) = where_clause(filters)?;
        let sql = format!(
            "SELECT SUM(n_items), SUM(n_tokens) FROM {} WHERE {clause}",
            Self::idlink_table(corpus, handle)?
        );
        self.conn
            .query_row(&sql, params_from_iter(&params), |row| {
                Ok(ScopeSize::new(
                    row.get::<_, Option<i64>>(0)?.unwrap_or(0) as u64,
                    row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64,
                ))
            })
            .db_context("aggregate linked table")
    }

    fn idlink_ids(
        &self,
        corpus: &str,
        handle: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<String>> {
        let (clause, params) = where_clause(filters)?;
        let sql = format!(
            "SELECT __ID FROM {} WHERE {clause} ORDER BY __ID",
            Self::idlink_table(corpus, handle)?
        );
        self.strings(&sql, &params, "select linked ids")
    }
}

/// Identifiers spliced into SQL text must be plain handles.
fn verify_identifier(what: &str, s: &str) -> Result<()> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(Error::invalid_arg(what, format!("'{s}' is not a valid SQL identifier")))
    }
}

fn placeholders(n: usize) -> String {
    std::iter::repeat_n("?", n).join(", ")
}

/// `(f1 IN (?, ?)) AND (f2 IN (?))`, or a tautology for no filters.
fn where_clause(filters: &[FieldFilter]) -> Result<(String, Vec<String>)> {
    if filters.is_empty() {
        return Ok(("1 = 1".to_string(), Vec::new()));
    }
    let mut clauses = Vec::with_capacity(filters.len());
    let mut params = Vec::new();
    for filter in filters {
        verify_identifier("field", &filter.field)?;
        if filter.values.is_empty() {
            // IN () matches nothing.
            clauses.push("0 = 1".to_string());
            continue;
        }
        clauses.push(format!(
            "{} IN ({})",
            filter.field,
            placeholders(filter.values.len())
        ));
        params.extend(filter.values.iter().cloned());
    }
    Ok((clauses.join(" AND "), params))
}
