//! Data computed within a scope, which must be invalidated when the scope's
//! content changes or disappears.
//!
//! Frequency tables are dropped outright. Saved and cached queries and the
//! query history keep their rows (the hits are still meaningful as a record),
//! but their scope column is rewritten to a tombstone so nobody re-runs them
//! against a subcorpus that no longer means what it meant.

use log::info;
use qscope_common::{Result, error::Error};
use rusqlite::params;

use crate::{Database, DbResultExt};

/// Counts of rows touched by [`invalidate_scope`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    pub freqtables_dropped: usize,
    pub queries_rewritten: usize,
    pub history_rewritten: usize,
}

/// Invalidates everything computed within `scope` in `corpus`.
pub fn invalidate_scope(
    db: &Database,
    corpus: &str,
    scope: &str,
    tombstone: &str,
) -> Result<InvalidationReport> {
    let freqtables_dropped = drop_freqtables(db, corpus, scope)?;
    let conn = db.connection();
    let queries_rewritten = conn
        .execute(
            "UPDATE saved_queries SET query_scope = ?1 WHERE corpus = ?2 AND query_scope = ?3",
            params![tombstone, corpus, scope],
        )
        .db_context("rewrite saved query scopes")?;
    let history_rewritten = conn
        .execute(
            "UPDATE query_history SET query_scope = ?1 WHERE corpus = ?2 AND query_scope = ?3",
            params![tombstone, corpus, scope],
        )
        .db_context("rewrite query history scopes")?;

    let report = InvalidationReport {
        freqtables_dropped,
        queries_rewritten,
        history_rewritten,
    };
    if report != InvalidationReport::default() {
        info!("invalidated data in scope '{scope}' of {corpus}: {report:?}");
    }
    Ok(report)
}

fn drop_freqtables(db: &Database, corpus: &str, scope: &str) -> Result<usize> {
    let conn = db.connection();
    let names = {
        let mut stmt = conn
            .prepare("SELECT freqtable_name FROM saved_freqtables WHERE corpus = ?1 AND query_scope = ?2")
            .db_context("list frequency tables")?;
        let rows = stmt
            .query_map(params![corpus, scope], |row| row.get::<_, String>(0))
            .db_context("list frequency tables")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .db_context("list frequency tables")?
    };

    for name in &names {
        if name.contains('"') {
            return Err(Error::consistency(format!(
                "frequency table name {name:?} cannot be quoted"
            )));
        }
        conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{name}\""))
            .db_context("drop frequency table")?;
        conn.execute(
            "DELETE FROM saved_freqtables WHERE freqtable_name = ?1",
            [name],
        )
        .db_context("delete frequency table record")?;
    }
    Ok(names.len())
}
