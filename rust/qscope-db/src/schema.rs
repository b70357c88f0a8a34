//! Table definitions.

/// Core tables. Statements are idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS saved_subcorpora (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    corpus      TEXT    NOT NULL,
    user        TEXT    NOT NULL,
    content     TEXT    NOT NULL,
    n_items     INTEGER NOT NULL DEFAULT 0,
    n_tokens    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS saved_subcorpora_owner
    ON saved_subcorpora (corpus, user, name);

CREATE TABLE IF NOT EXISTS saved_restrictions (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    corpus                  TEXT    NOT NULL,
    serialised_restriction  TEXT    NOT NULL,
    n_items                 INTEGER NOT NULL,
    n_tokens                INTEGER NOT NULL,
    data                    BLOB    NOT NULL,
    cache_time              INTEGER NOT NULL,
    UNIQUE (corpus, serialised_restriction)
);
CREATE INDEX IF NOT EXISTS saved_restrictions_time
    ON saved_restrictions (cache_time);

CREATE TABLE IF NOT EXISTS saved_queries (
    query_name   TEXT    PRIMARY KEY,
    corpus       TEXT    NOT NULL,
    user         TEXT    NOT NULL,
    cqp_query    TEXT    NOT NULL,
    query_scope  TEXT    NOT NULL DEFAULT '',
    hits         INTEGER NOT NULL DEFAULT 0,
    saved        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS query_history (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    corpus       TEXT    NOT NULL,
    user         TEXT    NOT NULL,
    cqp_query    TEXT    NOT NULL,
    query_scope  TEXT    NOT NULL DEFAULT '',
    hits         INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS saved_freqtables (
    freqtable_name  TEXT PRIMARY KEY,
    corpus          TEXT NOT NULL,
    query_scope     TEXT NOT NULL
);
"#;
