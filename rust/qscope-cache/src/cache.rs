use log::{debug, info};
use qscope_backend::ScopeSize;
use qscope_common::{Result, ScopeConfig, verify_arg};
use qscope_db::{Database, DbResultExt};
use qscope_ranges::{IntervalList, packing};
use rusqlite::{OptionalExtension, params};

/// Bytes charged per row on top of its stored key and blob, for the row
/// header and the unique and time indexes.
pub const ROW_OVERHEAD_BYTES: u64 = 64;

/// A cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRestriction {
    pub size: ScopeSize,
    pub intervals: IntervalList,
}

/// The `saved_restrictions` table.
///
/// There is no locking: two requests may each insert before either evicts,
/// leaving the table briefly over the limit until the next insert evicts.
pub struct RestrictionCache<'a> {
    db: &'a Database,
    max_bytes: u64,
    floor_bytes: u64,
}

impl<'a> RestrictionCache<'a> {
    pub fn new(db: &'a Database, config: &ScopeConfig) -> Self {
        RestrictionCache {
            db,
            max_bytes: config.restriction_cache_max_bytes,
            floor_bytes: config.restriction_cache_floor_bytes,
        }
    }

    /// Eviction starts above `max_bytes` and stops at or below `floor_bytes`.
    pub fn with_limits(db: &'a Database, max_bytes: u64, floor_bytes: u64) -> Result<Self> {
        verify_arg!(floor_bytes, floor_bytes <= max_bytes);
        Ok(RestrictionCache {
            db,
            max_bytes,
            floor_bytes,
        })
    }

    /// Looks up `serialisation` in `corpus`. A hit becomes the most recently
    /// touched entry.
    pub fn get(&self, corpus: &str, serialisation: &str) -> Result<Option<CachedRestriction>> {
        let conn = self.db.connection();
        let row = conn
            .query_row(
                "SELECT id, n_items, n_tokens, data FROM saved_restrictions \
                 WHERE corpus = ?1 AND serialised_restriction = ?2",
                params![corpus, serialisation],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                },
            )
            .optional()
            .db_context("read cached restriction")?;

        let Some((id, n_items, n_tokens, data)) = row else {
            return Ok(None);
        };
        let intervals = packing::unpack(&data)?;
        conn.execute(
            "UPDATE saved_restrictions SET cache_time = ?1 WHERE id = ?2",
            params![self.next_cache_time()?, id],
        )
        .db_context("touch cached restriction")?;
        debug!("restriction cache hit for {corpus} {serialisation}");
        Ok(Some(CachedRestriction {
            size: ScopeSize::new(n_items as u64, n_tokens as u64),
            intervals,
        }))
    }

    /// Stores a resolved restriction, then evicts if the table grew too large.
    ///
    /// Returns `false` (and stores nothing) when the key is already present.
    pub fn put(
        &self,
        corpus: &str,
        serialisation: &str,
        size: ScopeSize,
        intervals: &IntervalList,
    ) -> Result<bool> {
        let inserted = self
            .db
            .connection()
            .execute(
                "INSERT OR IGNORE INTO saved_restrictions \
                 (corpus, serialised_restriction, n_items, n_tokens, data, cache_time) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    corpus,
                    serialisation,
                    size.n_items as i64,
                    size.n_tokens as i64,
                    packing::pack(intervals),
                    self.next_cache_time()?,
                ],
            )
            .db_context("insert cached restriction")?
            == 1;
        if inserted {
            self.evict()?;
        }
        Ok(inserted)
    }

    /// Drops the entry for `serialisation` in `corpus`, e.g. one whose blob
    /// no longer unpacks. Returns whether a row was deleted.
    pub fn remove(&self, corpus: &str, serialisation: &str) -> Result<bool> {
        let n = self
            .db
            .connection()
            .execute(
                "DELETE FROM saved_restrictions \
                 WHERE corpus = ?1 AND serialised_restriction = ?2",
                params![corpus, serialisation],
            )
            .db_context("remove cached restriction")?;
        Ok(n > 0)
    }

    /// Deletes least recently touched entries until the table is at or below
    /// the floor, if it is above the limit. Returns the number deleted.
    pub fn evict(&self) -> Result<usize> {
        let mut size = self.table_size()?;
        if size <= self.max_bytes {
            return Ok(0);
        }
        let conn = self.db.connection();
        let mut evicted = 0;
        while size > self.floor_bytes {
            let deleted = conn
                .execute(
                    "DELETE FROM saved_restrictions WHERE id = \
                     (SELECT id FROM saved_restrictions ORDER BY cache_time, id LIMIT 1)",
                    [],
                )
                .db_context("evict cached restriction")?;
            if deleted == 0 {
                break;
            }
            evicted += 1;
            size = self.table_size()?;
        }
        info!("restriction cache evicted {evicted} entries, {size} bytes remain");
        Ok(evicted)
    }

    /// Measured size of the table: stored key and blob bytes plus
    /// [`ROW_OVERHEAD_BYTES`] per row.
    pub fn table_size(&self) -> Result<u64> {
        let (bytes, rows) = self
            .db
            .connection()
            .query_row(
                "SELECT COALESCE(SUM(LENGTH(data) + LENGTH(serialised_restriction) \
                 + LENGTH(corpus)), 0), COUNT(*) FROM saved_restrictions",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .db_context("measure restriction cache")?;
        Ok(bytes as u64 + rows as u64 * ROW_OVERHEAD_BYTES)
    }

    pub fn len(&self) -> Result<usize> {
        self.db
            .connection()
            .query_row("SELECT COUNT(*) FROM saved_restrictions", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .db_context("count cached restrictions")
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drops every entry of `corpus`, e.g. after it was reindexed.
    pub fn clear_corpus(&self, corpus: &str) -> Result<usize> {
        let n = self
            .db
            .connection()
            .execute(
                "DELETE FROM saved_restrictions WHERE corpus = ?1",
                [corpus],
            )
            .db_context("clear restriction cache")?;
        if n > 0 {
            info!("dropped {n} cached restrictions of {corpus}");
        }
        Ok(n)
    }

    /// Wall-clock microseconds, bumped past the newest stored time so that
    /// touch order survives clock ties.
    fn next_cache_time(&self) -> Result<i64> {
        let newest: Option<i64> = self
            .db
            .connection()
            .query_row("SELECT MAX(cache_time) FROM saved_restrictions", [], |row| {
                row.get(0)
            })
            .db_context("read newest cache time")?;
        let now = chrono::Utc::now().timestamp_micros();
        Ok(newest.map_or(now, |newest| now.max(newest + 1)))
    }
}
