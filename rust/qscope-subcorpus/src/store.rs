//! Persistence of subcorpora in `saved_subcorpora`.

use log::info;
use qscope_backend::ScopeSize;
use qscope_common::{Result, error::Error, verify_arg};
use qscope_db::{DbResultExt, dependents::invalidate_scope};
use qscope_format::{DELETED_SUBCORPUS, SubcorpusContent, SubcorpusId, handle::verify_handle};
use qscope_ranges::dump_format;
use qscope_restriction::ScopeContext;
use rusqlite::{OptionalExtension, Row, params};

use crate::Subcorpus;

const COLUMNS: &str = "id, name, corpus, user, content, n_items, n_tokens";

struct StoredRow {
    id: i64,
    name: String,
    corpus: String,
    user: String,
    content: String,
    n_items: i64,
    n_tokens: i64,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
        Ok(StoredRow {
            id: row.get(0)?,
            name: row.get(1)?,
            corpus: row.get(2)?,
            user: row.get(3)?,
            content: row.get(4)?,
            n_items: row.get(5)?,
            n_tokens: row.get(6)?,
        })
    }

    fn into_subcorpus(self) -> Result<Subcorpus> {
        let content = SubcorpusContent::parse(&self.content).map_err(|_| {
            Error::consistency(format!(
                "subcorpus {} has unreadable content {:?}",
                self.id, self.content
            ))
        })?;
        Ok(Subcorpus {
            id: Some(SubcorpusId(self.id)),
            name: self.name,
            corpus: self.corpus,
            user: self.user,
            content,
            size: ScopeSize::new(self.n_items as u64, self.n_tokens as u64),
            staged: None,
        })
    }
}

impl Subcorpus {
    /// Loads subcorpus `id` of the context's corpus.
    pub fn load(ctx: &ScopeContext<'_>, id: SubcorpusId) -> Result<Option<Subcorpus>> {
        let row = ctx
            .db
            .connection()
            .query_row(
                &format!("SELECT {COLUMNS} FROM saved_subcorpora WHERE id = ?1 AND corpus = ?2"),
                params![id.0, ctx.corpus],
                StoredRow::read,
            )
            .optional()
            .db_context("load subcorpus")?;
        row.map(StoredRow::into_subcorpus).transpose()
    }

    /// Loads the context user's subcorpus called `name`.
    pub fn load_by_name(ctx: &ScopeContext<'_>, name: &str) -> Result<Option<Subcorpus>> {
        Self::find(ctx.db, ctx.corpus, ctx.user, name)
    }

    fn find(
        db: &qscope_db::Database,
        corpus: &str,
        user: &str,
        name: &str,
    ) -> Result<Option<Subcorpus>> {
        let row = db
            .connection()
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM saved_subcorpora \
                     WHERE corpus = ?1 AND user = ?2 AND name = ?3"
                ),
                params![corpus, user, name],
                StoredRow::read,
            )
            .optional()
            .db_context("find subcorpus")?;
        row.map(StoredRow::into_subcorpus).transpose()
    }

    /// The context user's subcorpora of the context's corpus, by name.
    pub fn list_for_user(ctx: &ScopeContext<'_>) -> Result<Vec<Subcorpus>> {
        let conn = ctx.db.connection();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM saved_subcorpora \
                 WHERE corpus = ?1 AND user = ?2 ORDER BY name"
            ))
            .db_context("list subcorpora")?;
        let rows = stmt
            .query_map(params![ctx.corpus, ctx.user], StoredRow::read)
            .db_context("list subcorpora")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("list subcorpora")?;
        rows.into_iter().map(StoredRow::into_subcorpus).collect()
    }

    /// Inserts or updates the subcorpus row, returning its id.
    ///
    /// Another subcorpus of the same owner with the same name is deleted
    /// first. Staged arbitrary intervals are written to the dumpfile.
    pub fn save(&mut self, ctx: &ScopeContext<'_>) -> Result<SubcorpusId> {
        verify_arg!(ctx, ctx.corpus == self.corpus);
        if let Some(other) = Self::find(ctx.db, &self.corpus, &self.user, &self.name)? {
            if other.id != self.id {
                info!(
                    "subcorpus {} of {} replaces {:?}",
                    self.name, self.user, other.id
                );
                other.delete(ctx)?;
            }
        }

        let conn = ctx.db.connection();
        let content = self.content.serialise();
        let id = match self.id {
            None => {
                conn.execute(
                    "INSERT INTO saved_subcorpora (name, corpus, user, content, n_items, n_tokens) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        self.name,
                        self.corpus,
                        self.user,
                        content,
                        self.size.n_items as i64,
                        self.size.n_tokens as i64
                    ],
                )
                .db_context("insert subcorpus")?;
                SubcorpusId(conn.last_insert_rowid())
            }
            Some(id) => {
                let updated = conn
                    .execute(
                        "UPDATE saved_subcorpora SET name = ?1, user = ?2, content = ?3, \
                         n_items = ?4, n_tokens = ?5 WHERE id = ?6",
                        params![
                            self.name,
                            self.user,
                            content,
                            self.size.n_items as i64,
                            self.size.n_tokens as i64,
                            id.0
                        ],
                    )
                    .db_context("update subcorpus")?;
                if updated == 0 {
                    return Err(Error::not_found("subcorpus", id.to_string()));
                }
                id
            }
        };
        self.id = Some(id);

        if let Some(staged) = &self.staged {
            std::fs::create_dir_all(&ctx.config.cache_directory).map_err(|e| {
                Error::io(format!("create {}", ctx.config.cache_directory.display()), e)
            })?;
            dump_format::write_dump_file(&Self::dumpfile_path(ctx.config, id), staged)?;
            self.staged = None;
        }
        info!("saved subcorpus {id} '{}' of {}: {}", self.name, self.user, content);
        Ok(id)
    }

    /// Deletes the subcorpus, invalidating everything computed within it.
    pub fn delete(self, ctx: &ScopeContext<'_>) -> Result<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        self.invalidate(ctx)?;
        ctx.db
            .connection()
            .execute("DELETE FROM saved_subcorpora WHERE id = ?1", [id.0])
            .db_context("delete subcorpus")?;
        info!("deleted subcorpus {id} '{}' of {}", self.name, self.user);
        Ok(())
    }

    /// Saves a deep copy under `new_name`.
    pub fn duplicate(&self, ctx: &ScopeContext<'_>, new_name: &str) -> Result<Subcorpus> {
        verify_handle("subcorpus name", new_name)?;
        verify_arg!(new_name, new_name != self.name);
        let mut copy = Subcorpus {
            id: None,
            name: new_name.to_string(),
            staged: None,
            ..self.clone()
        };
        if matches!(self.content, SubcorpusContent::Arbitrary) {
            copy.staged = Some(self.intervals(ctx)?);
        }
        let id = copy.save(ctx)?;

        if let Some(source) = self.id.map(|id| Self::dumpfile_path(ctx.config, id)) {
            let target = Self::dumpfile_path(ctx.config, id);
            if source.is_file() && !target.is_file() {
                std::fs::copy(&source, &target)
                    .map_err(|e| Error::io(format!("copy {}", source.display()), e))?;
            }
        }
        Ok(copy)
    }

    /// Renames the subcorpus, saving it if it was saved before.
    pub fn rename(&mut self, ctx: &ScopeContext<'_>, new_name: &str) -> Result<()> {
        verify_handle("subcorpus name", new_name)?;
        self.name = new_name.to_string();
        if self.id.is_some() {
            self.save(ctx)?;
        }
        Ok(())
    }

    /// Drops data computed within the subcorpus and its dumpfile. Saved
    /// queries and history rows keep their hits but lose the scope.
    pub(crate) fn invalidate(&self, ctx: &ScopeContext<'_>) -> Result<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        invalidate_scope(ctx.db, &self.corpus, &id.to_string(), DELETED_SUBCORPUS)?;
        let path = Self::dumpfile_path(ctx.config, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("remove {}", path.display()), e)),
        }
    }
}
