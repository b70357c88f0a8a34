use qscope_backend::{MetadataStore, QueryEngine};
use qscope_cache::RestrictionCache;
use qscope_common::ScopeConfig;
use qscope_db::Database;

/// Everything a scope operation needs about the current request: which corpus
/// and user it is for, and the collaborators it runs against.
#[derive(Clone, Copy)]
pub struct ScopeContext<'a> {
    pub corpus: &'a str,
    pub user: &'a str,
    pub config: &'a ScopeConfig,
    pub engine: &'a dyn QueryEngine,
    pub metadata: &'a dyn MetadataStore,
    pub db: &'a Database,
}

impl<'a> ScopeContext<'a> {
    pub fn new(
        corpus: &'a str,
        user: &'a str,
        config: &'a ScopeConfig,
        engine: &'a dyn QueryEngine,
        metadata: &'a dyn MetadataStore,
        db: &'a Database,
    ) -> Self {
        ScopeContext {
            corpus,
            user,
            config,
            engine,
            metadata,
            db,
        }
    }

    pub fn cache(&self) -> RestrictionCache<'a> {
        RestrictionCache::new(self.db, self.config)
    }

    /// The same request on behalf of another user.
    pub fn with_user(self, user: &'a str) -> Self {
        ScopeContext { user, ..self }
    }
}

impl std::fmt::Debug for ScopeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeContext")
            .field("corpus", &self.corpus)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
