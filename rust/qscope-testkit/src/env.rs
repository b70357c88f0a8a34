//! A scratch environment: cache directory, database and engine.

use qscope_backend::SqliteMetadataStore;
use qscope_common::ScopeConfig;
use qscope_db::Database;
use tempfile::TempDir;

use crate::{engine::MemoryEngine, fixture::FixtureCorpus};

pub struct TestEnv {
    pub dir: TempDir,
    pub config: ScopeConfig,
    pub db: Database,
    pub engine: MemoryEngine,
}

impl TestEnv {
    /// An empty environment whose cache directory is a fresh temporary directory.
    pub fn new() -> anyhow::Result<TestEnv> {
        let dir = tempfile::tempdir()?;
        let config = ScopeConfig::default().with_cache_directory(dir.path());
        Ok(TestEnv {
            dir,
            config,
            db: Database::open_in_memory()?,
            engine: MemoryEngine::new(),
        })
    }

    pub fn with_corpus(fixture: &FixtureCorpus) -> anyhow::Result<TestEnv> {
        let env = Self::new()?;
        fixture.install(&env.engine, &env.db)?;
        Ok(env)
    }

    /// Environment holding [`FixtureCorpus::demo`].
    pub fn demo() -> anyhow::Result<TestEnv> {
        Self::with_corpus(&FixtureCorpus::demo())
    }

    pub fn metadata(&self) -> SqliteMetadataStore<'_> {
        SqliteMetadataStore::new(&self.db)
    }

    /// Number of files in the cache directory.
    pub fn cache_file_count(&self) -> anyhow::Result<usize> {
        Ok(std::fs::read_dir(self.dir.path())?.count())
    }
}
