//! Test utilities for the qscope crates.
//!
//! - [`engine::MemoryEngine`]: an in-memory query engine that understands the
//!   command subset produced by `qscope_backend::cqp`.
//! - [`fixture::FixtureCorpus`]: a builder for small corpora, installed both
//!   into a `MemoryEngine` and into the metadata tables of a database.
//! - [`env::TestEnv`]: a scratch cache directory, database and engine bundled
//!   together, with the standard `demo` corpus.

pub mod engine;
pub mod env;
pub mod fixture;

pub use engine::{CorpusIndex, MemoryEngine};
pub use env::TestEnv;
pub use fixture::FixtureCorpus;
