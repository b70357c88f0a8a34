//! # Qscope: query scopes over an indexed text corpus
//!
//! A query scope limits where a corpus search runs. It is one of
//!
//! * the whole corpus,
//! * a **restriction**: metadata and structural criteria resolved at request
//!   time (e.g. "utterances in radio broadcasts by older speakers"),
//! * a **subcorpus**: a saved, named subset owned by a user,
//! * an empty restriction, which matches nothing,
//! * the tombstone of a subcorpus that has since been deleted.
//!
//! [`QueryScope`] is the single type client code holds. It is built from a
//! URL fragment or a stored scope string, serializes back to both forms, and
//! loads itself into the query engine as a named set.
//!
//! ## Module Organization
//!
//! * [`backend`] - query engine and metadata store interfaces
//! * [`cache`] - the restriction cache
//! * [`common`] - errors and configuration
//! * [`db`] - the persisted schema
//! * [`format`] - string forms of scopes, restrictions and subcorpus content
//! * [`restriction`] - restriction resolution
//! * [`subcorpus`] - saved subcorpora
//!
//! The interval algebra lives in [`support::ranges`].

mod scope;

pub use scope::QueryScope;

pub use qscope_backend as backend;
pub use qscope_cache as cache;
pub use qscope_common as common;
pub use qscope_db as db;
pub use qscope_format as format;
pub use qscope_restriction as restriction;
pub use qscope_subcorpus as subcorpus;

pub mod support {
    pub use qscope_ranges as ranges;
}
