//! Saved subcorpora: named, per-user subsets of a corpus.
//!
//! A subcorpus holds its content in one of three modes:
//!
//! - **list**: whole items of one family, by id or sequence position;
//! - **restriction**: an embedded restriction, resolved when needed;
//! - **arbitrary**: intervals only, kept in the subcorpus dumpfile.
//!
//! Conversion between modes only goes downwards (restriction to list, or
//! restriction to arbitrary), and only when the content has to be edited.
//! Any change to a saved subcorpus invalidates the data computed within it.

mod modify;
mod populate;
mod store;
mod subcorpus;

pub use subcorpus::Subcorpus;
