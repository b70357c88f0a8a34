//! Sorted, disjoint collections of inclusive corpus-position intervals.
//!
//! This crate provides:
//!
//! - **Interval lists**: [`IntervalList`], a validated container of ascending,
//!   non-overlapping `[begin, end]` pairs
//! - **Set operations**: streaming intersection and adjacency coalescing
//! - **Encodings**: the fixed 8-bytes-per-pair binary packing used by the
//!   restriction cache, and the two-column text dump format exchanged with
//!   the query engine
//!
//! All intervals are inclusive on both ends: `[3, 3]` holds exactly one
//! corpus position.

pub mod dump_format;
pub mod interval;
pub mod interval_list;
pub mod packing;
pub mod set_ops;

pub use interval::Interval;
pub use interval_list::IntervalList;
pub use set_ops::{coalesce, intersect, intersect_all, intersect_intervals};
