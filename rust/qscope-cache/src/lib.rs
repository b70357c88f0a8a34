//! The restriction cache: resolved restrictions (sizes and packed intervals)
//! keyed by corpus and canonical serialization, bounded in size by
//! least-recently-touched eviction.

mod cache;

pub use cache::{CachedRestriction, ROW_OVERHEAD_BYTES, RestrictionCache};
