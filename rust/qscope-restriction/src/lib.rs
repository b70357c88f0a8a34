//! Restrictions: scopes defined by metadata and structural criteria, resolved
//! against the metadata store and the query engine at request time.
//!
//! A [`Restriction`] is built from a parsed [`RestrictionSpec`]. Resolution
//! picks the cheapest strategy that yields its item and token counts:
//!
//! 1. whole-text conditions only: one aggregate over the per-text metadata;
//! 2. one element, one classification field: sum of precomputed category
//!    counts;
//! 3. one element, only linked-table conditions through one id-link field:
//!    aggregate of precomputed per-row counts;
//! 4. anything else: materialize the intervals and count them.
//!
//! Restrictions resolved by materialization, and all multi-family
//! restrictions, are stored in the restriction cache.
//!
//! [`RestrictionSpec`]: qscope_format::RestrictionSpec

pub mod context;
pub mod items;
mod materialize;
mod plan;
pub mod restriction;

pub use context::ScopeContext;
pub use items::ItemListOutcome;
pub use restriction::{Restriction, Strategy};
