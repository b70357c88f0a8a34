//! Set operations over sorted, disjoint interval streams.

pub mod coalesce;
pub mod intersection;

pub use coalesce::{Coalesce, coalesce};
pub use intersection::{IntersectIntervals, intersect, intersect_all, intersect_intervals};
