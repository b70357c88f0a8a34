//! Interfaces to the collaborators a scope is resolved against: the query
//! engine that owns the token index, and the metadata store describing texts,
//! XML attributes and linked tables.

pub mod cqp;
pub mod engine;
pub mod metadata;
pub mod size;
pub mod sqlite_metadata;

pub use engine::{AttributeRegion, QueryEngine, RegionStream};
pub use metadata::{FieldFilter, FieldKind, MetadataStore};
pub use size::ScopeSize;
pub use sqlite_metadata::SqliteMetadataStore;
