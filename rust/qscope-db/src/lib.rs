//! The SQLite database shared by the restriction cache and the subcorpus
//! store, together with the tables holding data computed within a scope
//! (saved queries, query history, frequency tables).

pub mod database;
pub mod dependents;
pub mod schema;

pub use database::{Database, DbResultExt};
