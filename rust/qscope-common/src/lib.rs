//! Core definitions relied upon by all qscope-* crates: the error type,
//! the `Result` alias with its argument/data verification macros, and the
//! scope configuration.

pub mod config;
pub mod error;
pub mod result;

pub use config::ScopeConfig;
pub use result::Result;
