//! String forms of query scopes, restrictions and subcorpus content.
//!
//! Every value in this crate has exactly one serialization, and semantically
//! equal values serialize byte-identically: the serialized restriction is the
//! key of the restriction cache, and stored scope strings are compared across
//! sessions.
//!
//! # Grammar
//!
//! | Entity                        | Form                                   |
//! |-------------------------------|----------------------------------------|
//! | whole-corpus scope            | `""`                                   |
//! | deleted-subcorpus tombstone   | `~~`                                   |
//! | subcorpus scope               | decimal id, e.g. `23`                  |
//! | restriction, one family       | `$^FAMILY` or `$^FAMILY\|COND.COND`    |
//! | restriction, several families | `@^SET^SET...`                         |
//! | subcorpus item list           | `^FAMILY^SUBATTR^ID ID ...`            |
//! | arbitrary subcorpus           | `^^^`                                  |
//!
//! where `COND` is `FIELD~VALUE` or `FIELD/SUBFIELD~VALUE`.

pub mod condition;
pub mod content;
pub mod handle;
pub mod restriction_spec;
pub mod scope_string;
pub mod url_fragment;

pub use condition::{Condition, ConditionSet, Family};
pub use content::{ItemList, SubcorpusContent};
pub use restriction_spec::{ItemType, RestrictionSpec};
pub use scope_string::{DELETED_SUBCORPUS, ScopeString, SubcorpusId};
pub use url_fragment::UrlScope;
