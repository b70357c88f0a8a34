//! Classification of stored scope strings.

use std::{fmt, str::FromStr};

use qscope_common::{Result, error::Error};

/// Stored in place of a subcorpus id once that subcorpus has been deleted or
/// modified underneath a saved query.
pub const DELETED_SUBCORPUS: &str = "~~";

/// Primary key of a saved subcorpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubcorpusId(pub i64);

impl fmt::Display for SubcorpusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubcorpusId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::parse("subcorpus id", s));
        }
        s.parse::<i64>()
            .map(SubcorpusId)
            .map_err(|_| Error::parse("subcorpus id", s))
    }
}

/// What a stored scope string denotes, decided by its shape alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeString<'a> {
    WholeCorpus,
    DeletedSubcorpus,
    Subcorpus(SubcorpusId),
    Restriction(&'a str),
}

impl<'a> ScopeString<'a> {
    /// Classifies `s`: empty is the whole corpus, the tombstone is a deleted
    /// subcorpus, all-digits is a subcorpus id, anything else is a restriction
    /// (still to be parsed).
    pub fn classify(s: &'a str) -> Result<ScopeString<'a>> {
        if s.is_empty() {
            Ok(ScopeString::WholeCorpus)
        } else if s == DELETED_SUBCORPUS {
            Ok(ScopeString::DeletedSubcorpus)
        } else if s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().map(ScopeString::Subcorpus)
        } else {
            Ok(ScopeString::Restriction(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ScopeString::classify("").unwrap(), ScopeString::WholeCorpus);
        assert_eq!(
            ScopeString::classify(DELETED_SUBCORPUS).unwrap(),
            ScopeString::DeletedSubcorpus
        );
        assert_eq!(
            ScopeString::classify("23").unwrap(),
            ScopeString::Subcorpus(SubcorpusId(23))
        );
        assert_eq!(
            ScopeString::classify("$^heading").unwrap(),
            ScopeString::Restriction("$^heading")
        );
        assert_eq!(
            ScopeString::classify("23a").unwrap(),
            ScopeString::Restriction("23a")
        );
        assert!(ScopeString::classify("99999999999999999999999").is_err());
    }

    #[test]
    fn test_tombstone_is_two_bytes_and_distinct() {
        assert_eq!(DELETED_SUBCORPUS.len(), 2);
        assert!(!DELETED_SUBCORPUS.starts_with('$'));
        assert!(!DELETED_SUBCORPUS.starts_with('@'));
        assert!(!DELETED_SUBCORPUS.bytes().any(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_subcorpus_id() {
        assert_eq!("7".parse::<SubcorpusId>().unwrap(), SubcorpusId(7));
        assert!("-7".parse::<SubcorpusId>().is_err());
        assert!("".parse::<SubcorpusId>().is_err());
        assert_eq!(SubcorpusId(42).to_string(), "42");
    }
}
