//! An owning container for a sorted, non-overlapping list of inclusive intervals.

use qscope_common::{Result, error::Error};

use crate::Interval;

/// An owning container for a sorted, non-overlapping list of inclusive intervals.
///
/// Invariants:
/// - `inner[i].begin <= inner[i].end` for every interval;
/// - `inner[i].end < inner[i + 1].begin` for all valid `i`.
///
/// Adjacent intervals (`inner[i].end + 1 == inner[i + 1].begin`) are allowed and
/// are kept apart: each one usually stands for a distinct item (a text, an
/// utterance). They are merged only when the list is written out as a dumpfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalList {
    inner: Vec<Interval>,
}

impl IntervalList {
    pub fn new() -> IntervalList {
        IntervalList { inner: Vec::new() }
    }

    /// Wraps an already sorted, disjoint vector, verifying the invariants.
    pub fn from_sorted(intervals: Vec<Interval>) -> Result<IntervalList> {
        if let Some(pos) = find_violation(&intervals) {
            return Err(Error::invalid_arg(
                "intervals",
                format!(
                    "interval {} at index {pos} is not ordered after {}",
                    intervals[pos],
                    intervals[pos - 1]
                ),
            ));
        }
        Ok(IntervalList { inner: intervals })
    }

    /// Wraps a vector produced by an operation that preserves the invariants.
    pub(crate) fn from_sorted_unchecked(intervals: Vec<Interval>) -> IntervalList {
        debug_assert!(find_violation(&intervals).is_none());
        IntervalList { inner: intervals }
    }

    /// Builds a list from `(begin, end)` pairs, verifying the invariants.
    pub fn from_pairs<I>(pairs: I) -> Result<IntervalList>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut intervals = Vec::new();
        for (begin, end) in pairs {
            let interval = Interval::try_new(begin, end).ok_or_else(|| {
                Error::invalid_arg("intervals", format!("reversed interval [{begin}, {end}]"))
            })?;
            intervals.push(interval);
        }
        Self::from_sorted(intervals)
    }

    /// Number of intervals.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total number of corpus positions covered by the list.
    pub fn n_tokens(&self) -> u64 {
        self.inner.iter().map(Interval::len).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.inner.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.inner
    }

    pub fn into_vec(self) -> Vec<Interval> {
        self.inner
    }

    pub fn to_pairs(&self) -> Vec<(u32, u32)> {
        self.inner.iter().map(|i| (i.begin, i.end)).collect()
    }

    /// Returns the index of the interval containing `cpos`, if any.
    ///
    /// Complexity: O(log n).
    pub fn search_position(&self, cpos: u32) -> Option<usize> {
        let idx = self.inner.partition_point(|i| i.end < cpos);
        (idx < self.inner.len() && self.inner[idx].begin <= cpos).then_some(idx)
    }

    #[inline]
    pub fn contains_position(&self, cpos: u32) -> bool {
        self.search_position(cpos).is_some()
    }
}

impl<'a> IntoIterator for &'a IntervalList {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl IntoIterator for IntervalList {
    type Item = Interval;
    type IntoIter = std::vec::IntoIter<Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

fn find_violation(intervals: &[Interval]) -> Option<usize> {
    if intervals.first().is_some_and(|i| i.begin > i.end) {
        return Some(0);
    }
    intervals
        .windows(2)
        .position(|w| w[1].begin > w[1].end || w[0].end >= w[1].begin)
        .map(|pos| pos + 1)
}

#[cfg(test)]
mod tests {
    use super::IntervalList;

    #[test]
    fn test_from_pairs_valid() {
        let list = IntervalList::from_pairs([(0, 4), (5, 5), (10, 14)]).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.n_tokens(), 11);
        assert_eq!(list.to_pairs(), vec![(0, 4), (5, 5), (10, 14)]);
    }

    #[test]
    fn test_from_pairs_rejects_overlap_and_disorder() {
        assert!(IntervalList::from_pairs([(0, 4), (4, 6)]).is_err());
        assert!(IntervalList::from_pairs([(10, 14), (0, 4)]).is_err());
        assert!(IntervalList::from_pairs([(3, 2)]).is_err());
        assert!(IntervalList::from_pairs(std::iter::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_search_position() {
        let list = IntervalList::from_pairs([(0, 4), (10, 14), (20, 20)]).unwrap();
        assert_eq!(list.search_position(0), Some(0));
        assert_eq!(list.search_position(4), Some(0));
        assert_eq!(list.search_position(5), None);
        assert_eq!(list.search_position(12), Some(1));
        assert_eq!(list.search_position(20), Some(2));
        assert_eq!(list.search_position(21), None);
        assert!(!IntervalList::new().contains_position(0));
    }
}
