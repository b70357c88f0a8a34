use crate::{Interval, IntervalList};

/// Merges adjacent intervals of a sorted, disjoint stream.
///
/// `[0, 4], [5, 9], [11, 12]` becomes `[0, 9], [11, 12]`. Overlapping input is
/// merged as well, so the output is always strictly separated by at least one
/// position. This is the form written to dumpfiles.
pub fn coalesce<I>(intervals: I) -> Coalesce<I::IntoIter>
where
    I: IntoIterator<Item = Interval>,
{
    Coalesce {
        inner: intervals.into_iter(),
        pending: None,
    }
}

impl IntervalList {
    /// Returns a copy with adjacent intervals merged.
    pub fn coalesced(&self) -> IntervalList {
        IntervalList::from_sorted_unchecked(coalesce(self.iter().copied()).collect())
    }
}

/// Iterator adapter returned by [`coalesce`].
pub struct Coalesce<I: Iterator<Item = Interval>> {
    inner: I,
    pending: Option<Interval>,
}

impl<I: Iterator<Item = Interval>> Iterator for Coalesce<I> {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        let mut cur = self.pending.take().or_else(|| self.inner.next())?;
        for next in self.inner.by_ref() {
            if next.begin <= cur.end || cur.is_adjacent_to(&next) {
                cur.end = cur.end.max(next.end);
            } else {
                self.pending = Some(next);
                break;
            }
        }
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use crate::IntervalList;

    #[test]
    fn test_coalesce_adjacent() {
        let list = IntervalList::from_pairs([(0, 4), (5, 9), (11, 12), (13, 13), (20, 25)])
            .unwrap();
        assert_eq!(
            list.coalesced().to_pairs(),
            vec![(0, 9), (11, 13), (20, 25)]
        );
    }

    #[test]
    fn test_coalesce_keeps_gaps() {
        let list = IntervalList::from_pairs([(0, 4), (6, 9)]).unwrap();
        assert_eq!(list.coalesced(), list);
        assert!(IntervalList::new().coalesced().is_empty());
    }

    #[test]
    fn test_coalesce_at_upper_bound() {
        let list = IntervalList::from_pairs([(10, u32::MAX - 1), (u32::MAX, u32::MAX)]).unwrap();
        assert_eq!(list.coalesced().to_pairs(), vec![(10, u32::MAX)]);
    }
}
