use crate::{Interval, IntervalList};

/// Creates an iterator that yields the set-intersection of two ordered,
/// non-overlapping streams of inclusive intervals.
///
/// The two input iterables (`a` and `b`) must each yield intervals:
/// * In strictly ascending order by `begin`.
/// * That never overlap within the same iterable (adjacent is allowed).
///
/// The returned iterator:
/// * Yields only the overlapping portions between intervals from the two sides.
///   A single shared position is an overlap.
/// * Yields intervals in ascending order, never overlapping each other.
/// * Does not merge adjacent output intervals.
///
/// This is a streaming, O(len(a) + len(b)) operation holding only the current
/// interval from each side. Once either side is exhausted, nothing more is
/// produced and the remainder of the other side is not consumed.
pub fn intersect_intervals<L, R>(a: L, b: R) -> IntersectIntervals<L::IntoIter, R::IntoIter>
where
    L: IntoIterator<Item = Interval>,
    R: IntoIterator<Item = Interval>,
{
    IntersectIntervals::new(a.into_iter(), b.into_iter())
}

/// Intersects two interval lists.
pub fn intersect(a: &IntervalList, b: &IntervalList) -> IntervalList {
    if a.is_empty() || b.is_empty() {
        return IntervalList::new();
    }
    IntervalList::from_sorted_unchecked(
        intersect_intervals(a.iter().copied(), b.iter().copied()).collect(),
    )
}

/// Intersects a sequence of interval lists pairwise, left to right.
///
/// Stops as soon as an intermediate result is empty; the remaining lists are
/// not pulled from the iterator. An empty sequence yields an empty list.
pub fn intersect_all<I>(lists: I) -> IntervalList
where
    I: IntoIterator<Item = IntervalList>,
{
    let mut lists = lists.into_iter();
    let Some(mut acc) = lists.next() else {
        return IntervalList::new();
    };
    while !acc.is_empty() {
        let Some(next) = lists.next() else {
            break;
        };
        acc = intersect(&acc, &next);
    }
    acc
}

/// Iterator adapter yielding the set-intersection of two ordered, non-overlapping
/// (within each input) streams of inclusive intervals.
pub struct IntersectIntervals<I, J>
where
    I: Iterator<Item = Interval>,
    J: Iterator<Item = Interval>,
{
    a: I,
    b: J,
    cur_a: Option<Interval>,
    cur_b: Option<Interval>,
}

impl<I, J> IntersectIntervals<I, J>
where
    I: Iterator<Item = Interval>,
    J: Iterator<Item = Interval>,
{
    pub fn new(mut a: I, mut b: J) -> Self {
        let cur_a = a.next();
        let cur_b = if cur_a.is_some() { b.next() } else { None };
        Self {
            a,
            b,
            cur_a,
            cur_b,
        }
    }
}

impl<I, J> Iterator for IntersectIntervals<I, J>
where
    I: Iterator<Item = Interval>,
    J: Iterator<Item = Interval>,
{
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (ra, rb) = match (self.cur_a, self.cur_b) {
                (Some(a), Some(b)) => (a, b),
                _ => return None,
            };

            // a lies entirely before b: advance a.
            if ra.end < rb.begin {
                self.cur_a = self.a.next();
                continue;
            }

            // b lies entirely before a: advance b.
            if rb.end < ra.begin {
                self.cur_b = self.b.next();
                continue;
            }

            let begin = ra.begin.max(rb.begin);
            let end = ra.end.min(rb.end);

            // Advance whichever interval(s) are used up at `end`.
            if ra.end <= rb.end {
                self.cur_a = self.a.next();
            }
            if rb.end <= ra.end {
                self.cur_b = self.b.next();
            }

            return Some(Interval::new(begin, end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{intersect, intersect_all};
    use crate::IntervalList;

    fn list(pairs: &[(u32, u32)]) -> IntervalList {
        IntervalList::from_pairs(pairs.iter().copied()).unwrap()
    }

    fn run(a: &[(u32, u32)], b: &[(u32, u32)]) -> Vec<(u32, u32)> {
        let forward = intersect(&list(a), &list(b)).to_pairs();
        let backward = intersect(&list(b), &list(a)).to_pairs();
        assert_eq!(forward, backward, "intersection must be symmetric");
        forward
    }

    #[test]
    fn empty_inputs() {
        assert!(run(&[], &[]).is_empty());
        assert!(run(&[(0, 10)], &[]).is_empty());
    }

    #[test]
    fn disjoint() {
        assert!(run(&[(0, 4)], &[(5, 9)]).is_empty());
        assert!(run(&[(0, 2), (10, 12)], &[(4, 8), (14, 20)]).is_empty());
    }

    #[test]
    fn shared_single_point() {
        assert_eq!(run(&[(0, 5)], &[(5, 9)]), vec![(5, 5)]);
        assert_eq!(run(&[(3, 3)], &[(3, 3)]), vec![(3, 3)]);
        assert_eq!(run(&[(3, 3)], &[(0, 10)]), vec![(3, 3)]);
    }

    #[test]
    fn nested() {
        assert_eq!(run(&[(0, 100)], &[(3, 7), (20, 30)]), vec![(3, 7), (20, 30)]);
    }

    #[test]
    fn partial_edges() {
        assert_eq!(run(&[(0, 5)], &[(3, 8)]), vec![(3, 5)]);
    }

    #[test]
    fn adjacent_output_not_merged() {
        assert_eq!(
            run(&[(0, 4), (5, 9)], &[(2, 7)]),
            vec![(2, 4), (5, 7)]
        );
    }

    #[test]
    fn complex_interleaving() {
        let a = [(0, 1), (4, 5), (8, 10), (15, 17)];
        let b = [(1, 4), (5, 8), (10, 15)];
        assert_eq!(
            run(&a, &b),
            vec![(1, 1), (4, 4), (5, 5), (8, 8), (10, 10), (15, 15)]
        );
    }

    #[test]
    fn identity() {
        let a = [(0, 4), (5, 5), (10, 14), (u32::MAX - 1, u32::MAX)];
        assert_eq!(run(&a, &a), a.to_vec());
    }

    #[test]
    fn intersect_all_short_circuits() {
        let out = intersect_all([list(&[(0, 10)]), list(&[(20, 30)]), list(&[(0, 30)])]);
        assert!(out.is_empty());

        let out = intersect_all([list(&[(0, 10), (20, 30)]), list(&[(5, 25)]), list(&[(8, 22)])]);
        assert_eq!(out.to_pairs(), vec![(8, 10), (20, 22)]);

        assert!(intersect_all(Vec::<IntervalList>::new()).is_empty());
        assert_eq!(intersect_all([list(&[(1, 2)])]).to_pairs(), vec![(1, 2)]);
    }

    #[test]
    fn intersect_all_stops_pulling_once_empty() {
        let lists = [list(&[]), list(&[(0, 10)]), list(&[(0, 10)])];
        let mut pulled = 0;
        let out = intersect_all(lists.into_iter().inspect(|_| pulled += 1));
        assert!(out.is_empty());
        assert_eq!(pulled, 1);

        let lists = [list(&[(0, 4)]), list(&[(6, 9)]), list(&[(0, 10)])];
        let mut pulled = 0;
        assert!(intersect_all(lists.into_iter().inspect(|_| pulled += 1)).is_empty());
        assert_eq!(pulled, 2);
    }

    /// Builds a random sorted, disjoint list over `[0, span)` along with the
    /// membership bitmap it denotes.
    fn random_list(span: u32) -> (IntervalList, Vec<bool>) {
        let mut members = vec![false; span as usize];
        let mut pairs = Vec::new();
        let mut pos = fastrand::u32(0..4);
        while pos < span {
            let end = (pos + fastrand::u32(0..6)).min(span - 1);
            for p in pos..=end {
                members[p as usize] = true;
            }
            pairs.push((pos, end));
            // Gap of zero keeps the next interval adjacent.
            pos = end + 1 + fastrand::u32(0..5);
        }
        (IntervalList::from_pairs(pairs).unwrap(), members)
    }

    #[test]
    fn randomized_pointwise_agreement() {
        fastrand::seed(8675309);
        const SPAN: u32 = 120;
        for _ in 0..500 {
            let (a, in_a) = random_list(SPAN);
            let (b, in_b) = random_list(SPAN);
            let out = intersect(&a, &b);

            // The result is itself a valid list.
            let out = IntervalList::from_sorted(out.into_vec()).unwrap();
            for p in 0..SPAN {
                assert_eq!(
                    out.contains_position(p),
                    in_a[p as usize] && in_b[p as usize],
                    "position {p}"
                );
            }
            assert_eq!(intersect(&a, &a), a);
            assert!(intersect(&a, &IntervalList::new()).is_empty());
        }
    }
}
