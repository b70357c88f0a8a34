use std::fmt;

/// A single inclusive range of corpus positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub begin: u32,
    pub end: u32,
}

impl Interval {
    /// Creates an interval; `begin` must not exceed `end`.
    #[inline]
    pub fn new(begin: u32, end: u32) -> Interval {
        debug_assert!(begin <= end, "interval [{begin}, {end}]");
        Interval { begin, end }
    }

    /// Like [`Interval::new`], but returns `None` for reversed bounds.
    #[inline]
    pub fn try_new(begin: u32, end: u32) -> Option<Interval> {
        (begin <= end).then_some(Interval { begin, end })
    }

    /// Number of corpus positions covered.
    #[inline]
    pub fn len(&self) -> u64 {
        (self.end - self.begin) as u64 + 1
    }

    #[inline]
    pub fn contains(&self, cpos: u32) -> bool {
        self.begin <= cpos && cpos <= self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    /// True when `other` starts immediately after `self` ends.
    #[inline]
    pub fn is_adjacent_to(&self, other: &Interval) -> bool {
        self.end.checked_add(1) == Some(other.begin)
    }
}

impl From<(u32, u32)> for Interval {
    fn from((begin, end): (u32, u32)) -> Self {
        Interval::new(begin, end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::Interval;

    #[test]
    fn test_len_and_contains() {
        let single = Interval::new(7, 7);
        assert_eq!(single.len(), 1);
        assert!(single.contains(7));
        assert!(!single.contains(8));

        let wide = Interval::new(0, u32::MAX);
        assert_eq!(wide.len(), u32::MAX as u64 + 1);
    }

    #[test]
    fn test_overlap_and_adjacency() {
        let a = Interval::new(0, 4);
        assert!(a.overlaps(&Interval::new(4, 9)));
        assert!(!a.overlaps(&Interval::new(5, 9)));
        assert!(a.is_adjacent_to(&Interval::new(5, 9)));
        assert!(!Interval::new(0, u32::MAX).is_adjacent_to(&Interval::new(0, 0)));
        assert!(Interval::try_new(5, 4).is_none());
    }
}
