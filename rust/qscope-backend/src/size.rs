use std::{iter::Sum, ops::Add};

/// Item and token counts of a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScopeSize {
    pub n_items: u64,
    pub n_tokens: u64,
}

impl ScopeSize {
    pub const EMPTY: ScopeSize = ScopeSize {
        n_items: 0,
        n_tokens: 0,
    };

    pub fn new(n_items: u64, n_tokens: u64) -> Self {
        ScopeSize { n_items, n_tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.n_tokens == 0
    }
}

impl Add for ScopeSize {
    type Output = ScopeSize;

    fn add(self, rhs: ScopeSize) -> ScopeSize {
        ScopeSize {
            n_items: self.n_items + rhs.n_items,
            n_tokens: self.n_tokens + rhs.n_tokens,
        }
    }
}

impl Sum for ScopeSize {
    fn sum<I: Iterator<Item = ScopeSize>>(iter: I) -> ScopeSize {
        iter.fold(ScopeSize::EMPTY, Add::add)
    }
}
