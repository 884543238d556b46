//! Per-zoid decision records.
//!
//! The tuning pass writes one `Decision` per distinct zoid shape; the replay
//! pass dispatches on it with no further search. A decision that cuts neither
//! time nor space is a base-case leaf.

/// What the tuner decided about one dimension of a zoid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimDecision {
    /// Space-cut this dimension.
    pub cut: bool,
    /// Top base longer than bottom base; selects the `lb`-bisecting split.
    pub inverted: bool,
    /// Full-width un-slanted dimension; selects the initial-cut split.
    pub initial: bool,
}

/// The recorded strategy for one zoid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision<const N: usize> {
    /// Bisect the time interval. Mutually exclusive with any `dims[i].cut`.
    pub cut_time: bool,
    /// Dispatch the base case to the boundary-aware kernel.
    pub boundary: bool,
    pub dims: [DimDecision; N],
}

impl<const N: usize> Decision<N> {
    /// A base-case leaf.
    pub fn leaf(boundary: bool) -> Self {
        Self {
            cut_time: false,
            boundary,
            dims: [DimDecision::default(); N],
        }
    }

    /// A time cut.
    pub fn time_cut(boundary: bool) -> Self {
        Self {
            cut_time: true,
            boundary,
            dims: [DimDecision::default(); N],
        }
    }

    #[inline]
    pub fn cuts_space(&self) -> bool {
        self.dims.iter().any(|d| d.cut)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        !self.cut_time && !self.cuts_space()
    }

    /// Number of children this decision implies: 2 for a time cut, the product
    /// of 3 per cut dimension (2 for an initial cut) for a space cut, 0 for a
    /// leaf.
    pub fn child_count(&self) -> usize {
        if self.cuts_space() {
            self.dims
                .iter()
                .filter(|d| d.cut)
                .map(|d| if d.initial { 2 } else { 3 })
                .product()
        } else if self.cut_time {
            2
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_count_matches_fanout() {
        let mut d: Decision<2> = Decision::leaf(false);
        assert_eq!(d.child_count(), 0);
        assert!(d.is_leaf());

        d.cut_time = true;
        assert_eq!(d.child_count(), 2);

        let mut s: Decision<2> = Decision::leaf(true);
        s.dims[0].cut = true;
        assert_eq!(s.child_count(), 3);
        s.dims[1].cut = true;
        assert_eq!(s.child_count(), 9);
        s.dims[1].initial = true;
        assert_eq!(s.child_count(), 6);
        assert!(!s.is_leaf());
    }
}
