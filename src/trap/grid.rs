//! Trapezoid geometry: grids, domains, boundary predicates, shape fingerprints.
//!
//! A zoid's spatial footprint per dimension is four integers `x0, dx0, x1, dx1`:
//! at time offset `lt` from the base the edges sit at `x0 + dx0*lt` and
//! `x1 + dx1*lt`. Two zoids of equal height with equal per-dimension
//! (base width, top width) pairs are the same shape regardless of absolute
//! position; that equivalence is what the fingerprint captures.

/// Bits per width field in the shape fingerprint. Each dimension contributes
/// two fields (base width, top width), packed most-significant dimension first.
pub const WIDTH_BITS: u32 = 16;

const MAX_WIDTH: i64 = 1 << WIDTH_BITS;

/// Spatial footprint of a trapezoidal space-time region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridInfo<const N: usize> {
    pub x0: [i64; N],
    pub dx0: [i64; N],
    pub x1: [i64; N],
    pub dx1: [i64; N],
}

impl<const N: usize> GridInfo<N> {
    /// An un-slanted box `[x0, x1)` per dimension.
    pub fn rect(x0: [i64; N], x1: [i64; N]) -> Self {
        Self {
            x0,
            dx0: [0; N],
            x1,
            dx1: [0; N],
        }
    }

    /// Base-extent width of dimension `dim`.
    #[inline(always)]
    pub fn lb(&self, dim: usize) -> i64 {
        self.x1[dim] - self.x0[dim]
    }

    /// Top-extent width of dimension `dim` after `lt` time steps.
    #[inline(always)]
    pub fn tb(&self, dim: usize, lt: i64) -> i64 {
        (self.x1[dim] + self.dx1[dim] * lt) - (self.x0[dim] + self.dx0[dim] * lt)
    }

    /// The grid as seen `lt` steps up: edges advanced by their slopes,
    /// slopes unchanged. This is the second half of a time cut.
    pub fn sheared(&self, lt: i64) -> Self {
        let mut g = *self;
        for i in 0..N {
            g.x0[i] += self.dx0[i] * lt;
            g.x1[i] += self.dx1[i] * lt;
        }
        g
    }
}

/// The physical domain: per-dimension stencil slope and periodic extent.
#[derive(Clone, Copy, Debug)]
pub struct Domain<const N: usize> {
    pub slope: [i64; N],
    pub phys_length: [i64; N],
}

impl<const N: usize> Domain<N> {
    pub fn new(phys_length: [i64; N], slope: [i64; N]) -> Self {
        for i in 0..N {
            assert!(phys_length[i] > 0, "dimension {i} has non-positive extent");
            assert!(slope[i] > 0, "dimension {i} has non-positive slope");
            assert!(
                phys_length[i] < MAX_WIDTH,
                "dimension {i} extent {} overflows a {WIDTH_BITS}-bit fingerprint field",
                phys_length[i]
            );
        }
        Self { slope, phys_length }
    }

    /// The full un-slanted domain, `[0, phys_length)` in every dimension.
    pub fn full_grid(&self) -> GridInfo<N> {
        GridInfo::rect([0; N], self.phys_length)
    }

    /// Whether dimension `dim` of this zoid reaches the periodic boundary,
    /// i.e. whether a base-case kernel over it would wrap its reads.
    #[inline]
    pub fn touches_boundary(&self, dim: usize, lt: i64, grid: &GridInfo<N>) -> bool {
        let phys = self.phys_length[dim];
        let base0 = grid.x0[dim];
        let base1 = grid.x1[dim];
        let top0 = base0 + grid.dx0[dim] * lt;
        let top1 = base1 + grid.dx1[dim] * lt;
        base0.min(top0) <= 0 || base1.max(top1) >= phys
    }

    /// Base-corner position reduced modulo the physical extent, mixed across
    /// dimensions. Qualifies the fingerprint of boundary-touching zoids,
    /// whose behaviour depends on where they sit relative to the boundary.
    pub fn centroid(&self, grid: &GridInfo<N>) -> u64 {
        let mut centroid = 0u64;
        let mut width = 1u64;
        for i in (0..N).rev() {
            let pos = grid.x0[i].rem_euclid(self.phys_length[i]) as u64;
            centroid += pos * width;
            width *= self.phys_length[i] as u64;
        }
        centroid
    }
}

/// Per-dimension shape analysis of one zoid.
#[derive(Clone, Copy, Debug, Default)]
pub struct DimShape {
    pub lb: i64,
    pub tb: i64,
    /// Kernel reads along this dimension would wrap the periodic boundary.
    pub touches: bool,
    /// A space cut along this dimension is feasible.
    pub can_cut: bool,
    /// Top base longer than bottom base (`lb < tb`).
    pub inverted: bool,
    /// Full-width and not yet slanted: the first cut on this dimension takes
    /// the special initial-cut form.
    pub initial: bool,
}

/// Fingerprint and cut-feasibility summary for one zoid.
#[derive(Clone, Copy, Debug)]
pub struct ZoidShape<const N: usize> {
    pub key: u128,
    pub centroid: u64,
    /// Any dimension touches the boundary; the zoid dispatches to the
    /// boundary-aware kernel.
    pub boundary: bool,
    pub dims: [DimShape; N],
    /// Upper bound on space-cut fan-out: 3 per cut-feasible dimension.
    pub max_children: usize,
}

/// Derive the fingerprint, centroid, and per-dimension cut feasibility of the
/// zoid `(grid, lt)`. `floor` / `boundary_floor` are the per-dimension
/// recursion floors for interior and boundary-touching zoids.
pub fn derive_shape<const N: usize>(
    domain: &Domain<N>,
    grid: &GridInfo<N>,
    lt: i64,
    floor: &[i64; N],
    boundary_floor: &[i64; N],
) -> ZoidShape<N> {
    let dims: [DimShape; N] = std::array::from_fn(|i| {
        let lb = grid.lb(i);
        let tb = grid.tb(i, lt);
        assert!(lb >= 0 && tb >= 0, "dimension {i} has negative width (lb={lb}, tb={tb})");
        assert!(
            lb < MAX_WIDTH && tb < MAX_WIDTH,
            "dimension {i} width overflows fingerprint field (lb={lb}, tb={tb})"
        );
        let touches = domain.touches_boundary(i, lt, grid);
        let thres = domain.slope[i] * lt;
        let inverted = lb < tb;
        let short_side = lb.min(tb);
        let limit = if touches { boundary_floor[i] } else { floor[i] };
        DimShape {
            lb,
            tb,
            touches,
            can_cut: short_side >= 2 * thres && lb > limit,
            inverted,
            initial: lb == domain.phys_length[i] && grid.dx0[i] == 0 && grid.dx1[i] == 0,
        }
    });

    let mut key = 0u128;
    let mut boundary = false;
    let mut max_children = 1usize;
    for i in (0..N).rev() {
        key = (key << WIDTH_BITS) | dims[i].lb as u128;
        key = (key << WIDTH_BITS) | dims[i].tb as u128;
        boundary |= dims[i].touches;
        if dims[i].can_cut {
            max_children *= 3;
        }
    }

    ZoidShape {
        key,
        centroid: domain.centroid(grid),
        boundary,
        dims,
        max_children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_absolute_position() {
        let domain = Domain::new([64], [1]);
        let a = GridInfo {
            x0: [10],
            dx0: [1],
            x1: [30],
            dx1: [-1],
        };
        let mut b = a;
        b.x0[0] += 7;
        b.x1[0] += 7;

        let sa = derive_shape(&domain, &a, 4, &[8], &[8]);
        let sb = derive_shape(&domain, &b, 4, &[8], &[8]);
        assert_eq!(sa.key, sb.key);
        assert_ne!(sa.centroid, sb.centroid);
    }

    #[test]
    fn fingerprint_distinguishes_widths() {
        let domain = Domain::new([64], [1]);
        let a = GridInfo::rect([8], [40]);
        let b = GridInfo::rect([8], [41]);
        let sa = derive_shape(&domain, &a, 4, &[8], &[8]);
        let sb = derive_shape(&domain, &b, 4, &[8], &[8]);
        assert_ne!(sa.key, sb.key);
    }

    #[test]
    fn boundary_touch_predicate() {
        let domain = Domain::new([64], [1]);
        let interior = GridInfo::rect([8], [40]);
        assert!(!domain.touches_boundary(0, 4, &interior));

        let left = GridInfo::rect([0], [16]);
        assert!(domain.touches_boundary(0, 4, &left));

        // Interior at the base but slanting out the top.
        let slanted = GridInfo {
            x0: [2],
            dx0: [-1],
            x1: [20],
            dx1: [0],
        };
        assert!(domain.touches_boundary(0, 4, &slanted));
    }

    #[test]
    fn initial_cut_flag_requires_full_unslanted_width() {
        let domain = Domain::new([64], [1]);
        let full = domain.full_grid();
        let shape = derive_shape(&domain, &full, 8, &[8], &[8]);
        assert!(shape.dims[0].initial);
        assert!(shape.boundary);

        let shape = derive_shape(&domain, &GridInfo::rect([0], [63]), 8, &[8], &[8]);
        assert!(!shape.dims[0].initial);
    }

    #[test]
    fn sheared_grid_advances_edges_keeps_slopes() {
        let g = GridInfo {
            x0: [4, 0],
            dx0: [1, 0],
            x1: [20, 16],
            dx1: [-1, 0],
        };
        let s = g.sheared(4);
        assert_eq!(s.x0, [8, 0]);
        assert_eq!(s.x1, [16, 16]);
        assert_eq!(s.dx0, g.dx0);
        assert_eq!(s.dx1, g.dx1);
    }
}
