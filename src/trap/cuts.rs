//! Space-cut child generation.
//!
//! One generator serves both passes: the tuner feeds it a candidate subset of
//! dimensions, the replay engine feeds it the recorded decision. Children are
//! produced breadth-first dimension-by-dimension through a two-slot
//! double-buffered queue, grouped into `N+1` dependency rounds: everything in
//! round `r` must complete before round `r+1` starts, because the flanking
//! pieces of a cut lean on the middle piece (or vice versa for an inverted
//! trapezoid).
//!
//! The per-dimension split rules are the classic trapezoid cuts: bisect the
//! longer base so the middle triangle is non-degenerate and both flanks are
//! strictly smaller than the parent.

use std::collections::VecDeque;

use super::decision::DimDecision;
use super::grid::GridInfo;

/// Generate the sub-grids of a space cut over `grid`, grouped by dependency
/// round. Within a round, sub-grids are independent and ordered exactly as the
/// tuning pass consumes them; rounds are ordered and must be joined between.
pub fn space_cut_rounds<const N: usize>(
    t0: i64,
    t1: i64,
    grid: &GridInfo<N>,
    dims: &[DimDecision; N],
    slope: &[i64; N],
) -> Vec<Vec<GridInfo<N>>> {
    let lt = t1 - t0;
    let mut cur_q: VecDeque<(isize, GridInfo<N>)> = VecDeque::new();
    let mut next_q: VecDeque<(isize, GridInfo<N>)> = VecDeque::new();
    let mut rounds: Vec<Vec<GridInfo<N>>> = Vec::with_capacity(N + 1);

    cur_q.push_back((N as isize - 1, *grid));
    for _dep in 0..=N {
        let mut leaves = Vec::new();
        while let Some((level, g)) = cur_q.pop_front() {
            if level < 0 {
                // All dimensions processed: a finished sub-grid of this round.
                leaves.push(g);
                continue;
            }
            let dim = level as usize;
            let d = dims[dim];
            if !d.cut {
                cur_q.push_back((level - 1, g));
                continue;
            }
            cut_dimension(&g, dim, lt, slope[dim], d, |round_grid, dependent| {
                let entry = (level - 1, round_grid);
                if dependent {
                    next_q.push_back(entry);
                } else {
                    cur_q.push_back(entry);
                }
            });
        }
        rounds.push(leaves);
        std::mem::swap(&mut cur_q, &mut next_q);
    }
    debug_assert!(cur_q.is_empty() && next_q.is_empty(), "space cut left unprocessed sub-grids");
    rounds
}

/// Split `grid` along `dim` into its child geometries, reporting each with a
/// flag for whether it belongs to the next dependency round.
fn cut_dimension<const N: usize>(
    g: &GridInfo<N>,
    dim: usize,
    lt: i64,
    slope: i64,
    d: DimDecision,
    mut emit: impl FnMut(GridInfo<N>, bool),
) {
    let thres = slope * lt;
    let lb = g.lb(dim);
    let tb = g.tb(dim, lt);
    let l_start = g.x0[dim];
    let l_end = g.x1[dim];
    let mut son = *g;

    if d.inverted {
        // Bottom base is the short side: carve the triangle out of it first,
        // then the flanks grow over it.
        debug_assert!(!d.initial, "initial cut cannot be inverted");
        let mid = lb / 2;

        son.x0[dim] = l_start + mid - thres;
        son.dx0[dim] = slope;
        son.x1[dim] = l_start + mid + thres;
        son.dx1[dim] = -slope;
        emit(son, false);

        son.x0[dim] = l_start;
        son.dx0[dim] = g.dx0[dim];
        son.x1[dim] = l_start + mid - thres;
        son.dx1[dim] = slope;
        emit(son, true);

        son.x0[dim] = l_start + mid + thres;
        son.dx0[dim] = -slope;
        son.x1[dim] = l_end;
        son.dx1[dim] = g.dx1[dim];
        emit(son, true);
    } else if d.initial {
        // Full-width un-slanted dimension: no existing slant to exploit, so
        // the first cut is one full-width sloped trapezoid plus a degenerate
        // point triangle that fills the notch.
        debug_assert!(g.dx0[dim] == 0 && g.dx1[dim] == 0, "initial cut on a slanted grid");

        son.x0[dim] = l_start;
        son.dx0[dim] = slope;
        son.x1[dim] = l_end;
        son.dx1[dim] = -slope;
        emit(son, false);

        son.x0[dim] = l_end;
        son.dx0[dim] = -slope;
        son.x1[dim] = l_end;
        son.dx1[dim] = slope;
        emit(son, true);
    } else {
        // Top base is the short side: the flanks go first, the upside-down
        // middle triangle fills in after them.
        let mid = tb / 2;
        let ul_start = g.x0[dim] + g.dx0[dim] * lt;

        son.x0[dim] = l_start;
        son.dx0[dim] = g.dx0[dim];
        son.x1[dim] = ul_start + mid;
        son.dx1[dim] = -slope;
        emit(son, false);

        son.x0[dim] = ul_start + mid;
        son.dx0[dim] = slope;
        son.x1[dim] = l_end;
        son.dx1[dim] = g.dx1[dim];
        emit(son, false);

        son.x0[dim] = ul_start + mid;
        son.dx0[dim] = -slope;
        son.x1[dim] = ul_start + mid;
        son.dx1[dim] = slope;
        emit(son, true);
    }
}
