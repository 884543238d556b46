//! The replay (production) pass.
//!
//! Walks the compiled zoid table and dispatches on each recorded decision
//! with no further search or timing. Space-cut children execute in parallel
//! within a dependency round; rounds join at a barrier. The last sub-grid of
//! each round runs inline on the current worker instead of being spawned.

use super::cuts::space_cut_rounds;
use super::grid::GridInfo;
use super::symbolic::{AutoTuner, StencilKernel};
use super::zoid::{SimpleZoid, ZoidIdx};

impl<const N: usize> AutoTuner<N> {
    /// Execute the tuned plan over the full domain for `[t0, t1)`.
    ///
    /// The time extent must match the one the plan was tuned for.
    pub fn replay<K: StencilKernel<N>>(&self, t0: i64, t1: i64, kernel: &K) {
        let root = self.root().expect("replay before tune");
        assert!(!self.simple.is_empty(), "replay before compile");
        assert_eq!(
            self.simple[root.index()].height,
            t1 - t0,
            "replay time extent differs from the tuned one"
        );
        let grid = self.domain().full_grid();
        self.pool
            .install(|| self.replay_zoid(t0, t1, &grid, root, kernel));
    }

    fn replay_zoid<K: StencilKernel<N>>(
        &self,
        t0: i64,
        t1: i64,
        grid: &GridInfo<N>,
        idx: ZoidIdx,
        kernel: &K,
    ) {
        let z = &self.simple[idx.index()];
        debug_assert_eq!(z.height, t1 - t0, "zoid height mismatch during replay");

        if z.decision.cuts_space() {
            self.replay_space_cut(t0, t1, grid, z, kernel);
        } else if z.decision.cut_time {
            let halflt = (t1 - t0) / 2;
            self.replay_zoid(t0, t0 + halflt, grid, z.children[0], kernel);
            let sheared = grid.sheared(halflt);
            self.replay_zoid(t0 + halflt, t1, &sheared, z.children[1], kernel);
        } else if z.decision.boundary {
            kernel.boundary(t0, t1, grid);
        } else {
            kernel.interior(t0, t1, grid);
        }
    }

    fn replay_space_cut<K: StencilKernel<N>>(
        &self,
        t0: i64,
        t1: i64,
        grid: &GridInfo<N>,
        z: &SimpleZoid<N>,
        kernel: &K,
    ) {
        let rounds = space_cut_rounds(t0, t1, grid, &z.decision.dims, &self.domain().slope);
        let mut next = 0usize;
        for round in &rounds {
            if round.is_empty() {
                continue;
            }
            rayon::scope(|s| {
                for (i, sub) in round.iter().enumerate() {
                    let child = z.children[next + i];
                    if i + 1 == round.len() {
                        self.replay_zoid(t0, t1, sub, child, kernel);
                    } else {
                        s.spawn(move |_| self.replay_zoid(t0, t1, sub, child, kernel));
                    }
                }
            });
            next += round.len();
        }
        assert_eq!(
            next,
            z.children.len(),
            "space cut replay consumed a different child count than was recorded"
        );
    }
}
