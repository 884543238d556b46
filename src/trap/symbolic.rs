//! The symbolic (auto-tuning) pass.
//!
//! One recursive procedure per zoid: consult the projection cache, measure a
//! time-cut candidate and the best space-cut subset, decide, and either keep
//! the divide-and-conquer subtree or fall back to a timed base-case loop.
//! Wall-clock attribution uses the redundant-time correction: every call
//! reports its own bookkeeping overhead upward so ancestors can subtract out
//! descendants' self-measurement cost, and memoized (not re-executed)
//! descendant cost travels separately as projected time.

use std::time::Instant;

use super::cuts::space_cut_rounds;
use super::decision::{Decision, DimDecision};
use super::grid::{derive_shape, Domain, GridInfo, ZoidShape};
use super::zoid::{SimpleZoid, ZoidArena, ZoidIdx};

/// The user-supplied stencil update capability. `interior` may assume no read
/// wraps the periodic boundary; `boundary` must handle wrapping. Both update
/// every point of the trapezoid across the time interval.
pub trait StencilKernel<const N: usize>: Sync {
    fn interior(&self, t0: i64, t1: i64, grid: &GridInfo<N>);
    fn boundary(&self, t0: i64, t1: i64, grid: &GridInfo<N>);
}

/// Configuration for an auto-tuner instance.
///
/// Use `TunerConfig::default()` for library defaults, or customise individual
/// knobs via the builder methods.
#[derive(Clone, Copy, Debug)]
pub struct TunerConfig<const N: usize> {
    /// Stop time cuts at or below this height (interior zoids).
    pub time_cut_floor: i64,
    /// Stop time cuts at or below this height (boundary-touching zoids).
    pub boundary_time_cut_floor: i64,
    /// Per-dimension base-width floor below which interior space cuts stop.
    pub space_cut_floor: [i64; N],
    /// Per-dimension floor for boundary-touching zoids; usually larger, the
    /// boundary kernel has coarser profitable granularity.
    pub boundary_space_cut_floor: [i64; N],
    /// Divide-and-conquer is preferred while its cost stays under
    /// `fuzz * loop_time`; a bias against flip-flopping near the threshold.
    pub fuzz: f64,
    /// Number of threads for the replay pool.
    /// `None` means auto-detect (physical cores).
    pub thread_count: Option<usize>,
}

impl<const N: usize> Default for TunerConfig<N> {
    fn default() -> Self {
        Self {
            time_cut_floor: 3,
            boundary_time_cut_floor: 3,
            space_cut_floor: [64; N],
            boundary_space_cut_floor: [128; N],
            fuzz: 1.2,
            thread_count: None,
        }
    }
}

impl<const N: usize> TunerConfig<N> {
    /// Set both interior and boundary time-cut floors. A floor below 1 would
    /// let a height-1 zoid bisect into a height-0 half plus a copy of its own
    /// shape, which the projection cache would resolve to the zoid still
    /// being tuned.
    pub fn time_cut_floor(mut self, floor: i64) -> Self {
        assert!(floor >= 1, "time-cut floor must be at least 1");
        self.time_cut_floor = floor;
        self.boundary_time_cut_floor = floor;
        self
    }

    /// Set the interior space-cut floor for every dimension.
    pub fn space_cut_floor(mut self, floor: i64) -> Self {
        assert!(floor >= 0, "space-cut floor must be non-negative");
        self.space_cut_floor = [floor; N];
        self
    }

    /// Set the boundary space-cut floor for every dimension.
    pub fn boundary_space_cut_floor(mut self, floor: i64) -> Self {
        assert!(floor >= 0, "space-cut floor must be non-negative");
        self.boundary_space_cut_floor = [floor; N];
        self
    }

    pub fn fuzz(mut self, fuzz: f64) -> Self {
        assert!(fuzz > 1.0, "fuzz must exceed 1.0");
        self.fuzz = fuzz;
        self
    }

    /// Set an explicit thread count for the replay pool.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }
}

/// Summary of a completed tuning pass.
#[derive(Clone, Copy, Debug)]
pub struct TuneReport {
    /// Arena index of the top-level zoid.
    pub root: ZoidIdx,
    /// Distinct zoid shapes discovered (excluding the sentinel).
    pub zoid_count: usize,
    /// The root zoid's chosen cost estimate, seconds.
    pub tuned_cost: f64,
    /// Wall-clock duration of the whole tuning pass, seconds.
    pub elapsed: f64,
}

/// What one recursive tuning call reports to its parent.
#[derive(Clone, Copy, Debug, Default)]
struct TuneStats {
    /// Bookkeeping overhead not attributable to any child's necessary cost.
    redundant: f64,
    /// Cost of memoized descendants that were not re-executed.
    projected: f64,
    /// Maximum base-case loop time seen anywhere in the subtree.
    max_loop: f64,
}

/// The auto-tuning, cache-oblivious space-time decomposition engine.
pub struct AutoTuner<const N: usize> {
    domain: Domain<N>,
    config: TunerConfig<N>,
    arena: ZoidArena<N>,
    /// Reduced zoid table for the replay pass; empty until `compile`.
    pub(super) simple: Vec<SimpleZoid<N>>,
    pub(super) pool: rayon::ThreadPool,
    root: Option<ZoidIdx>,
}

fn resolve_thread_count<const N: usize>(config: &TunerConfig<N>) -> usize {
    config
        .thread_count
        .unwrap_or_else(|| num_cpus::get_physical().max(1))
}

impl<const N: usize> AutoTuner<N> {
    pub fn new(domain: Domain<N>) -> Self {
        Self::with_config(domain, TunerConfig::default())
    }

    pub fn with_config(domain: Domain<N>, config: TunerConfig<N>) -> Self {
        assert!(config.fuzz > 1.0, "fuzz must exceed 1.0");
        assert!(
            config.time_cut_floor >= 1 && config.boundary_time_cut_floor >= 1,
            "time-cut floors must be at least 1"
        );
        assert!(
            config
                .space_cut_floor
                .iter()
                .chain(&config.boundary_space_cut_floor)
                .all(|&f| f >= 0),
            "space-cut floors must be non-negative"
        );
        let threads = resolve_thread_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("failed to build replay thread pool");
        Self {
            domain,
            config,
            arena: ZoidArena::new(),
            simple: Vec::new(),
            pool,
            root: None,
        }
    }

    #[inline]
    pub fn domain(&self) -> &Domain<N> {
        &self.domain
    }

    #[inline]
    pub fn arena(&self) -> &ZoidArena<N> {
        &self.arena
    }

    #[inline]
    pub fn root(&self) -> Option<ZoidIdx> {
        self.root
    }

    /// Tune the full domain over `[t0, t1)`. Executes the kernel as part of
    /// measurement; grid state is dirty afterwards and the caller should
    /// re-seed before replaying.
    pub fn tune<K: StencilKernel<N>>(&mut self, t0: i64, t1: i64, kernel: &K) -> TuneReport {
        let grid = self.domain.full_grid();
        self.tune_grid(t0, t1, &grid, kernel)
    }

    /// Tune an explicit top-level grid over `[t0, t1)`.
    pub fn tune_grid<K: StencilKernel<N>>(
        &mut self,
        t0: i64,
        t1: i64,
        grid: &GridInfo<N>,
        kernel: &K,
    ) -> TuneReport {
        assert!(t1 > t0, "empty time interval");
        assert!(self.root.is_none(), "tuner already holds a tuned tree");

        let start = Instant::now();
        self.tune_zoid(t0, t1, grid, ZoidArena::<N>::SENTINEL, kernel);
        let root = self.arena.zoid(ZoidArena::<N>::SENTINEL).children[0];
        self.root = Some(root);

        TuneReport {
            root,
            zoid_count: self.arena.len() - 1,
            tuned_cost: self.arena.zoid(root).time,
            elapsed: start.elapsed().as_secs_f64(),
        }
    }

    /// Build the reduced zoid table the replay engine walks.
    pub fn compile(&mut self) {
        assert!(self.root.is_some(), "compile before tune");
        self.simple = self.arena.compile();
    }

    /// One recursive tuning call: the per-zoid decision state machine.
    fn tune_zoid<K: StencilKernel<N>>(
        &mut self,
        t0: i64,
        t1: i64,
        grid: &GridInfo<N>,
        parent: ZoidIdx,
        kernel: &K,
    ) -> TuneStats {
        let call_start = Instant::now();
        let lt = t1 - t0;
        let shape = derive_shape(
            &self.domain,
            grid,
            lt,
            &self.config.space_cut_floor,
            &self.config.boundary_space_cut_floor,
        );

        let (index, existed) = if shape.boundary {
            self.arena
                .lookup_or_create_boundary(shape.key, lt, shape.centroid)
        } else {
            self.arena.lookup_or_create_interior(shape.key, lt)
        };
        self.arena.zoid_mut(parent).children.push(index);

        if existed {
            // Same shape already decided: charge its memoized cost as
            // projected time, nothing is re-measured.
            let z = self.arena.zoid(index);
            assert_eq!(z.height, lt, "projection hit with mismatched height");
            assert_eq!(
                z.decision.boundary, shape.boundary,
                "projection hit with mismatched boundary kind"
            );
            return TuneStats {
                redundant: call_start.elapsed().as_secs_f64(),
                projected: z.time,
                max_loop: z.max_loop_time,
            };
        }

        let time_floor = if shape.boundary {
            self.config.boundary_time_cut_floor
        } else {
            self.config.time_cut_floor
        };
        let try_time_cut = lt > time_floor;
        let sim_can_cut = shape.dims.iter().any(|d| d.can_cut);
        let divide_and_conquer = try_time_cut || sim_can_cut;
        let mut max_loop = 0.0f64;

        // ── Candidate: time cut ─────────────────────────────────────────
        let mut time_candidate: Option<(f64, f64, Vec<ZoidIdx>)> = None;
        if try_time_cut {
            self.arena
                .zoid_mut(index)
                .children
                .reserve(shape.max_children.max(2));
            let t_start = Instant::now();
            let halflt = lt / 2;
            let s1 = self.tune_zoid(t0, t0 + halflt, grid, index, kernel);
            let sheared = grid.sheared(halflt);
            let s2 = self.tune_zoid(t0 + halflt, t1, &sheared, index, kernel);
            max_loop = max_loop.max(s1.max_loop).max(s2.max_loop);

            let rtime = s1.redundant + s2.redundant;
            let ptime = s1.projected + s2.projected;
            let elapsed = t_start.elapsed().as_secs_f64() - rtime;
            assert!(elapsed >= 0.0, "negative net elapsed for time-cut candidate");
            let children = std::mem::take(&mut self.arena.zoid_mut(index).children);
            debug_assert_eq!(children.len(), 2);
            time_candidate = Some((elapsed, ptime, children));
        }

        // ── Candidate: best space-cut subset ────────────────────────────
        let mut space_candidate: Option<(f64, f64, Vec<ZoidIdx>, usize)> = None;
        if sim_can_cut {
            for subset in (1..(1usize << N)).rev() {
                if !subset_feasible(subset, &shape) {
                    continue;
                }
                let plan = subset_plan(subset, &shape);
                let s_start = Instant::now();
                let mut rtime = 0.0;
                let mut ptime = 0.0;
                let rounds = space_cut_rounds(t0, t1, grid, &plan, &self.domain.slope);
                for round in &rounds {
                    for sub in round {
                        let s = self.tune_zoid(t0, t1, sub, index, kernel);
                        rtime += s.redundant;
                        ptime += s.projected;
                        max_loop = max_loop.max(s.max_loop);
                    }
                }
                let elapsed = s_start.elapsed().as_secs_f64() - rtime;
                assert!(elapsed >= 0.0, "negative net elapsed for space-cut candidate");
                let children = std::mem::take(&mut self.arena.zoid_mut(index).children);
                debug_assert_eq!(
                    children.len(),
                    subset_decision(subset, &shape).child_count(),
                    "space cut produced a child count inconsistent with its plan"
                );

                // Strict improvement only: ties keep the earlier (more
                // saturated) subset.
                let beats = match &space_candidate {
                    Some((best_e, best_p, _, _)) => elapsed + ptime < best_e + best_p,
                    None => true,
                };
                if beats {
                    space_candidate = Some((elapsed, ptime, children, subset));
                }
            }
        }

        // ── Decide ──────────────────────────────────────────────────────
        let (necessary, projected1, chosen_children, chosen_decision) =
            match (time_candidate, space_candidate) {
                (Some((te, tp, tc)), Some((se, sp, sc, subset))) => {
                    if se + sp < te + tp {
                        (se, sp, sc, subset_decision(subset, &shape))
                    } else {
                        (te, tp, tc, Decision::time_cut(shape.boundary))
                    }
                }
                (Some((te, tp, tc)), None) => (te, tp, tc, Decision::time_cut(shape.boundary)),
                (None, Some((se, sp, sc, subset))) => {
                    (se, sp, sc, subset_decision(subset, &shape))
                }
                (None, None) => (0.0, 0.0, Vec::new(), Decision::leaf(shape.boundary)),
            };

        // ── Base case or recurse ────────────────────────────────────────
        let necessary_time;
        let projected_out;
        if divide_and_conquer && necessary + projected1 < max_loop {
            // A slower loop already exists somewhere in this subtree, so this
            // zoid's loop cannot win: adopt divide-and-conquer unmeasured.
            let z = self.arena.zoid_mut(index);
            z.decision = chosen_decision;
            z.children = chosen_children;
            z.time = necessary + projected1;
            necessary_time = necessary;
            projected_out = projected1;
        } else {
            let l_start = Instant::now();
            if shape.boundary {
                kernel.boundary(t0, t1, grid);
            } else {
                kernel.interior(t0, t1, grid);
            }
            let loop_time = l_start.elapsed().as_secs_f64();
            max_loop = max_loop.max(loop_time);

            if divide_and_conquer && necessary + projected1 < self.config.fuzz * loop_time {
                let z = self.arena.zoid_mut(index);
                z.decision = chosen_decision;
                z.children = chosen_children;
                z.time = necessary + projected1;
                necessary_time = necessary;
                projected_out = projected1;
            } else {
                let z = self.arena.zoid_mut(index);
                z.decision = Decision::leaf(shape.boundary);
                z.children = Vec::new();
                z.time = loop_time;
                necessary_time = loop_time;
                projected_out = 0.0;
            }
        }
        self.arena.zoid_mut(index).max_loop_time = max_loop;

        let total = call_start.elapsed().as_secs_f64();
        let redundant = total - necessary_time;
        assert!(redundant >= 0.0, "necessary time exceeds total elapsed");
        TuneStats {
            redundant,
            projected: projected_out,
            max_loop,
        }
    }
}

/// A subset is valid only if every dimension it requests is individually
/// cut-feasible.
#[inline]
fn subset_feasible<const N: usize>(subset: usize, shape: &ZoidShape<N>) -> bool {
    (0..N).all(|j| subset & (1 << j) == 0 || shape.dims[j].can_cut)
}

/// The per-dimension cut plan a subset implies.
fn subset_plan<const N: usize>(subset: usize, shape: &ZoidShape<N>) -> [DimDecision; N] {
    std::array::from_fn(|j| DimDecision {
        cut: subset & (1 << j) != 0,
        inverted: shape.dims[j].inverted,
        initial: shape.dims[j].initial,
    })
}

/// The full decision a winning subset records.
fn subset_decision<const N: usize>(subset: usize, shape: &ZoidShape<N>) -> Decision<N> {
    Decision {
        cut_time: false,
        boundary: shape.boundary,
        dims: subset_plan(subset, shape),
    }
}
