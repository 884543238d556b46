use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use trap_tune::trap::{ZoidArena, ZoidIdx};
use trap_tune::{AutoTuner, Domain, GridInfo, StencilKernel, TunerConfig};

/// Kernel that counts how many times each space-time point is updated.
/// Replay of a correct plan must touch every point of the full space-time
/// block exactly once.
struct CountKernel1d {
    width: i64,
    steps: i64,
    counts: Vec<AtomicU32>,
}

impl CountKernel1d {
    fn new(width: i64, steps: i64) -> Self {
        let mut counts = Vec::new();
        counts.resize_with((width * steps) as usize, || AtomicU32::new(0));
        Self {
            width,
            steps,
            counts,
        }
    }

    fn reset(&mut self) {
        for c in &mut self.counts {
            *c.get_mut() = 0;
        }
    }

    fn visit(&self, t0: i64, t1: i64, grid: &GridInfo<1>) {
        for t in t0..t1 {
            assert!(t >= 0 && t < self.steps, "step {t} outside the tuned block");
            let dt = t - t0;
            let xs = grid.x0[0] + grid.dx0[0] * dt;
            let xe = grid.x1[0] + grid.dx1[0] * dt;
            for x in xs..xe {
                let x = x.rem_euclid(self.width);
                self.counts[(t * self.width + x) as usize].fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl StencilKernel<1> for CountKernel1d {
    fn interior(&self, t0: i64, t1: i64, grid: &GridInfo<1>) {
        self.visit(t0, t1, grid);
    }
    fn boundary(&self, t0: i64, t1: i64, grid: &GridInfo<1>) {
        self.visit(t0, t1, grid);
    }
}

struct CountKernel2d {
    len: [i64; 2],
    counts: Vec<AtomicU32>,
}

impl CountKernel2d {
    fn new(len: [i64; 2], steps: i64) -> Self {
        let mut counts = Vec::new();
        counts.resize_with((len[0] * len[1] * steps) as usize, || AtomicU32::new(0));
        Self { len, counts }
    }

    fn reset(&mut self) {
        for c in &mut self.counts {
            *c.get_mut() = 0;
        }
    }

    fn visit(&self, t0: i64, t1: i64, grid: &GridInfo<2>) {
        let [ni, nj] = self.len;
        for t in t0..t1 {
            let dt = t - t0;
            let is = grid.x0[0] + grid.dx0[0] * dt;
            let ie = grid.x1[0] + grid.dx1[0] * dt;
            let js = grid.x0[1] + grid.dx0[1] * dt;
            let je = grid.x1[1] + grid.dx1[1] * dt;
            for i in is..ie {
                let wi = i.rem_euclid(ni);
                for j in js..je {
                    let wj = j.rem_euclid(nj);
                    let idx = (t * ni * nj + wi * nj + wj) as usize;
                    self.counts[idx].fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

impl StencilKernel<2> for CountKernel2d {
    fn interior(&self, t0: i64, t1: i64, grid: &GridInfo<2>) {
        self.visit(t0, t1, grid);
    }
    fn boundary(&self, t0: i64, t1: i64, grid: &GridInfo<2>) {
        self.visit(t0, t1, grid);
    }
}

fn small_config<const N: usize>(threads: usize) -> TunerConfig<N> {
    TunerConfig::default()
        .time_cut_floor(2)
        .space_cut_floor(8)
        .boundary_space_cut_floor(8)
        .thread_count(threads)
}

#[test]
fn replay_visits_every_point_exactly_once_1d() {
    let width = 96;
    let steps = 48;
    let mut tuner = AutoTuner::with_config(Domain::new([width], [1]), small_config(2));
    let mut kernel = CountKernel1d::new(width, steps);

    tuner.tune(0, steps, &kernel);
    tuner.compile();

    kernel.reset();
    tuner.replay(0, steps, &kernel);
    for (i, c) in kernel.counts.iter().enumerate() {
        assert_eq!(
            c.load(Ordering::Relaxed),
            1,
            "point (t={}, x={}) visited a wrong number of times",
            i as i64 / width,
            i as i64 % width
        );
    }
}

#[test]
fn replay_visits_every_point_exactly_once_2d() {
    let len = [24, 24];
    let steps = 12;
    let mut tuner = AutoTuner::with_config(Domain::new(len, [1, 1]), small_config(4));
    let mut kernel = CountKernel2d::new(len, steps);

    tuner.tune(0, steps, &kernel);
    tuner.compile();

    kernel.reset();
    tuner.replay(0, steps, &kernel);
    for c in &kernel.counts {
        assert_eq!(c.load(Ordering::Relaxed), 1);
    }
}

#[test]
fn replay_is_repeatable() {
    let width = 64;
    let steps = 32;
    let mut tuner = AutoTuner::with_config(Domain::new([width], [1]), small_config(2));
    let mut kernel = CountKernel1d::new(width, steps);

    tuner.tune(0, steps, &kernel);
    tuner.compile();

    kernel.reset();
    tuner.replay(0, steps, &kernel);
    tuner.replay(0, steps, &kernel);
    for c in &kernel.counts {
        assert_eq!(c.load(Ordering::Relaxed), 2);
    }
}

/// Kernel that only counts how many base-case leaves it is handed.
struct LeafCounter(AtomicU64);

impl StencilKernel<1> for LeafCounter {
    fn interior(&self, _t0: i64, _t1: i64, _grid: &GridInfo<1>) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
    fn boundary(&self, _t0: i64, _t1: i64, _grid: &GridInfo<1>) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Number of base-case leaves a full execution of the plan reaches, counting
/// shared zoids once per arrival.
fn plan_leaf_count(arena: &ZoidArena<1>, idx: ZoidIdx) -> u64 {
    let z = arena.zoid(idx);
    if z.decision.is_leaf() {
        1
    } else {
        z.children.iter().map(|&c| plan_leaf_count(arena, c)).sum()
    }
}

#[test]
fn replay_reaches_exactly_the_leaves_the_plan_records() {
    // 1-D, physical length 64, 32 steps, slope 1, recursion floor 8.
    let steps = 32;
    let config = TunerConfig::default()
        .space_cut_floor(8)
        .boundary_space_cut_floor(8)
        .thread_count(2);
    let mut tuner = AutoTuner::with_config(Domain::new([64], [1]), config);
    let kernel = LeafCounter(AtomicU64::new(0));

    tuner.tune(0, steps, &kernel);
    tuner.compile();
    let root = tuner.root().expect("tuned root");
    let expected = plan_leaf_count(tuner.arena(), root);
    assert!(expected > 0);

    kernel.0.store(0, Ordering::Relaxed);
    tuner.replay(0, steps, &kernel);
    assert_eq!(
        kernel.0.load(Ordering::Relaxed),
        expected,
        "replay visited a different number of leaves than the plan records"
    );
}

#[test]
fn single_threaded_replay_covers_the_block_too() {
    let width = 80;
    let steps = 40;
    let mut tuner = AutoTuner::with_config(Domain::new([width], [1]), small_config(1));
    let mut kernel = CountKernel1d::new(width, steps);

    tuner.tune(0, steps, &kernel);
    tuner.compile();

    kernel.reset();
    tuner.replay(0, steps, &kernel);
    for c in &kernel.counts {
        assert_eq!(c.load(Ordering::Relaxed), 1);
    }
}
