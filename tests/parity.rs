use trap_tune::heat::{naive_step_1d, naive_step_2d, Heat1d, Heat2d};
use trap_tune::{AutoTuner, Domain, TunerConfig};

fn small_config<const N: usize>(threads: usize) -> TunerConfig<N> {
    TunerConfig::default()
        .time_cut_floor(2)
        .space_cut_floor(8)
        .boundary_space_cut_floor(8)
        .thread_count(threads)
}

fn run_parity_1d(width: i64, steps: i64, seed: u64, threads: usize) {
    let mut tuner = AutoTuner::with_config(Domain::new([width], [1]), small_config(threads));
    let mut heat = Heat1d::new(width);

    heat.seed(seed);
    tuner.tune(0, steps, &heat);
    tuner.compile();

    heat.seed(seed);
    tuner.replay(0, steps, &heat);
    let tuned = heat.row(steps);

    heat.seed(seed);
    let w = width as usize;
    let mut cells = vec![0.0; 2 * w];
    cells[..w].copy_from_slice(&heat.row(0));
    naive_step_1d(width, &mut cells, 0, steps);
    let base = (steps & 1) as usize * w;

    assert_eq!(
        tuned,
        &cells[base..base + w],
        "replay diverged from the naive stepper (width {width}, steps {steps}, seed {seed})"
    );
}

fn run_parity_2d(len: [i64; 2], steps: i64, seed: u64, threads: usize) {
    let mut tuner = AutoTuner::with_config(Domain::new(len, [1, 1]), small_config(threads));
    let mut heat = Heat2d::new(len);

    heat.seed(seed);
    tuner.tune(0, steps, &heat);
    tuner.compile();

    heat.seed(seed);
    tuner.replay(0, steps, &heat);
    let tuned = heat.plane(steps);

    heat.seed(seed);
    let plane = (len[0] * len[1]) as usize;
    let mut cells = vec![0.0; 2 * plane];
    cells[..plane].copy_from_slice(&heat.plane(0));
    naive_step_2d(len, &mut cells, 0, steps);
    let base = (steps & 1) as usize * plane;

    assert_eq!(
        tuned,
        &cells[base..base + plane],
        "replay diverged from the naive stepper (len {len:?}, steps {steps}, seed {seed})"
    );
}

#[test]
fn heat_1d_matches_naive() {
    run_parity_1d(128, 64, 0xA1, 2);
    run_parity_1d(200, 50, 0xB2, 2);
}

#[test]
fn heat_1d_multiple_seeds() {
    for seed in [11u64, 22, 33, 44] {
        run_parity_1d(96, 32, seed, 2);
    }
}

#[test]
fn heat_1d_odd_sizes() {
    // Odd widths and heights exercise the uneven halves of every bisection.
    run_parity_1d(101, 37, 0xC3, 2);
    run_parity_1d(67, 31, 0xD4, 2);
}

#[test]
fn heat_1d_deterministic_across_thread_counts() {
    for threads in [1, 4] {
        run_parity_1d(160, 48, 0xE5, threads);
    }
}

#[test]
fn heat_2d_matches_naive() {
    run_parity_2d([32, 32], 16, 0xF6, 4);
    run_parity_2d([24, 40], 12, 0x17, 4);
}

#[test]
fn heat_2d_odd_sizes() {
    run_parity_2d([27, 33], 11, 0x28, 2);
}
