use std::time::Instant;
use trap_tune::heat::{naive_step_1d, Heat1d};
use trap_tune::{AutoTuner, Domain, TunerConfig};

const SEED: u64 = 0x7EA7_0D5E_ED12_3401;

fn bench_width(width: i64, steps: i64) -> (usize, f64, f64, f64) {
    let domain = Domain::new([width], [1]);
    let config = TunerConfig::default().space_cut_floor(128).boundary_space_cut_floor(256);
    let mut tuner = AutoTuner::with_config(domain, config);
    let mut heat = Heat1d::new(width);

    heat.seed(SEED);
    let report = tuner.tune(0, steps, &heat);
    tuner.compile();

    heat.seed(SEED);
    let start = Instant::now();
    tuner.replay(0, steps, &heat);
    let replay_ms = start.elapsed().as_secs_f64() * 1000.0;

    heat.seed(SEED);
    let mut cells = vec![0.0; 2 * width as usize];
    cells[..width as usize].copy_from_slice(&heat.row(0));
    let start = Instant::now();
    naive_step_1d(width, &mut cells, 0, steps);
    let naive_ms = start.elapsed().as_secs_f64() * 1000.0;

    (report.zoid_count, report.elapsed * 1000.0, replay_ms, naive_ms)
}

fn main() {
    let scales: &[(i64, i64)] = &[
        (1_000, 500),
        (4_000, 1_000),
        (16_000, 2_000),
        (60_000, 4_000),
    ];

    println!(
        "{:<10} {:>8} {:>8} {:>12} {:>12} {:>12} {:>10}",
        "Width", "Steps", "Zoids", "Tune(ms)", "Replay(ms)", "Naive(ms)", "Speedup"
    );
    println!("{}", "-".repeat(78));

    for &(width, steps) in scales {
        let (zoids, tune_ms, replay_ms, naive_ms) = bench_width(width, steps);
        println!(
            "{:<10} {:>8} {:>8} {:>12.1} {:>12.1} {:>12.1} {:>9.2}x",
            width,
            steps,
            zoids,
            tune_ms,
            replay_ms,
            naive_ms,
            naive_ms / replay_ms
        );
    }
}
