use std::time::Instant;
use trap_tune::heat::{naive_step_1d, Heat1d};
use trap_tune::{AutoTuner, Domain, TunerConfig};

const DEFAULT_WIDTH: i64 = 4000;
const DEFAULT_STEPS: i64 = 1000;
const SEED: u64 = 0x7EA7_0D5E_ED12_3401;

struct MainArgs {
    width: i64,
    steps: i64,
    config: TunerConfig<1>,
}

fn parse_args() -> MainArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut width = DEFAULT_WIDTH;
    let mut steps = DEFAULT_STEPS;
    let mut config = TunerConfig::default();
    let next_arg = |i: usize, flag: &str| -> &str {
        args.get(i)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("{flag} requires a value"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--width" => {
                i += 1;
                width = next_arg(i, "--width")
                    .parse()
                    .expect("--width requires a positive integer");
            }
            "--steps" => {
                i += 1;
                steps = next_arg(i, "--steps")
                    .parse()
                    .expect("--steps requires a positive integer");
            }
            "--threads" => {
                i += 1;
                let n: usize = next_arg(i, "--threads")
                    .parse()
                    .expect("--threads requires a positive integer");
                config = config.thread_count(n);
            }
            "--floor" => {
                i += 1;
                let n: i64 = next_arg(i, "--floor")
                    .parse()
                    .expect("--floor requires a positive integer");
                config = config.space_cut_floor(n).boundary_space_cut_floor(2 * n);
            }
            other => panic!(
                "unknown argument: {other}\nusage: trap-tune [--width N] [--steps N] [--threads N] [--floor N]"
            ),
        }
        i += 1;
    }
    assert!(width > 0 && steps > 0, "width and steps must be positive");
    MainArgs {
        width,
        steps,
        config,
    }
}

fn main() {
    let args = parse_args();
    let domain = Domain::new([args.width], [1]);
    let mut tuner = AutoTuner::with_config(domain, args.config);
    let mut heat = Heat1d::new(args.width);

    heat.seed(SEED);
    let report = tuner.tune(0, args.steps, &heat);
    tuner.compile();
    println!(
        "Tuned {} distinct zoids in {:.3} ms (estimated plan cost {:.3} ms)",
        report.zoid_count,
        report.elapsed * 1000.0,
        report.tuned_cost * 1000.0
    );

    // Tuning executed the kernel, so re-seed before the timed replay.
    heat.seed(SEED);
    let start = Instant::now();
    tuner.replay(0, args.steps, &heat);
    let replay_ms = start.elapsed().as_secs_f64() * 1000.0;
    let tuned_row = heat.row(args.steps);

    let mut reference = Heat1d::new(args.width);
    reference.seed(SEED);
    let w = args.width as usize;
    let mut cells = vec![0.0; 2 * w];
    cells[..w].copy_from_slice(&reference.row(0));
    let start = Instant::now();
    naive_step_1d(args.width, &mut cells, 0, args.steps);
    let naive_ms = start.elapsed().as_secs_f64() * 1000.0;
    let base = (args.steps & 1) as usize * w;
    let naive_row = &cells[base..base + w];

    let match_status = if tuned_row == naive_row {
        "MATCH"
    } else {
        "MISMATCH"
    };
    println!(
        "Heat width {} x {} steps: tuned replay {replay_ms:.3} ms, naive {naive_ms:.3} ms [{match_status}]",
        args.width, args.steps
    );
    println!("Speedup (naive / tuned): {:.2}x", naive_ms / replay_ms);
}
