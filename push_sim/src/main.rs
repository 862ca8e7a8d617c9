//! Push arena simulator CLI
//!
//! Run arena scenarios headlessly, optionally exporting recorded frames.

use clap::Parser;
use push_sim::scenarios::ScenarioId;
use push_sim::{ScenarioResult, ScenarioRunner, SimConfig};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Push arena simulator
#[derive(Parser, Debug)]
#[command(name = "push-sim")]
#[command(about = "Run light-foraging robot scenarios in a 2D arena", long_about = None)]
struct Args {
    /// Scenario to run (forage, blackout, crowd, starved, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Layout seed (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// World steps per run (overrides the config file)
    #[arg(short = 'n', long)]
    steps: Option<u64>,

    /// Timestep in seconds (overrides the config file)
    #[arg(long)]
    dt: Option<f64>,

    /// World steps per frame (overrides the config file)
    #[arg(long)]
    skip: Option<u32>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export recorded frames to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let mut config = match SimConfig::load_or_default(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(dt) = args.dt {
        config.run.dt = dt;
    }
    if let Some(skip) = args.skip {
        config.run.skip = skip;
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: forage, blackout, crowd, starved, all");
                std::process::exit(2);
            }
        }
    };

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if !args.json {
        info!("Push arena simulator v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "seed={} steps={} dt={} skip={}",
            seed, config.run.steps, config.run.dt, config.run.skip
        );
    }

    let runner = ScenarioRunner::new(seed).with_config(config);
    let mut results: Vec<ScenarioResult> = Vec::new();

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(2);
        }

        let (result, export) = runner.run_recorded(scenarios[0]);
        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path.display()),
            Err(e) => {
                error!("Failed to write export: {}", e);
                std::process::exit(2);
            }
        }
        results.push(result);
    } else {
        for scenario in &scenarios {
            results.push(runner.run(*scenario));
        }
    }

    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "steps": r.total_steps,
                    "time_secs": r.final_time_secs,
                    "robots": r.robot_count,
                    "mean_charge_fraction": r.metrics.mean_charge_fraction,
                    "depleted_robots": r.metrics.depleted_robots,
                    "bumper_contacts": r.metrics.bumper_contacts,
                    "max_box_displacement": r.metrics.max_box_displacement,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        for r in &results {
            if r.passed {
                info!(
                    "✓ {} (seed={}) PASSED | mean charge {:.2} | {} depleted | boxes moved {:.2}m",
                    r.scenario.name(),
                    r.seed,
                    r.metrics.mean_charge_fraction,
                    r.metrics.depleted_robots,
                    r.metrics.max_box_displacement
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    r.scenario.name(),
                    r.seed,
                    r.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if failed == 0 {
            info!("All {} scenario runs passed", results.len());
        } else {
            error!("{}/{} scenario runs failed", failed, results.len());
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
