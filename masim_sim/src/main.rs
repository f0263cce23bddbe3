//! masim scenario CLI
//!
//! Run self-checking multi-agent consensus scenarios against the engine.

use clap::Parser;
use masim_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Multi-agent simulation scenario runner
#[derive(Parser, Debug)]
#[command(name = "masim")]
#[command(about = "Run networked multi-agent simulation scenarios", long_about = None)]
struct Args {
    /// Master seed for scenario randomness
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (single_integrator, damped_lti, faulty_agent, random_ring, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Simulation horizon in seconds
    #[arg(short, long, default_value = "15")]
    duration: f64,

    /// Control update step size in seconds
    #[arg(long, default_value = "0.05")]
    step: f64,

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
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e: String| {
            eprintln!("Error: {}", e);
            eprintln!(
                "Available scenarios: single_integrator, damped_lti, faulty_agent, random_ring, all"
            );
            std::process::exit(1);
        })]
    };

    let runner = ScenarioRunner::new(args.seed)
        .with_duration(args.duration)
        .with_step_size(args.step);

    let mut results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for scenario in &scenarios {
        let result = runner.run(*scenario);

        if !args.json {
            if result.passed {
                info!("✓ {} (seed={}) PASSED", scenario.name(), args.seed);
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario.name(),
                    args.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }

        results.push(result);
    }

    // Summary
    let total = results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
    } else if failed_count == 0 {
        info!("All {} scenario runs passed", total);
    } else {
        error!("{}/{} scenario runs failed", failed_count, total);
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
