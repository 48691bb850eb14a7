//! Tempo Simulator CLI
//!
//! Run facade scenarios against one or all registered schedulers.

use clap::Parser;
use std::path::PathBuf;
use tempo_core::log_hooks::SimTimer;
use tempo_core::metrics::DesMetrics;
use tempo_core::registry;
use tempo_sim::{load_config, select_schedulers, ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Tempo discrete-event simulator scenario CLI
#[derive(Parser, Debug)]
#[command(name = "tempo-sim")]
#[command(about = "Run end-to-end scenarios against the Tempo simulator facade", long_about = None)]
struct Args {
    /// Seed for the random workload (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (ordering, fifo_ties, cancel, stop_at, destroy,
    /// context_propagation, injection, restart, random_load, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Scheduler registry name, or `all` for every registered scheduler
    /// (default: the configured SchedulerType)
    #[arg(long)]
    scheduler: Option<String>,

    /// Workload size for the bulk scenarios
    #[arg(short, long, default_value = "1000")]
    events: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// JSON file with global values (SimulatorImplementationType, SchedulerType)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the scheduling trace to this JSON file
    #[arg(long)]
    metrics: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Log lines carry virtual time and context once a kernel exists.
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_timer(SimTimer)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    if !args.json {
        info!("Tempo Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    if let Some(path) = &args.config {
        match load_config(path) {
            Ok(config) => info!(
                "Loaded {}: kernel={} scheduler={}",
                path.display(),
                config.simulator_implementation_type,
                config.scheduler_type
            ),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<_> = ScenarioId::all().iter().map(|s| s.name()).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(1);
        })]
    };

    // Parse schedulers
    let schedulers: Vec<String> = select_schedulers(args.scheduler.as_deref()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("Available schedulers: {}, all", registry::scheduler_names().join(", "));
        std::process::exit(1);
    });

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    DesMetrics::get().initialize("tempo-sim");

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for scheduler in &schedulers {
        let runner = ScenarioRunner::new(seed)
            .with_scheduler(scheduler.as_str())
            .with_event_count(args.events);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} [{}] (seed={}) PASSED", scenario.name(), scheduler, seed);
                } else {
                    error!(
                        "✗ {} [{}] (seed={}) FAILED: {}",
                        scenario.name(),
                        scheduler,
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    if let Some(path) = &args.metrics {
        match DesMetrics::get().write_to_file(path) {
            Ok(()) => info!("Wrote {} trace records to {}", DesMetrics::get().report().trace_count, path),
            Err(e) => error!("Failed to write metrics: {:?}", e),
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "scheduler": r.scheduler,
                    "seed": r.seed,
                    "passed": r.passed,
                    "events_executed": r.events_executed,
                    "final_time": r.final_time,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} [{}] seed={}: {}",
                        result.scenario.name(),
                        result.scheduler,
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
