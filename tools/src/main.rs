//! churn-runner: headless churn detection evaluation.
//!
//! Usage:
//!   churn-runner --seed 12345 --customers 10000
//!   churn-runner --config experiment.json --db run.db
//!   churn-runner --json

use anyhow::Result;
use churnsim_core::{
    config::SimConfig,
    engine::{ChurnEvaluationHarness, ConfusionStatus, RunSummary},
    store::SimStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default_test(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.population.number_of_customers =
        parse_arg(&args, "--customers", config.population.number_of_customers);
    let db = flag_value(&args, "--db");
    let json = args.iter().any(|a| a == "--json");

    let harness = ChurnEvaluationHarness::new(config)?;
    let config = harness.config();

    if !json {
        println!("churn-runner");
        println!("  seed:      {}", config.seed);
        println!("  customers: {}", config.population.number_of_customers);
        println!("  cleaning:  {:?}", config.cleaning.mode);
        println!("  threshold: {:.1}", config.detector.resolved_threshold());
        println!("  db:        {}", db.unwrap_or("(none)"));
        println!();
    }

    let run = harness.run()?;

    if let Some(path) = db {
        let store = SimStore::open(path)?;
        store.migrate()?;
        store.save_run(&run, config, env!("CARGO_PKG_VERSION"))?;
        log::info!("exported run {} to {path}", run.summary.run_id);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&run.summary.counts)?);
    } else {
        print_summary(&run.summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let counts = &summary.counts;
    println!("=== RUN SUMMARY ===");
    println!("  run_id:    {}", summary.run_id);
    println!("  evaluated: {}", counts.evaluated());
    println!("  failures:  {}", summary.failures.len());
    println!();
    println!("=== CONFUSION MATRIX ===");
    for status in ConfusionStatus::ALL {
        println!(
            "  {:<15} {:>7}  ({:.1}%)",
            status.as_str(),
            counts.count(status),
            counts.rate(status) * 100.0
        );
    }
    match summary.mean_abs_error_weeks {
        Some(err) => println!("  mean |error|: {err:.1} weeks"),
        None => println!("  mean |error|: n/a"),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
