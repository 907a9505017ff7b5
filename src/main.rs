//! market-plan: prints the build order of a market setup without building it.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use todays_market_core::config::{BuildParameters, ConfigurationSource, MarketSetup};
use todays_market_core::graph::{plan, PlanStep};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "market-plan")]
#[command(version, about = "Show the order in which a market setup builds its objects", long_about = None)]
struct Cli {
    /// Path to the TOML market setup
    #[arg(short, long, value_name = "FILE")]
    setup: PathBuf,

    /// Configuration to plan (defaults to every declared configuration)
    #[arg(short, long)]
    configuration: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct PlanReport {
    asof: Option<NaiveDate>,
    build: BuildParameters,
    plans: BTreeMap<String, Vec<PlanStep>>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let setup = MarketSetup::from_file(&cli.setup)
        .with_context(|| format!("loading setup {}", cli.setup.display()))?;
    setup.logging.init();

    let configurations = match cli.configuration {
        Some(c) => vec![c],
        None => setup.parameters.configurations(),
    };
    info!(
        setup = %cli.setup.display(),
        asof = ?setup.asof,
        configurations = configurations.len(),
        lazy = setup.build.lazy_build,
        "planning"
    );

    let mut plans = Vec::with_capacity(configurations.len());
    for configuration in configurations {
        let nodes = plan(&setup.parameters, &setup.curve_configs, &configuration).map_err(|e| {
            error!(error = %e, "planning failed");
            e
        })?;
        let steps: Vec<PlanStep> = nodes.iter().map(PlanStep::from).collect();
        plans.push((configuration, steps));
    }

    if cli.json {
        let report = PlanReport { asof: setup.asof, build: setup.build, plans: plans.into_iter().collect() };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match setup.asof {
        Some(asof) => println!("as of {}", asof),
        None => println!("as of <unset>"),
    }
    let b = setup.build;
    println!(
        "build: {}, {}, quotes {}, fixings {}",
        if b.lazy_build { "lazy" } else { "eager" },
        if b.continue_on_error { "continue on error" } else { "stop on first error" },
        if b.preserve_quote_linkage { "live" } else { "frozen" },
        if b.load_fixings { "loaded" } else { "skipped" },
    );
    for (configuration, steps) in plans {
        println!("[{}]", configuration);
        for (i, step) in steps.iter().enumerate() {
            println!("{:>4}  {}({}) = {}", i + 1, step.kind, step.name, step.mapping);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_carries_asof_and_build_flags() {
        let setup = MarketSetup::from_toml_str("asof = \"2024-03-28\"\n[build]\nlazy_build = true").unwrap();
        let report = PlanReport { asof: setup.asof, build: setup.build, plans: BTreeMap::new() };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["asof"], "2024-03-28");
        assert_eq!(json["build"]["lazy_build"], true);
        assert_eq!(json["build"]["load_fixings"], true);
    }
}
