use planet_gravity::{logging, Scenario, ScenarioConfig};
use planet_gravity::{bench_apply_gravitation, bench_nearest_triangle};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Headless driver for multi-source planet gravity scenarios")]
struct Args {
    /// Scenario file; relative names are also looked up under `scenarios/`
    #[arg(short, long = "file", default_value = "test_file.yaml")]
    file_name: String,

    /// Print debug logs (field changes, tier switches, index builds)
    #[arg(short, long)]
    verbose: bool,

    /// Run the benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// keep path lookup out of main
fn resolve_scenario_path(file_name: &str) -> PathBuf {
    let direct = PathBuf::from(file_name);
    if direct.is_absolute() || direct.exists() {
        return direct;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    if args.bench {
        bench_nearest_triangle();
        bench_apply_gravitation();
        return Ok(());
    }

    let config_path = resolve_scenario_path(&args.file_name);
    let scenario_cfg = ScenarioConfig::load(&config_path)
        .with_context(|| format!("failed to load scenario {}", config_path.display()))?;

    let mut scenario = Scenario::build(scenario_cfg).context("invalid scenario")?;
    info!("running {} until t = {}", config_path.display(), scenario.parameters.t_end);
    scenario.run();

    Ok(())
}
