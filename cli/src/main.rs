use anyhow::Context;
use clap::Parser;
use dispatch_sim_core_rs::{ModuleRegistry, SimConfig, Simulation};
use log::info;
use std::fs;

// === Clap === //

#[derive(Debug, Clone, Parser)]
#[command(about = "headless runner for the dispatch simulator", long_about = None)]
struct CliArgs {
    /// JSON config; defaults are used for anything it leaves out
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<String>,

    /// Frames to simulate
    #[arg(short = 't', long = "ticks", default_value_t = 6_000)]
    ticks: u64,

    /// Override the config's RNG seed
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Print the full event log as JSON instead of a summary
    #[arg(long = "json")]
    json: bool,
}

// === Driver === //

fn load_config(args: &CliArgs) -> anyhow::Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {:?}", path))?;
            SimConfig::from_json_str(&text)
                .with_context(|| format!("invalid config file {:?}", path))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    info!(
        "running {} frame(s) of {} ms with seed {}",
        args.ticks, config.frame_ms, config.rng_seed
    );

    let mut sim = Simulation::new(config, &ModuleRegistry::builtin())
        .context("failed to start simulation")?;

    let mut task_failures = 0;
    let mut module_failures = 0;
    for _ in 0..args.ticks {
        let result = sim.tick();
        task_failures += result.task_failures;
        module_failures += result.module_failures;
    }
    let dispose_failures = sim.shutdown();

    let log = sim.event_log();
    if args.json {
        println!("{}", serde_json::to_string_pretty(log.events())?);
        return Ok(());
    }

    println!("simulated {} ms in {} frame(s)", sim.now_ms(), args.ticks);
    for event_type in [
        "IncidentGenerated",
        "UnitDispatched",
        "DispatchFailed",
        "ResolutionStarted",
        "IncidentCompleted",
        "IncidentExpired",
        "SequenceCompleted",
        "SequenceAborted",
    ] {
        println!("  {:<20} {}", event_type, log.events_of_type(event_type).len());
    }
    println!(
        "  failures: {} task(s), {} module update(s), {} dispose(s)",
        task_failures, module_failures, dispose_failures
    );
    Ok(())
}
