use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridnav_app::{AppConfig, Assets, build_environment, run};
use gridnav_core::StartPose;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "gridnav",
    version,
    about = "Drive the gridnav navigation environment with its reactive policy"
)]
struct Cli {
    /// JSON file with `nav` and `codec` sections; absent fields take defaults.
    #[arg(long, env = "GRIDNAV_CONFIG")]
    config: Option<PathBuf>,

    /// Tab-delimited world map to load instead of the default walled world.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Pattern table JSON to load instead of generated patterns.
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Write the world map in use to this path before running.
    #[arg(long)]
    save_map: Option<PathBuf>,

    /// Write the pattern table in use to this path before running.
    #[arg(long)]
    save_patterns: Option<PathBuf>,

    /// Stop after this many ticks even if the run has not ended.
    #[arg(long)]
    ticks: Option<u64>,

    /// Epochs per run (overrides the config's epoch limit).
    #[arg(long)]
    epochs: Option<u64>,

    /// Ticks per epoch (overrides the config's trial limit).
    #[arg(long)]
    trial_length: Option<u64>,

    /// RNG seed for a reproducible run.
    #[arg(long, env = "GRIDNAV_SEED")]
    seed: Option<u64>,

    /// Side length of the default square world.
    #[arg(long)]
    world_size: Option<u32>,

    /// Initial agent placement.
    #[arg(long, value_enum)]
    start: Option<StartArg>,

    /// Print the final world with the agent marked.
    #[arg(long)]
    render: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StartArg {
    Center,
    Random,
}

impl From<StartArg> for StartPose {
    fn from(arg: StartArg) -> Self {
        match arg {
            StartArg::Center => Self::Center,
            StartArg::Random => Self::Random,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let assets = Assets {
        map: cli.map.as_deref(),
        patterns: cli.patterns.as_deref(),
    };
    let mut env = build_environment(&config, assets)?;
    info!(
        width = env.world().width(),
        height = env.world().height(),
        codec = env.codec().kind(),
        "environment ready"
    );

    if let Some(path) = &cli.save_map {
        gridnav_storage::save_map(path, env.world())
            .with_context(|| format!("failed to save map {}", path.display()))?;
    }
    if let Some(path) = &cli.save_patterns {
        gridnav_storage::save_patterns(path, env.patterns())
            .with_context(|| format!("failed to save patterns {}", path.display()))?;
    }

    let summary = run(&mut env, cli.ticks);
    if cli.render {
        println!("{}", env.world().render_ascii(Some(env.pose().pos_i)));
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to encode run summary")?
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let nav = &mut config.nav;
    if let Some(epochs) = cli.epochs {
        nav.limits.epoch_max = Some(epochs);
    }
    if let Some(length) = cli.trial_length {
        nav.limits.trial_max = Some(length);
    }
    if cli.seed.is_some() {
        nav.rng_seed = cli.seed;
    }
    if let Some(size) = cli.world_size {
        nav.world_width = size;
        nav.world_height = size;
    }
    if let Some(start) = cli.start {
        nav.start = start.into();
    }
    config.bound_run(cli.ticks);
    Ok(config)
}
