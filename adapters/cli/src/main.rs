#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Bastion simulation headlessly.

mod config;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bastion_core::SimulationConfig;
use bastion_simulation::Simulation;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bastion", version, about = "Run the Bastion simulation headlessly")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate.
    #[arg(short, long, default_value_t = 1_200)]
    ticks: u64,

    /// Overrides the spawning seed.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Answer range queries by linear scan instead of the spatial indices.
    #[arg(long)]
    linear_scan: bool,
}

/// Entry point for the Bastion command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.spawning.seed = seed;
    }
    if cli.linear_scan {
        config.spatial.indexed = false;
    }

    let mut simulation = Simulation::new(config).context("failed to start simulation")?;
    let summary = scenario::run(&mut simulation, cli.ticks);

    log::info!("spatial: {:?}", simulation.spatial_stats());
    log::info!("fog: {:?}", simulation.fog_stats());
    println!("ticks simulated      {}", summary.ticks);
    println!("monsters spawned     {}", summary.monsters_spawned);
    println!("monsters killed      {}", summary.monsters_killed);
    println!("monsters remaining   {}", simulation.monsters().len());
    println!("shots fired          {}", summary.shots_fired);
    println!("hits                 {}", summary.hits);
    println!("structures struck    {}", summary.structures_struck);
    println!("structures destroyed {}", summary.structures_destroyed);
    println!("disconnections       {}", summary.disconnections);
    println!("reconnections        {}", summary.reconnections);
    println!("fingerprint          {:#018x}", simulation.fingerprint());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from(["bastion", "--ticks", "50", "--seed", "9", "--linear-scan"])
            .expect("flags parse");
        assert_eq!(cli.ticks, 50);
        assert_eq!(cli.seed, Some(9));
        assert!(cli.linear_scan);
        assert!(cli.config.is_none());
    }
}
