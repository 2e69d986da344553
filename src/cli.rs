//! Command-line interface definitions for the relay service.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Operational knobs (paths, bind address, cycle interval, sweep policy) live
//! here; credentials stay in the environment (see [`crate::config`]).

use clap::Parser;

/// Command-line arguments for the relay service.
///
/// # Examples
///
/// ```sh
/// # Hourly full-sweep cycles with the default trigger endpoint
/// news_relay -t ./target_sites.txt -p ./promos.txt
///
/// # Early-stop cycles every 15 minutes, no liveness probe
/// news_relay -t ./target_sites.txt --interval-secs 900 --early-stop --no-probe
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the line-oriented target-site list
    #[arg(short, long, default_value = "target_sites.txt")]
    pub target_sites: String,

    /// Path to the line-oriented promotional-fragment list
    #[arg(short, long, default_value = "promos.txt")]
    pub promos: String,

    /// Address for the trigger/liveness HTTP surface
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:10000")]
    pub bind_addr: String,

    /// Seconds between automatic cycles
    #[arg(long, env = "CYCLE_INTERVAL_SECS", default_value_t = 3600)]
    pub interval_secs: u64,

    /// Stop a cycle after the first newly published item
    #[arg(long)]
    pub early_stop: bool,

    /// Skip the HEAD liveness probe before extraction
    #[arg(long)]
    pub no_probe: bool,
}
