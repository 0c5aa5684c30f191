pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use autodisco_common::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_HOSTS, DEFAULT_PROBE_CONCURRENCY, DEFAULT_RESOLVE_CONCURRENCY,
    DEFAULT_SIMULATE_SAMPLE, ScanConfig,
};
use autodisco_common::network::target::DEFAULT_COMMUNITY;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autodisco")]
#[command(about = "Network auto-discovery: sweep subnets and walk Cisco switches into an inventory.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// JSON inventory loaded before the scan and written back after it
    #[arg(long, global = true, value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// Concurrent reachability probes
    #[arg(long, global = true, default_value_t = DEFAULT_PROBE_CONCURRENCY)]
    pub probe_concurrency: usize,

    /// Concurrent reverse DNS lookups
    #[arg(long, global = true, default_value_t = DEFAULT_RESOLVE_CONCURRENCY)]
    pub resolve_concurrency: usize,

    /// Live hosts reconciled per batch
    #[arg(long, global = true, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Probe and SNMP request timeout in milliseconds
    #[arg(long, global = true, default_value_t = 1000, value_name = "MS")]
    pub timeout: u64,

    /// SNMP retries per request
    #[arg(long, global = true, default_value_t = 1)]
    pub snmp_retries: u32,

    /// SNMP agent port
    #[arg(long, global = true, default_value_t = 161)]
    pub snmp_port: u16,

    /// Addresses picked in simulate mode
    #[arg(long, global = true, default_value_t = DEFAULT_SIMULATE_SAMPLE)]
    pub sample: usize,

    /// Seed for reproducible simulate runs
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Refuse networks with more usable hosts than this
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_HOSTS)]
    pub max_hosts: u128,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep every host of a CIDR block
    #[command(alias = "r")]
    Range {
        cidr: String,
        /// Pick a few addresses at random instead of probing
        #[arg(long)]
        simulate: bool,
    },
    /// Walk a Cisco switch over SNMP
    #[command(alias = "c")]
    Cisco {
        host: String,
        /// SNMP read community
        #[arg(long, default_value = DEFAULT_COMMUNITY)]
        community: String,
        /// Build a canned topology instead of querying the switch
        #[arg(long)]
        simulate: bool,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> ScanConfig {
        let timeout = Duration::from_millis(self.timeout);
        ScanConfig {
            probe_concurrency: self.probe_concurrency,
            resolve_concurrency: self.resolve_concurrency,
            batch_size: self.batch_size,
            probe_timeout: timeout,
            snmp_timeout: timeout,
            snmp_retries: self.snmp_retries,
            snmp_port: self.snmp_port,
            simulate_sample: self.sample,
            simulate_seed: self.seed,
            max_hosts: self.max_hosts,
        }
    }
}
