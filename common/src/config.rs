use std::time::Duration;

pub const DEFAULT_PROBE_CONCURRENCY: usize = 64;
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 16;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_SIMULATE_SAMPLE: usize = 5;
pub const DEFAULT_MAX_HOSTS: u128 = 65_536;

/// Tunables for a single scan invocation.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Upper bound on reachability probes in flight.
    pub probe_concurrency: usize,
    /// Upper bound on reverse lookups in flight.
    pub resolve_concurrency: usize,
    /// Alive hosts collected before a resolve + reconcile pass.
    pub batch_size: usize,
    pub probe_timeout: Duration,
    pub snmp_timeout: Duration,
    /// Extra attempts after the first SNMP request times out.
    pub snmp_retries: u32,
    pub snmp_port: u16,
    /// Addresses picked per simulated range scan.
    pub simulate_sample: usize,
    /// Fixes the simulated sample, otherwise it is drawn from OS entropy.
    pub simulate_seed: Option<u64>,
    /// Networks with more usable hosts than this are refused up front.
    pub max_hosts: u128,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            probe_timeout: Duration::from_secs(1),
            snmp_timeout: Duration::from_secs(1),
            snmp_retries: 1,
            snmp_port: 161,
            simulate_sample: DEFAULT_SIMULATE_SAMPLE,
            simulate_seed: None,
            max_hosts: DEFAULT_MAX_HOSTS,
        }
    }
}
