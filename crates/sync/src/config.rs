#![forbid(unsafe_code)]

use std::ops::RangeInclusive;

pub const DEFAULT_LOAD_PAGE_SIZE: usize = 100;
pub const DEFAULT_TEMP_ID_PREFIX: &str = "temp-";
pub const DEFAULT_FAILURE_RATE: f64 = 0.08;

const ENV_LOAD_PAGE_SIZE: &str = "TALENTFLOW_LOAD_PAGE_SIZE";
const ENV_SIM_LATENCY_MS: &str = "TALENTFLOW_SIM_LATENCY_MS";
const ENV_SIM_FAILURE_RATE: &str = "TALENTFLOW_SIM_FAILURE_RATE";
const ENV_SIM_SEED: &str = "TALENTFLOW_SIM_SEED";
const ENV_SIM_FAIL_READS: &str = "TALENTFLOW_SIM_FAIL_READS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Items requested by a bulk load (one page).
    pub load_page_size: usize,
    pub temp_id_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            load_page_size: DEFAULT_LOAD_PAGE_SIZE,
            temp_id_prefix: DEFAULT_TEMP_ID_PREFIX.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(size) = lookup(ENV_LOAD_PAGE_SIZE)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
        {
            config.load_page_size = size;
        }
        config
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    /// Probability in `[0, 1]` that a mutating call is rejected.
    pub failure_rate: f64,
    pub fail_reads: bool,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 0,
            latency_max_ms: 0,
            failure_rate: DEFAULT_FAILURE_RATE,
            fail_reads: false,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Zero latency, never fails.
    pub fn reliable() -> Self {
        Self {
            failure_rate: 0.0,
            ..Self::default()
        }
    }

    /// Zero latency, every mutating call fails.
    pub fn always_failing() -> Self {
        Self {
            failure_rate: 1.0,
            ..Self::default()
        }
    }

    pub fn latency_range(&self) -> RangeInclusive<u64> {
        let low = self.latency_min_ms.min(self.latency_max_ms);
        let high = self.latency_min_ms.max(self.latency_max_ms);
        low..=high
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some((min, max)) = lookup(ENV_SIM_LATENCY_MS).and_then(|raw| parse_latency(&raw)) {
            config.latency_min_ms = min;
            config.latency_max_ms = max;
        }
        if let Some(rate) = lookup(ENV_SIM_FAILURE_RATE)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|rate| (0.0..=1.0).contains(rate))
        {
            config.failure_rate = rate;
        }
        if let Some(seed) = lookup(ENV_SIM_SEED).and_then(|raw| raw.trim().parse::<u64>().ok()) {
            config.seed = Some(seed);
        }
        if let Some(fail_reads) = lookup(ENV_SIM_FAIL_READS).and_then(|raw| parse_flag(&raw)) {
            config.fail_reads = fail_reads;
        }
        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accepts `"250"` or `"200..1200"`.
fn parse_latency(raw: &str) -> Option<(u64, u64)> {
    let raw = raw.trim();
    match raw.split_once("..") {
        Some((min, max)) => {
            let min = min.trim().parse::<u64>().ok()?;
            let max = max.trim().parse::<u64>().ok()?;
            (min <= max).then_some((min, max))
        }
        None => raw.parse::<u64>().ok().map(|ms| (ms, ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn sim_config_reads_env_values() {
        let config = SimConfig::from_lookup(lookup(&[
            (ENV_SIM_LATENCY_MS, "200..1200"),
            (ENV_SIM_FAILURE_RATE, "0.5"),
            (ENV_SIM_SEED, "42"),
            (ENV_SIM_FAIL_READS, " TRUE "),
        ]));
        assert_eq!(config.latency_range(), 200..=1200);
        assert_eq!(config.failure_rate, 0.5);
        assert_eq!(config.seed, Some(42));
        assert!(config.fail_reads);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = SimConfig::from_lookup(lookup(&[
            (ENV_SIM_LATENCY_MS, "900..100"),
            (ENV_SIM_FAILURE_RATE, "1.5"),
            (ENV_SIM_SEED, "nope"),
            (ENV_SIM_FAIL_READS, "maybe"),
        ]));
        assert_eq!(config, SimConfig::default());

        let sync = SyncConfig::from_lookup(lookup(&[(ENV_LOAD_PAGE_SIZE, "0")]));
        assert_eq!(sync, SyncConfig::default());
        let sync = SyncConfig::from_lookup(lookup(&[(ENV_LOAD_PAGE_SIZE, " 25 ")]));
        assert_eq!(sync.load_page_size, 25);
    }

    #[test]
    fn single_latency_value_is_fixed() {
        assert_eq!(parse_latency("300"), Some((300, 300)));
        assert_eq!(parse_latency("a..b"), None);
    }
}
