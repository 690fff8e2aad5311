//! Search configuration: API credentials, dispatch limits and deep-scan tooling.

use std::path::PathBuf;
use std::time::Duration;

pub const LEAKCHECK_ENV: &str = "LEAKCHECK_API_KEY";
pub const NUMVERIFY_ENV: &str = "NUMVERIFY_API_KEY";
pub const VERIPHONE_ENV: &str = "VERIPHONE_API_KEY";
pub const PDL_ENV: &str = "PDL_API_KEY";

/// One optional key per paid API. Absent keys degrade the matching adapter
/// to a not-configured result.
#[derive(Clone, Default)]
pub struct Credentials {
    pub leakcheck: Option<String>,
    pub numverify: Option<String>,
    pub veriphone: Option<String>,
    pub people_data_labs: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            leakcheck: read_env(LEAKCHECK_ENV),
            numverify: read_env(NUMVERIFY_ENV),
            veriphone: read_env(VERIPHONE_ENV),
            people_data_labs: read_env(PDL_ENV),
        }
    }

    /// Drop empty strings so `KEY=` behaves like an unset key
    pub fn normalized(self) -> Self {
        Self {
            leakcheck: non_empty(self.leakcheck),
            numverify: non_empty(self.numverify),
            veriphone: non_empty(self.veriphone),
            people_data_labs: non_empty(self.people_data_labs),
        }
    }

    pub fn configured_services(&self) -> Vec<&'static str> {
        let mut services = Vec::new();
        if self.leakcheck.is_some() {
            services.push("leakcheck");
        }
        if self.numverify.is_some() {
            services.push("numverify");
        }
        if self.veriphone.is_some() {
            services.push("veriphone");
        }
        if self.people_data_labs.is_some() {
            services.push("people_data_labs");
        }
        services
    }
}

// Keys must never reach the logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("configured", &self.configured_services())
            .finish()
    }
}

fn read_env(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Bounded fan-out and per-class deadlines
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub max_concurrency: usize,
    pub presence_timeout: Duration,
    pub api_timeout: Duration,
    pub deep_scan_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 24,
            presence_timeout: Duration::from_secs(8),
            api_timeout: Duration::from_secs(15),
            deep_scan_timeout: Duration::from_secs(180),
        }
    }
}

/// Locations of the optional external username scanners
#[derive(Debug, Clone)]
pub struct DeepScanConfig {
    /// Checkout containing `sherlock.py`
    pub sherlock_dir: PathBuf,
    pub python: String,
    pub maigret_bin: String,
}

impl Default for DeepScanConfig {
    fn default() -> Self {
        Self {
            sherlock_dir: PathBuf::from("osint_tools").join("sherlock"),
            python: "python3".to_string(),
            maigret_bin: "maigret".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub credentials: Credentials,
    pub dispatch: DispatchConfig,
    pub deep_scan: DeepScanConfig,
    /// Cap on profiles listed in a summary; counts are never capped
    pub display_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            dispatch: DispatchConfig::default(),
            deep_scan: DeepScanConfig::default(),
            display_limit: 20,
        }
    }
}
