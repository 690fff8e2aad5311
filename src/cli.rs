use crate::config::{Credentials, DeepScanConfig, DispatchConfig, SearchConfig};
use crate::config::{LEAKCHECK_ENV, NUMVERIFY_ENV, PDL_ENV, VERIPHONE_ENV};
use crate::errors::{FootprintError, FootprintResult};
use crate::models::{Query, QueryType};
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

const PHONE_PATTERN: &str = r"^[\+\d\s\-\(\)]+$";
const MIN_DETECTED_PHONE_DIGITS: usize = 10;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "footprint",
    about = "Footprint - digital exposure analysis for emails, usernames, phone numbers and names",
    version
)]
pub struct Args {
    /// Email, username, phone number or "First Last" to analyze
    pub query: String,

    /// Query type (detected from the input when omitted)
    #[arg(short = 't', long = "type")]
    pub query_type: Option<QueryKind>,

    /// Two-letter state for name searches (enables people-data lookup)
    #[arg(long)]
    pub state: Option<String>,

    /// Two-letter country code for national-format phone numbers
    #[arg(long)]
    pub region: Option<String>,

    /// Also run the external username scanners (sherlock, maigret)
    #[arg(short, long)]
    pub deep: bool,

    /// Print the profile as JSON instead of the console summary
    #[arg(long)]
    pub json: bool,

    /// Write the profile as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Platform catalog JSON file (built-in catalog when omitted)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Maximum probes in flight at once
    #[arg(short, long, default_value = "24")]
    pub concurrency: usize,

    /// Per-probe deadline for platform presence checks, in seconds
    #[arg(long, default_value = "8")]
    pub presence_timeout: u64,

    /// Per-probe deadline for API sources, in seconds
    #[arg(long, default_value = "15")]
    pub api_timeout: u64,

    /// Per-probe deadline for external scanners, in seconds
    #[arg(long, default_value = "180")]
    pub deep_timeout: u64,

    /// Directory containing sherlock.py
    #[arg(long, default_value = "osint_tools/sherlock")]
    pub sherlock_dir: PathBuf,

    /// Python interpreter used to run sherlock
    #[arg(long, default_value = "python3")]
    pub python: String,

    /// maigret executable
    #[arg(long, default_value = "maigret")]
    pub maigret: String,

    /// Maximum profiles listed per summary
    #[arg(long, default_value = "20")]
    pub display_limit: usize,

    /// Enable verbose logging of all operations
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide progress bars and use quiet output
    #[arg(short, long)]
    pub quiet: bool,

    #[arg(long, env = LEAKCHECK_ENV, hide = true, hide_env_values = true)]
    pub leakcheck_key: Option<String>,

    #[arg(long, env = NUMVERIFY_ENV, hide = true, hide_env_values = true)]
    pub numverify_key: Option<String>,

    #[arg(long, env = VERIPHONE_ENV, hide = true, hide_env_values = true)]
    pub veriphone_key: Option<String>,

    #[arg(long, env = PDL_ENV, hide = true, hide_env_values = true)]
    pub pdl_key: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum QueryKind {
    /// Breach lookup plus the username derived from the local part
    Email,
    /// Platform presence across the catalog
    Username,
    /// Number validation and line classification
    Phone,
    /// Court records and people data ("First Last")
    Name,
}

impl From<QueryKind> for QueryType {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Email => QueryType::Email,
            QueryKind::Username => QueryType::Username,
            QueryKind::Phone => QueryType::Phone,
            QueryKind::Name => QueryType::Name,
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", QueryType::from(*self))
    }
}

/// Guess the query type from raw input.
///
/// Phone-shaped input with at least ten digits is a phone number; anything
/// with '@' is an email; anything with a space is a name.
pub fn detect_query_type(input: &str) -> QueryType {
    let input = input.trim();
    let digits = input.chars().filter(|c| c.is_ascii_digit()).count();
    let phone_shaped = Regex::new(PHONE_PATTERN)
        .map(|re| re.is_match(input))
        .unwrap_or(false);

    if phone_shaped && digits >= MIN_DETECTED_PHONE_DIGITS {
        QueryType::Phone
    } else if input.contains('@') {
        QueryType::Email
    } else if input.contains(char::is_whitespace) {
        QueryType::Name
    } else {
        QueryType::Username
    }
}

impl Args {
    pub fn resolved_type(&self) -> QueryType {
        self.query_type
            .map(QueryType::from)
            .unwrap_or_else(|| detect_query_type(&self.query))
    }

    /// Validate the positional input as the resolved query type
    pub fn to_query(&self) -> FootprintResult<Query> {
        match self.resolved_type() {
            QueryType::Email => Query::email(&self.query),
            QueryType::Username => Query::username(&self.query),
            QueryType::Phone => Query::phone(&self.query, self.region.as_deref()),
            QueryType::Name => {
                let (first, last) = self
                    .query
                    .trim()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| {
                        FootprintError::invalid_query("name", self.query.trim(), "expected 'First Last'")
                    })?;
                Query::name(first, last, self.state.as_deref())
            }
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            leakcheck: self.leakcheck_key.clone(),
            numverify: self.numverify_key.clone(),
            veriphone: self.veriphone_key.clone(),
            people_data_labs: self.pdl_key.clone(),
        }
        .normalized()
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            credentials: self.credentials(),
            dispatch: DispatchConfig {
                max_concurrency: self.concurrency.max(1),
                presence_timeout: Duration::from_secs(self.presence_timeout.max(1)),
                api_timeout: Duration::from_secs(self.api_timeout.max(1)),
                deep_scan_timeout: Duration::from_secs(self.deep_timeout.max(1)),
            },
            deep_scan: DeepScanConfig {
                sherlock_dir: self.sherlock_dir.clone(),
                python: self.python.clone(),
                maigret_bin: self.maigret.clone(),
            },
            display_limit: self.display_limit,
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
