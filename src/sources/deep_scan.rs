//! External username scanners (sherlock, maigret) run as child processes.
//!
//! Each tool is just another adapter: it gets its own deadline, a missing
//! installation becomes a not-configured result, and dropping the probe
//! (timeout or cancellation) kills the child.

use super::{unsupported, ProbeClass, ProbeOptions, SourceAdapter};
use crate::config::DeepScanConfig;
use crate::models::{ProbeFailure, Query, ReportedProfile, SourceResult, PROFILES_KEY};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTool {
    Sherlock,
    Maigret,
}

impl ScanTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanTool::Sherlock => "sherlock",
            ScanTool::Maigret => "maigret",
        }
    }
}

pub struct DeepScanAdapter {
    tool: ScanTool,
    config: DeepScanConfig,
    /// Lowercased platform names that carry the sensitive flag
    sensitive_platforms: HashSet<String>,
}

impl DeepScanAdapter {
    pub fn new(tool: ScanTool, config: DeepScanConfig) -> Self {
        Self {
            tool,
            config,
            sensitive_platforms: HashSet::new(),
        }
    }

    /// Tag tool hits on these platforms as sensitive
    pub fn with_sensitive_platforms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sensitive_platforms = names.into_iter().map(|n| n.as_ref().to_lowercase()).collect();
        self
    }

    async fn scan(&self, username: &str, options: &ProbeOptions) -> Result<Vec<(String, String)>, ProbeFailure> {
        match self.tool {
            ScanTool::Sherlock => {
                let script = self.config.sherlock_dir.join("sherlock.py");
                if !script.is_file() {
                    return Err(ProbeFailure::NotConfigured(format!(
                        "sherlock is not installed (not configured: expected {})",
                        script.display()
                    )));
                }
                let mut cmd = Command::new(&self.config.python);
                cmd.current_dir(&self.config.sherlock_dir)
                    .arg("sherlock.py")
                    .arg(username)
                    .arg("--print-found")
                    .arg("--no-color");
                let stdout = self.run(cmd, options).await?;
                Ok(parse_sherlock_output(&stdout))
            }
            ScanTool::Maigret => {
                let workdir = tempfile::tempdir()
                    .map_err(|e| ProbeFailure::Transport(format!("failed to create scan directory: {}", e)))?;
                let mut cmd = Command::new(&self.config.maigret_bin);
                cmd.arg(username)
                    .arg("--json")
                    .arg("simple")
                    .arg("--folderoutput")
                    .arg(workdir.path())
                    .arg("--no-progressbar");
                self.run(cmd, options).await?;
                let report = read_maigret_report(workdir.path(), username)?;
                Ok(parse_maigret_report(&report))
            }
        }
    }

    async fn run(&self, mut cmd: Command, options: &ProbeOptions) -> Result<String, ProbeFailure> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProbeFailure::NotConfigured(format!(
                "{} is not installed (not configured)",
                self.tool.as_str()
            )),
            _ => ProbeFailure::Transport(format!("failed to start {}: {}", self.tool.as_str(), e)),
        })?;

        let output = tokio::time::timeout(options.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeFailure::Timeout)?
            .map_err(|e| ProbeFailure::Transport(format!("{} failed: {}", self.tool.as_str(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(ProbeFailure::Transport(format!(
                "{} exited with {}: {}",
                self.tool.as_str(),
                output.status,
                last_line.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `[+] Site: url` lines from `--print-found` output
pub fn parse_sherlock_output(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("[+]"))
        .filter_map(|rest| rest.split_once(": "))
        .map(|(site, url)| (site.trim().to_string(), url.trim().to_string()))
        .filter(|(site, url)| !site.is_empty() && url.starts_with("http"))
        .collect()
}

fn read_maigret_report(dir: &Path, username: &str) -> Result<Value, ProbeFailure> {
    let path = dir.join(format!("report_{}_simple.json", username));
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| ProbeFailure::Parse(format!("maigret report {} unreadable: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ProbeFailure::Parse(format!("maigret report is not JSON: {}", e)))
}

/// Claimed accounts from a maigret `simple` JSON report (site name -> entry)
pub fn parse_maigret_report(report: &Value) -> Vec<(String, String)> {
    let Some(sites) = report.as_object() else {
        return Vec::new();
    };
    sites
        .iter()
        .filter(|(_, entry)| {
            entry
                .pointer("/status/status")
                .and_then(Value::as_str)
                .map_or(false, |s| s.eq_ignore_ascii_case("claimed"))
        })
        .filter_map(|(site, entry)| {
            entry
                .get("url_user")
                .or_else(|| entry.pointer("/status/url"))
                .and_then(Value::as_str)
                .map(|url| (site.clone(), url.to_string()))
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for DeepScanAdapter {
    fn source_id(&self) -> &str {
        self.tool.as_str()
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::DeepScan
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Username(username) = query else {
            return unsupported(self.tool.as_str(), query);
        };

        log::info!("Running {} for '{}'", self.tool.as_str(), username);
        let hits = match self.scan(username, options).await {
            Ok(hits) => hits,
            Err(failure) => {
                log::debug!("{}: {}", self.tool.as_str(), failure);
                return SourceResult::failure(self.tool.as_str(), failure);
            }
        };

        if hits.is_empty() {
            return SourceResult::failure(
                self.tool.as_str(),
                ProbeFailure::NotFound("No accounts reported".into()),
            );
        }

        let profiles: Vec<Value> = hits
            .iter()
            .map(|(site, url)| {
                let sensitive = self.sensitive_platforms.contains(&site.to_lowercase());
                ReportedProfile {
                    sensitive,
                    category: sensitive.then(|| "adult".to_string()),
                    ..ReportedProfile::new(site.as_str(), url.as_str())
                }
                .to_value()
            })
            .collect();

        let mut data = Map::new();
        data.insert("tool".into(), Value::from(self.tool.as_str()));
        data.insert("total".into(), Value::from(profiles.len()));
        data.insert(PROFILES_KEY.into(), Value::Array(profiles));
        SourceResult::found(self.tool.as_str(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{Duration, Instant};

    /// A sherlock checkout whose `sherlock.py` is a shell script run through `sh`
    fn scripted_sherlock(script: &str) -> (tempfile::TempDir, DeepScanConfig) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sherlock.py"), script).unwrap();
        let config = DeepScanConfig {
            sherlock_dir: dir.path().to_path_buf(),
            python: "sh".into(),
            ..Default::default()
        };
        (dir, config)
    }

    fn alice() -> Query {
        Query::Username("alice123".into())
    }

    #[test]
    fn test_parse_sherlock_output() {
        let stdout = "\
[*] Checking username alice123 on:

[+] GitHub: https://www.github.com/alice123
[+] OnlyFans: https://onlyfans.com/alice123
[-] Twitter: Not Found!
[+] Broken:
[*] Search completed with 2 results
";
        let hits = parse_sherlock_output(stdout);
        assert_eq!(
            hits,
            vec![
                ("GitHub".to_string(), "https://www.github.com/alice123".to_string()),
                ("OnlyFans".to_string(), "https://onlyfans.com/alice123".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_maigret_report() {
        let report = json!({
            "GitHub": {"url_user": "https://github.com/alice123", "status": {"status": "Claimed"}},
            "Reddit": {"url_user": "https://reddit.com/user/alice123", "status": {"status": "Available"}},
            "Odd": {"status": {"status": "Claimed", "url": "https://odd.example/alice123"}},
            "Empty": {"status": {"status": "Claimed"}}
        });
        let mut hits = parse_maigret_report(&report);
        hits.sort();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "GitHub");
        assert_eq!(hits[1].1, "https://odd.example/alice123");
        assert!(parse_maigret_report(&json!([1, 2])).is_empty());
    }

    #[tokio::test]
    async fn test_missing_sherlock_checkout_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeepScanConfig {
            sherlock_dir: dir.path().join("absent"),
            ..Default::default()
        };
        let adapter = DeepScanAdapter::new(ScanTool::Sherlock, config);
        let result = adapter
            .probe(&Query::Username("alice123".into()), &ProbeOptions::default())
            .await;
        assert!(!result.found);
        assert_eq!(result.source, "sherlock");
        assert!(result.str_field("error").unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_missing_maigret_binary_is_not_configured() {
        let config = DeepScanConfig {
            maigret_bin: "definitely-not-a-real-maigret-binary".into(),
            ..Default::default()
        };
        let adapter = DeepScanAdapter::new(ScanTool::Maigret, config);
        assert_eq!(adapter.class(), ProbeClass::DeepScan);
        let result = adapter
            .probe(&Query::Username("alice123".into()), &ProbeOptions::default())
            .await;
        assert_eq!(result.failure_kind(), Some("not_configured"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sherlock_hits_inherit_sensitive_tag() {
        let (_checkout, config) = scripted_sherlock(
            "echo '[*] Checking username alice123 on:'\n\
             echo '[+] Velvet: https://velvet.test/alice123'\n\
             echo '[+] Alpha: https://alpha.test/alice123'\n",
        );
        let adapter = DeepScanAdapter::new(ScanTool::Sherlock, config).with_sensitive_platforms(["velvet"]);

        let result = adapter.probe(&alice(), &ProbeOptions::default()).await;

        assert!(result.found, "{:?}", result.data);
        assert_eq!(result.u64_field("total"), Some(2));
        let profiles = result.reported_profiles();
        assert_eq!(profiles[0].platform, "Velvet");
        assert!(profiles[0].sensitive);
        assert_eq!(profiles[0].category.as_deref(), Some("adult"));
        assert!(!profiles[1].sensitive);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_scanner_is_killed_at_deadline() {
        let (_checkout, config) = scripted_sherlock("sleep 30\n");
        let adapter = DeepScanAdapter::new(ScanTool::Sherlock, config);
        let options = ProbeOptions {
            timeout: Duration::from_millis(200),
        };

        let started = Instant::now();
        let result = adapter.probe(&alice(), &options).await;

        assert!(!result.found);
        assert_eq!(result.failure_kind(), Some("timeout"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_scanner_reports_last_stderr_line() {
        let (_checkout, config) = scripted_sherlock("echo 'rate limited' >&2\nexit 3\n");
        let adapter = DeepScanAdapter::new(ScanTool::Sherlock, config);
        let result = adapter.probe(&alice(), &ProbeOptions::default()).await;
        assert_eq!(result.failure_kind(), Some("transport_error"));
        assert!(result.str_field("error").unwrap().contains("rate limited"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_maigret_report_is_read_from_output_folder() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("maigret");
        // argv: <username> --json simple --folderoutput <dir> --no-progressbar
        let script = r#"#!/bin/sh
cat > "$5/report_$1_simple.json" <<'REPORT'
{
  "Velvet": {"url_user": "https://velvet.test/alice123", "status": {"status": "Claimed"}},
  "Alpha": {"url_user": "https://alpha.test/alice123", "status": {"status": "Available"}}
}
REPORT
"#;
        std::fs::write(&bin, script).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = DeepScanConfig {
            maigret_bin: bin.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let adapter = DeepScanAdapter::new(ScanTool::Maigret, config).with_sensitive_platforms(["Velvet"]);

        let result = adapter.probe(&alice(), &ProbeOptions::default()).await;

        assert!(result.found, "{:?}", result.data);
        let profiles = result.reported_profiles();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].url.as_deref(), Some("https://velvet.test/alice123"));
        assert!(profiles[0].sensitive);
    }
}
