//! Terminal progress for a running search.
//!
//! The dispatcher emits `ProbeEvent`s on an mpsc channel; `ProbeProgress`
//! drains them and drives two `indicatif` bars. The channel is best-effort:
//! the dispatcher uses `try_send`, so a slow terminal never slows probing.

use console::{style, Term};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ProbeEvent {
    BatchStarted { total: usize },
    ProbeStarted { source: String },
    ProbeFinished {
        source: String,
        found: bool,
        /// Failure discriminant when the probe did not succeed
        failure: Option<String>,
        elapsed: Duration,
    },
    BatchFinished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
    pub completed: u64,
    pub found: u64,
    pub failed: u64,
    pub timed_out: u64,
}

impl ProbeStats {
    pub fn record(&mut self, found: bool, failure: Option<&str>) {
        self.completed += 1;
        if found {
            self.found += 1;
        }
        match failure {
            Some("timeout") => self.timed_out += 1,
            Some("not_found") | None => {}
            Some(_) => self.failed += 1,
        }
    }
}

pub struct ProbeProgress {
    term: Term,
    _multi_progress: MultiProgress,
    main_progress: ProgressBar,
    probe_progress: ProgressBar,
}

impl ProbeProgress {
    pub fn new(quiet: bool) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let term = Term::stderr();
        let multi_progress = MultiProgress::new();

        let main_style = ProgressStyle::with_template(
            "{prefix} {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["▰▱▱▱▱", "▰▰▱▱▱", "▰▰▰▱▱", "▰▰▰▰▱", "▰▰▰▰▰", "▱▰▰▰▰"]);

        let main_progress = if quiet {
            ProgressBar::hidden()
        } else {
            multi_progress.add(ProgressBar::new(0))
        };
        main_progress.set_style(main_style);
        main_progress.set_prefix(style("🔍 PROBES").green().bold().to_string());

        let probe_progress = if quiet {
            ProgressBar::hidden()
        } else {
            multi_progress.add(ProgressBar::new_spinner())
        };
        probe_progress.set_style(ProgressStyle::with_template("{prefix} {msg}")?);
        probe_progress.set_prefix(style("📡 SOURCE").cyan().bold().to_string());

        if !quiet {
            term.hide_cursor()?;
        }

        Ok(Self {
            term,
            _multi_progress: multi_progress,
            main_progress,
            probe_progress,
        })
    }

    /// Consume events until the batch finishes or every sender is dropped
    pub async fn run(&self, mut events: mpsc::Receiver<ProbeEvent>) -> ProbeStats {
        let mut stats = ProbeStats::default();

        while let Some(event) = events.recv().await {
            match event {
                ProbeEvent::BatchStarted { total } => {
                    self.main_progress.set_length(total as u64);
                    self.main_progress.set_position(0);
                }

                ProbeEvent::ProbeStarted { source } => {
                    self.probe_progress.set_message(format!(
                        "{} {}",
                        style("Probing:").dim(),
                        style(source).white().bold()
                    ));
                }

                ProbeEvent::ProbeFinished { source, found, failure, elapsed } => {
                    log::debug!("UI: {} finished in {:?} (found: {})", source, elapsed, found);
                    stats.record(found, failure.as_deref());
                    self.main_progress.inc(1);
                    self.main_progress.set_message(format!(
                        "{} | {} | {}",
                        style(format!("{} hits", stats.found)).green(),
                        style(format!("{} failed", stats.failed)).red(),
                        style(format!("{} timeouts", stats.timed_out)).yellow()
                    ));
                    if found {
                        self.main_progress.println(format!("   {} {}", style("✔").green(), source));
                    }
                }

                ProbeEvent::BatchFinished => {
                    self.main_progress
                        .finish_with_message(style("✅ Probing complete").green().bold().to_string());
                    self.probe_progress.finish_and_clear();
                    break;
                }
            }
        }

        stats
    }
}

impl Drop for ProbeProgress {
    fn drop(&mut self) {
        let _ = self.term.show_cursor();
    }
}
