//! Run Orchestrator - one scheduled pass over every configured project
//!
//! Loads the configuration, applies the work-hours gate, runs each sync
//! strictly in order (a checkout changes the working copy, so two syncs on
//! one path must never overlap) and sends a single summary notification.

use chrono::{Local, NaiveDateTime};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::git::{GitClient, GitRunner};
use crate::notify::{Notifier, Severity};
use crate::schedule;
use crate::sync::{SyncExecutor, SyncOutcome};

/// Exit code for a completed run or a closed gate
pub const EXIT_OK: i32 = 0;

/// Exit code when the configuration is missing or unusable
pub const EXIT_CONFIG_ERROR: i32 = 1;

/// Counters accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub conflicted: usize,
    pub skipped_projects: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &SyncOutcome) {
        self.total += 1;
        match outcome {
            SyncOutcome::Success => self.successful += 1,
            SyncOutcome::Failure { .. } => self.failed += 1,
            SyncOutcome::Conflict { .. } => self.conflicted += 1,
        }
    }

    /// Severity of the summary notification, `None` when nothing ran
    ///
    /// Conflicts outrank plain failures.
    pub fn severity(&self) -> Option<Severity> {
        if self.total == 0 {
            None
        } else if self.conflicted > 0 {
            Some(Severity::Warning)
        } else if self.failed == 0 {
            Some(Severity::Success)
        } else {
            Some(Severity::Error)
        }
    }

    fn title(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Success => "Git sync complete",
            Severity::Warning => "Git sync finished with conflicts",
            Severity::Error | Severity::Info => "Git sync finished with errors",
        }
    }

    fn message(&self) -> String {
        let mut message = format!(
            "{} of {} syncs succeeded, {} failed, {} conflicted",
            self.successful, self.total, self.failed, self.conflicted
        );
        if self.skipped_projects > 0 {
            message.push_str(&format!(
                " ({} project(s) skipped)",
                self.skipped_projects
            ));
        }
        message
    }
}

/// Coordinates the gate, the syncs and the notifications
pub struct RunOrchestrator<R> {
    executor: SyncExecutor<R>,
    notifier: Arc<Notifier>,
}

impl<R: GitRunner> RunOrchestrator<R> {
    pub fn new(runner: R, notifier: Arc<Notifier>) -> Self {
        let executor = SyncExecutor::new(GitClient::new(runner), notifier.clone());
        Self { executor, notifier }
    }

    pub fn executor(&self) -> &SyncExecutor<R> {
        &self.executor
    }

    /// Gate and run an already loaded configuration
    ///
    /// Returns `None` when the gate is closed.
    pub async fn run_config(
        &self,
        config: &Config,
        now: NaiveDateTime,
        force: bool,
    ) -> Option<RunSummary> {
        if !schedule::should_run(config, now, force) {
            info!("Not within work hours or scheduled time. Use --force to run anyway.");
            return None;
        }

        info!("Starting git automation at {}", now.format("%Y-%m-%d %H:%M:%S"));
        let summary = self.sync_all(config).await;
        self.report(&summary).await;

        info!(
            "Git automation completed in {:.2}s: {} total, {} successful, {} failed, {} conflicted, {} projects skipped",
            summary.duration.as_secs_f64(),
            summary.total,
            summary.successful,
            summary.failed,
            summary.conflicted,
            summary.skipped_projects
        );

        Some(summary)
    }

    /// Run every sync of every project, one at a time, in file order
    pub async fn sync_all(&self, config: &Config) -> RunSummary {
        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        for project in &config.projects {
            let path = Path::new(&project.path);
            if project.path.is_empty() || !path.exists() {
                warn!(
                    "Skipping {}: path does not exist - {:?}",
                    project.name, project.path
                );
                summary.skipped_projects += 1;
                continue;
            }

            debug!("Project {} has {} sync(s)", project.name, project.syncs.len());
            for spec in &project.syncs {
                let outcome = self.executor.execute(&project.name, path, spec).await;
                summary.record(&outcome);
            }
        }

        summary.duration = start_time.elapsed();
        summary
    }

    async fn report(&self, summary: &RunSummary) {
        let Some(severity) = summary.severity() else {
            info!("No syncs were run; skipping summary notification");
            return;
        };

        self.notifier
            .notify(summary.title(severity), &summary.message(), severity)
            .await;
    }
}

/// Run once at the current local time against the configuration at `config_path`
///
/// The notifier is chosen from the loaded configuration, so a missing or
/// invalid config file ends the run before any notification can be sent.
pub async fn run<R: GitRunner>(runner: R, config_path: &Path, force: bool) -> i32 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let notifier = Arc::new(Notifier::for_host(&config.notifications));
    RunOrchestrator::new(runner, notifier)
        .run_config(&config, Local::now().naive_local(), force)
        .await;

    EXIT_OK
}

/// Load the configuration, mapping problems to the config-error exit code
pub fn load_config(config_path: &Path) -> Result<Config, i32> {
    if !config_path.exists() {
        error!("Config file not found: {}", config_path.display());
        return Err(EXIT_CONFIG_ERROR);
    }

    Config::load(config_path).map_err(|e| {
        error!("{:#}", e);
        EXIT_CONFIG_ERROR
    })
}
