//! Sync Executor - fetch, checkout and merge one remote branch
//!
//! Each sync runs three git steps against a project's working copy and
//! classifies the result as a [`SyncOutcome`]. Failures and conflicts are
//! reported through the [`Notifier`] before the outcome is returned; errors
//! never escape `execute`, so one broken project cannot stop the run.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::SyncSpec;
use crate::git::{GitClient, GitOutput, GitRunner};
use crate::notify::{truncate_chars, Notifier, Severity};

/// Characters of diagnostic text carried into notifications
pub const DETAIL_CHARS: usize = 150;

const CONFLICT_MARKER: &str = "CONFLICT";

/// Step at which a sync failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Checkout,
    /// Process launch, I/O or other error outside git's own exit status
    Unexpected,
}

/// Result of one sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Failure {
        stage: FailureStage,
        message: String,
    },
    Conflict {
        message: String,
        /// Conflicted files as reported by git, if they could be listed
        files: Option<String>,
    },
}

/// How a merge invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeClass {
    Clean,
    Conflict,
    /// Merge exited cleanly but stderr mentions an error
    SoftError(String),
}

/// Classify merge output
///
/// The soft-error check is a best-effort text heuristic on git's stderr.
pub fn classify_merge(output: &GitOutput) -> MergeClass {
    if !output.success
        || output.stdout.contains(CONFLICT_MARKER)
        || output.stderr.contains(CONFLICT_MARKER)
    {
        return MergeClass::Conflict;
    }

    let stderr = output.stderr.trim();
    if !stderr.is_empty() && stderr.to_lowercase().contains("error") {
        return MergeClass::SoftError(truncate_chars(stderr, DETAIL_CHARS));
    }

    MergeClass::Clean
}

/// Runs syncs and reports their failures
pub struct SyncExecutor<R> {
    git: GitClient<R>,
    notifier: Arc<Notifier>,
}

impl<R: GitRunner> SyncExecutor<R> {
    pub fn new(git: GitClient<R>, notifier: Arc<Notifier>) -> Self {
        Self { git, notifier }
    }

    pub fn git(&self) -> &GitClient<R> {
        &self.git
    }

    /// Sync `spec` into the working copy at `path`
    ///
    /// Checking out the local branch changes the working copy; that is the
    /// point of the operation.
    pub async fn execute(&self, project: &str, path: &Path, spec: &SyncSpec) -> SyncOutcome {
        info!(
            "Processing {} at {} (remote {}, merging {} into {})",
            project,
            path.display(),
            spec.remote,
            spec.merge_ref(),
            spec.local_branch
        );

        let outcome = match self.try_execute(project, path, spec).await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome::Failure {
                stage: FailureStage::Unexpected,
                message: format!("Error syncing {}: {:#}", spec.merge_ref(), e),
            },
        };

        match &outcome {
            SyncOutcome::Success => {
                info!("Completed {} <- {}", project, spec.merge_ref());
            }
            SyncOutcome::Failure { message, .. } => {
                error!("Sync of {} failed: {}", project, message);
                self.notifier
                    .notify(&format!("Sync failed: {}", project), message, Severity::Error)
                    .await;
            }
            SyncOutcome::Conflict { message, .. } => {
                warn!("Merge conflict in {}: {}", project, message);
                self.notifier
                    .notify(&format!("Merge conflict: {}", project), message, Severity::Warning)
                    .await;
            }
        }

        outcome
    }

    async fn try_execute(&self, project: &str, path: &Path, spec: &SyncSpec) -> Result<SyncOutcome> {
        info!("Fetching {}...", spec.remote);
        let fetch = self.git.fetch(path, &spec.remote).await?;
        if !fetch.success {
            return Ok(SyncOutcome::Failure {
                stage: FailureStage::Fetch,
                message: format!("Fetch of {} failed: {}", spec.remote, fetch.error_text()),
            });
        }

        info!("Checking out {}...", spec.local_branch);
        let checkout = self.git.checkout(path, &spec.local_branch).await?;
        if !checkout.success {
            return Ok(SyncOutcome::Failure {
                stage: FailureStage::Checkout,
                message: format!(
                    "Checkout of {} failed: {}",
                    spec.local_branch,
                    checkout.error_text()
                ),
            });
        }

        let merge_ref = spec.merge_ref();
        info!("Merging {} -> {}...", merge_ref, spec.local_branch);
        let merge = self.git.merge(path, &merge_ref).await?;

        if !merge.stdout.trim().is_empty() {
            info!("{}", merge.stdout.trim());
        }
        if !merge.stderr.trim().is_empty() {
            warn!("{}", merge.stderr.trim());
        }

        match classify_merge(&merge) {
            MergeClass::Conflict => {
                let files = self.git.list_conflicts(path).await;
                let listing = files
                    .as_deref()
                    .map(|f| truncate_chars(f, DETAIL_CHARS))
                    .unwrap_or_else(|| "unknown".to_string());

                Ok(SyncOutcome::Conflict {
                    message: format!(
                        "Conflict merging {} into {}. Files: {}",
                        merge_ref, spec.local_branch, listing
                    ),
                    files,
                })
            }
            MergeClass::SoftError(detail) => {
                self.notifier
                    .notify(&format!("Merge warning: {}", project), &detail, Severity::Warning)
                    .await;
                Ok(SyncOutcome::Success)
            }
            MergeClass::Clean => Ok(SyncOutcome::Success),
        }
    }
}
