//! git-autosync - Work-hours git synchronization with desktop notifications
//!
//! Keeps a set of local working copies merged with designated upstream
//! branches. Runs only inside configured work-hour windows (or when forced),
//! processes every sync strictly in order and reports conflicts, failures
//! and a final summary through the host's native notification mechanism.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and parsing
//! - [`schedule`]: Work-hours gate
//! - [`git`]: External git invocations
//! - [`sync`]: Fetch, checkout and merge of one sync
//! - [`notify`]: Desktop notification sinks
//! - [`run`]: Run orchestration and summary

pub mod config;
pub mod git;
pub mod notify;
pub mod run;
pub mod schedule;
pub mod sync;

pub use config::{Config, Project, SyncSpec};
pub use git::{GitClient, GitCommand, GitOutput, GitRunner};
pub use notify::{Notification, NotificationSink, Notifier, Severity};
pub use run::{RunOrchestrator, RunSummary};
pub use sync::{FailureStage, SyncExecutor, SyncOutcome};
