//! Common test utilities and helpers for git-autosync tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use git_autosync::{GitOutput, GitRunner, Notification, NotificationSink, Notifier};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One recorded git invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCall {
    pub dir: PathBuf,
    pub args: String,
}

/// Git fake answering by command prefix, recording every call
///
/// Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedGit {
    rules: Vec<(String, GitOutput)>,
    calls: Mutex<Vec<GitCall>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` (e.g. "fetch upstream") with `output`
    pub fn on(mut self, prefix: &str, output: GitOutput) -> Self {
        self.rules.push((prefix.to_string(), output));
        self
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.args).collect()
    }
}

#[async_trait]
impl GitRunner for ScriptedGit {
    async fn run(&self, dir: &Path, args: &[String]) -> Result<GitOutput> {
        let joined = args.join(" ");
        self.calls.lock().unwrap().push(GitCall {
            dir: dir.to_path_buf(),
            args: joined.clone(),
        });

        let output = self
            .rules
            .iter()
            .find(|(prefix, _)| joined.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| GitOutput::ok(""));

        Ok(output)
    }
}

/// Sink that keeps every notification for later inspection
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn notifier(&self) -> Arc<Notifier> {
        Arc::new(Notifier::new("test", Box::new(self.clone())))
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Whether a usable `git` executable is on PATH
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
