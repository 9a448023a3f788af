use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

/// Captured result of one git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Text describing a failed step; stderr first, stdout when stderr is empty
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs git in an explicit working directory
///
/// Every invocation names its directory, so nothing relies on the
/// process-wide current directory.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` in `dir`; `Err` only when the process could not run
    async fn run(&self, dir: &Path, args: &[String]) -> Result<GitOutput>;
}

/// Production runner spawning the `git` executable
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: String,
}

impl GitCommand {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a different executable, e.g. an absolute path to git
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRunner for GitCommand {
    async fn run(&self, dir: &Path, args: &[String]) -> Result<GitOutput> {
        debug!("Running {} {} in {}", self.program, args.join(" "), dir.display());

        let output = AsyncCommand::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .with_context(|| format!("Failed to execute {} {}", self.program, args.join(" ")))?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// The git operations a sync needs, on top of a [`GitRunner`]
pub struct GitClient<R> {
    runner: R,
}

impl<R: GitRunner> GitClient<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn fetch(&self, path: &Path, remote: &str) -> Result<GitOutput> {
        self.run(path, &["fetch", remote]).await
    }

    pub async fn checkout(&self, path: &Path, branch: &str) -> Result<GitOutput> {
        self.run(path, &["checkout", branch]).await
    }

    pub async fn merge(&self, path: &Path, merge_ref: &str) -> Result<GitOutput> {
        self.run(path, &["merge", merge_ref]).await
    }

    /// List files with unresolved merge conflicts
    ///
    /// Purely diagnostic: query errors and empty listings both yield `None`.
    pub async fn list_conflicts(&self, path: &Path) -> Option<String> {
        let output = match self
            .run(path, &["diff", "--name-only", "--diff-filter=U"])
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to list conflicted files in {}: {:#}", path.display(), e);
                return None;
            }
        };

        if !output.success {
            warn!(
                "Listing conflicted files failed in {}: {}",
                path.display(),
                output.error_text()
            );
            return None;
        }

        let files = output.stdout.trim();
        if files.is_empty() {
            None
        } else {
            Some(files.to_string())
        }
    }

    async fn run(&self, path: &Path, args: &[&str]) -> Result<GitOutput> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        self.runner.run(path, &args).await
    }
}
