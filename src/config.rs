use anyhow::{Context, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name looked up next to the executable when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "git_automation_config.json";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "GIT_AUTOSYNC_CONFIG";

/// Main configuration structure for git-autosync
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Weekday names ("Monday", ...) on which the gate may open
    #[serde(default)]
    pub work_days: Vec<String>,

    /// Checkpoint times in "HH:MM"
    #[serde(default)]
    pub schedule: Vec<String>,

    /// Desktop notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Projects to synchronize, in file order
    #[serde(default, deserialize_with = "deserialize_projects")]
    pub projects: Vec<Project>,
}

/// Desktop notification configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotificationConfig {
    /// Dispatch notifications to the desktop (log-only when false)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Application name shown by the notification daemon
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// A named working copy and the syncs to run against it
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub path: String,
    pub syncs: Vec<SyncSpec>,
}

/// One fetch/checkout/merge operation
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SyncSpec {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub remote_branch: String,

    #[serde(default = "default_branch")]
    pub local_branch: String,
}

/// On-disk project entry; either the simple form (sync fields inline) or
/// the multi form with a `syncs` list.
#[derive(Debug, Deserialize)]
struct ProjectEntry {
    #[serde(default)]
    path: String,

    #[serde(default)]
    syncs: Option<Vec<SyncSpec>>,

    #[serde(flatten)]
    single: SyncSpec,
}

impl ProjectEntry {
    fn into_project(self, name: String) -> Project {
        let syncs = match self.syncs {
            Some(syncs) => syncs,
            None => vec![self.single],
        };

        Project {
            name,
            path: self.path,
            syncs,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_app_name() -> String {
    "Git Autosync".to_string()
}
fn default_remote() -> String {
    "origin".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            app_name: default_app_name(),
        }
    }
}

impl Default for SyncSpec {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            remote_branch: default_branch(),
            local_branch: default_branch(),
        }
    }
}

impl SyncSpec {
    /// The `remote/branch` ref merged into the local branch
    pub fn merge_ref(&self) -> String {
        format!("{}/{}", self.remote, self.remote_branch)
    }
}

/// Keeps the file order of the `projects` mapping, which a HashMap would lose.
fn deserialize_projects<'de, D>(deserializer: D) -> Result<Vec<Project>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ProjectsVisitor;

    impl<'de> Visitor<'de> for ProjectsVisitor {
        type Value = Vec<Project>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a mapping from project name to project settings")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut projects: Vec<Project> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, entry)) = map.next_entry::<String, ProjectEntry>()? {
                // Repeated key: last value wins, first position kept
                match projects.iter_mut().find(|p| p.name == name) {
                    Some(existing) => *existing = entry.into_project(name),
                    None => projects.push(entry.into_project(name)),
                }
            }
            Ok(projects)
        }
    }

    deserializer.deserialize_map(ProjectsVisitor)
}

impl Config {
    /// Load configuration from a specific file
    ///
    /// `.yml`/`.yaml` files are parsed as YAML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yml") | Some("yaml")
        );

        let mut config: Config = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        };

        // Expand environment variables in paths
        config.expand_paths();

        Ok(config)
    }

    /// Resolve the configuration file path
    ///
    /// `GIT_AUTOSYNC_CONFIG` wins; otherwise the file sits beside the executable.
    pub fn default_config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }

        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        let dir = exe
            .parent()
            .context("Executable path has no parent directory")?;

        Ok(dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Expand `~` and environment variables in project paths
    ///
    /// A path that cannot be expanded is kept as written, so the project is
    /// later skipped as missing instead of failing the whole load.
    pub fn expand_paths(&mut self) {
        for project in &mut self.projects {
            if project.path.is_empty() {
                continue;
            }
            match shellexpand::full(&project.path) {
                Ok(expanded) => project.path = expanded.into_owned(),
                Err(e) => warn!(
                    "Failed to expand path of project {} ({}): {}",
                    project.name, project.path, e
                ),
            }
        }
    }

    /// Total number of syncs declared across all projects
    pub fn sync_count(&self) -> usize {
        self.projects.iter().map(|p| p.syncs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write config");
        path
    }

    #[test]
    fn test_sync_spec_defaults() {
        let spec: SyncSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.remote, "origin");
        assert_eq!(spec.remote_branch, "main");
        assert_eq!(spec.local_branch, "main");
        assert_eq!(spec.merge_ref(), "origin/main");
    }

    #[test]
    fn test_json_parsing_both_project_forms() {
        let json = r#"{
            "work_days": ["Monday", "Friday"],
            "schedule": ["09:00", "14:30"],
            "projects": {
                "zeta": { "path": "/srv/zeta", "remote": "upstream", "remote_branch": "develop" },
                "alpha": {
                    "path": "/srv/alpha",
                    "syncs": [
                        { "remote": "Luis", "remote_branch": "mongo" },
                        { "local_branch": "release" }
                    ]
                }
            }
        }"#;

        let config: Config = serde_json::from_str(json).expect("Failed to parse JSON");

        assert_eq!(config.work_days, vec!["Monday", "Friday"]);
        assert_eq!(config.schedule, vec!["09:00", "14:30"]);
        assert!(config.notifications.enabled);

        // File order is preserved, not alphabetical
        assert_eq!(config.projects[0].name, "zeta");
        assert_eq!(config.projects[1].name, "alpha");

        let zeta = &config.projects[0];
        assert_eq!(
            zeta.syncs,
            vec![SyncSpec {
                remote: "upstream".into(),
                remote_branch: "develop".into(),
                local_branch: "main".into(),
            }]
        );

        let alpha = &config.projects[1];
        assert_eq!(alpha.syncs.len(), 2);
        assert_eq!(alpha.syncs[0].merge_ref(), "Luis/mongo");
        assert_eq!(alpha.syncs[0].local_branch, "main");
        assert_eq!(alpha.syncs[1].remote, "origin");
        assert_eq!(alpha.syncs[1].local_branch, "release");
        assert_eq!(config.sync_count(), 3);
    }

    #[test]
    fn test_simple_and_single_element_syncs_are_equivalent() {
        let simple: Config = serde_json::from_str(
            r#"{"projects": {"p": {"path": "/x", "remote": "up", "remote_branch": "dev", "local_branch": "work"}}}"#,
        )
        .unwrap();
        let multi: Config = serde_json::from_str(
            r#"{"projects": {"p": {"path": "/x", "syncs": [{"remote": "up", "remote_branch": "dev", "local_branch": "work"}]}}}"#,
        )
        .unwrap();

        assert_eq!(simple.projects, multi.projects);
    }

    #[test]
    fn test_empty_syncs_list_means_no_syncs() {
        let config: Config =
            serde_json::from_str(r#"{"projects": {"p": {"path": "/x", "syncs": []}}}"#).unwrap();
        assert!(config.projects[0].syncs.is_empty());
    }

    #[test]
    fn test_missing_path_is_empty() {
        let config: Config = serde_json::from_str(r#"{"projects": {"p": {}}}"#).unwrap();
        assert_eq!(config.projects[0].path, "");
        assert_eq!(config.projects[0].syncs, vec![SyncSpec::default()]);
    }

    #[test]
    fn test_yaml_parsing() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.yml",
            r#"
work_days: [Tuesday]
schedule: ["08:15"]
notifications:
  enabled: false
  app_name: "Sync Bot"
projects:
  web:
    path: /srv/web
    syncs:
      - remote: fork
"#,
        );

        let config = Config::load(&path).expect("Failed to load YAML config");
        assert_eq!(config.work_days, vec!["Tuesday"]);
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.app_name, "Sync Bot");
        assert_eq!(config.projects[0].syncs[0].merge_ref(), "fork/main");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.json", "{ not json");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_expand_paths() {
        env::set_var("TEST_AUTOSYNC_HOME", "/test/home");

        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.json",
            r#"{"projects": {"p": {"path": "${TEST_AUTOSYNC_HOME}/dev/p"}, "q": {}}}"#,
        );

        let config = Config::load(&path).expect("Failed to load config");
        assert_eq!(config.projects[0].path, "/test/home/dev/p");
        assert_eq!(config.projects[1].path, "");

        env::remove_var("TEST_AUTOSYNC_HOME");
    }

    #[test]
    fn test_unexpandable_path_is_kept_raw() {
        env::remove_var("GIT_AUTOSYNC_TEST_UNSET_VAR");

        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.json",
            r#"{"projects": {"good": {"path": "/tmp"}, "bad": {"path": "/srv/$GIT_AUTOSYNC_TEST_UNSET_VAR/app"}}}"#,
        );

        let config = Config::load(&path).expect("One bad path must not fail the load");
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.projects[0].path, "/tmp");
        assert_eq!(config.projects[1].path, "/srv/$GIT_AUTOSYNC_TEST_UNSET_VAR/app");
    }

    #[test]
    fn test_duplicate_project_key_last_wins() {
        let config: Config = serde_json::from_str(
            r#"{"projects": {
                "api": {"path": "/old", "remote": "first"},
                "web": {"path": "/web"},
                "api": {"path": "/new", "remote": "second"}
            }}"#,
        )
        .unwrap();

        let names: Vec<&str> = config.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
        assert_eq!(config.projects[0].path, "/new");
        assert_eq!(config.projects[0].syncs[0].remote, "second");
    }

    #[test]
    fn test_default_config_path_beside_executable() {
        if env::var_os(CONFIG_ENV_VAR).is_some() {
            return;
        }
        let path = Config::default_config_path().expect("Failed to resolve default path");
        assert!(path.ends_with(DEFAULT_CONFIG_FILE));
    }
}
