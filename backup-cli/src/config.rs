//! Configuration management for the backup CLI.
//!
//! Loads projects and targets from a TOML file and validates them into the
//! engine's `ProjectSpec` / `BackupTarget` types.

use anyhow::Context;
use backup_engine::{BackupError, BackupTarget, ProjectSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "PROJECT_BACKUP_CONFIG";

/// File names looked up in the working directory
pub const LOCAL_CONFIG_NAMES: &[&str] = &["project-backup.toml", ".project-backup.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Backups kept per project and target
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Patterns excluded from every project
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,

    #[serde(default = "default_kind")]
    pub kind: TargetKind,

    /// Base directory (local) or remote base path
    pub path: String,

    /// Overrides `defaults.max_backups`
    #[serde(default)]
    pub max_backups: Option<usize>,

    /// Connection details of a remote target, kept opaque
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub connection: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    /// Root directory to back up
    pub path: String,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Target names; every target when absent
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

// Default values
fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_backups() -> usize {
    7
}

fn default_kind() -> TargetKind {
    TargetKind::Local
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_backups: default_max_backups(),
            exclude: Vec::new(),
        }
    }
}

/// A validated target together with its retention limit
#[derive(Debug, Clone)]
pub struct TargetSettings {
    pub target: BackupTarget,
    pub max_backups: usize,
}

/// A validated project and the names of the targets it backs up to
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub spec: ProjectSpec,
    pub targets: Vec<String>,
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub targets: Vec<TargetSettings>,
    pub projects: Vec<ProjectSettings>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Find and load the config file.
    ///
    /// Order: explicit path, `$PROJECT_BACKUP_CONFIG`, `./project-backup.toml`,
    /// `./.project-backup.toml`, `<config dir>/project-backup/config.toml`.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, Self)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let _ = dotenvy::dotenv();
                let cwd = std::env::current_dir().context("Failed to determine working directory")?;
                let candidates = candidate_paths(std::env::var(CONFIG_ENV).ok(), &cwd, dirs::config_dir());
                locate(&candidates)?
            }
        };

        let config = Self::from_file(&path)?;
        Ok((path, config))
    }

    /// Check every project and target and convert them for the engine
    pub fn validate(&self) -> Result<Settings, BackupError> {
        if self.targets.is_empty() {
            return Err(config_error("at least one [[targets]] entry is required"));
        }
        check_max_backups("defaults.max_backups", self.defaults.max_backups)?;

        let mut target_names = HashSet::new();
        let mut targets = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let name = target.name.trim();
            if name.is_empty() {
                return Err(config_error("target names must not be empty"));
            }
            if !target_names.insert(name.to_string()) {
                return Err(config_error(format!("duplicate target name '{}'", name)));
            }

            let max_backups = target.max_backups.unwrap_or(self.defaults.max_backups);
            check_max_backups(&format!("targets.{}.max_backups", name), max_backups)?;

            let backup_target = match target.kind {
                TargetKind::Local => {
                    let base_path = expand_home(&target.path);
                    if !base_path.is_absolute() {
                        return Err(config_error(format!(
                            "target '{}' path must be absolute, got '{}'",
                            name, target.path
                        )));
                    }
                    BackupTarget::Local {
                        name: name.to_string(),
                        base_path,
                    }
                }
                TargetKind::Remote => BackupTarget::Remote {
                    name: name.to_string(),
                    base_path: target.path.clone(),
                    connection_info: target.connection.clone(),
                },
            };

            targets.push(TargetSettings {
                target: backup_target,
                max_backups,
            });
        }

        let mut project_names = HashSet::new();
        let mut projects = Vec::with_capacity(self.projects.len());
        for project in &self.projects {
            let name = project.name.trim();
            if name.is_empty() {
                return Err(config_error("project names must not be empty"));
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(config_error(format!("project name '{}' must be a plain folder name", name)));
            }
            if !project_names.insert(name.to_string()) {
                return Err(config_error(format!("duplicate project name '{}'", name)));
            }

            let root_path = expand_home(&project.path);
            if !root_path.is_absolute() {
                return Err(config_error(format!(
                    "project '{}' path must be absolute, got '{}'",
                    name, project.path
                )));
            }
            if !root_path.is_dir() {
                return Err(config_error(format!(
                    "project '{}' path {} is not an existing directory",
                    name,
                    root_path.display()
                )));
            }

            let project_targets = match &project.targets {
                Some(list) => {
                    let mut selected: Vec<String> = Vec::with_capacity(list.len());
                    for target in list.iter().map(|t| t.trim()) {
                        if !target_names.contains(target) {
                            return Err(config_error(format!(
                                "project '{}' refers to unknown target '{}'",
                                name, target
                            )));
                        }
                        if !selected.iter().any(|t| t == target) {
                            selected.push(target.to_string());
                        }
                    }
                    selected
                }
                None => targets.iter().map(|t| t.target.name().to_string()).collect(),
            };

            let exclude_patterns = self
                .defaults
                .exclude
                .iter()
                .chain(project.exclude.iter())
                .cloned()
                .collect();

            projects.push(ProjectSettings {
                spec: ProjectSpec {
                    name: name.to_string(),
                    root_path,
                    exclude_patterns,
                },
                targets: project_targets,
            });
        }

        Ok(Settings {
            targets,
            projects,
        })
    }
}

impl Settings {
    pub fn project(&self, name: &str) -> Result<&ProjectSettings, BackupError> {
        self.projects
            .iter()
            .find(|p| p.spec.name == name)
            .ok_or_else(|| config_error(format!("unknown project '{}'", name)))
    }

    pub fn target(&self, name: &str) -> Result<&TargetSettings, BackupError> {
        self.targets
            .iter()
            .find(|t| t.target.name() == name)
            .ok_or_else(|| config_error(format!("unknown target '{}'", name)))
    }

    /// Targets a project backs up to, optionally narrowed to one name
    pub fn targets_for(&self, project: &ProjectSettings, only: Option<&str>) -> Result<Vec<&TargetSettings>, BackupError> {
        match only {
            Some(name) => {
                let target = self.target(name)?;
                if !project.targets.iter().any(|t| t == name) {
                    return Err(config_error(format!(
                        "project '{}' is not configured for target '{}'",
                        project.spec.name, name
                    )));
                }
                Ok(vec![target])
            }
            None => project.targets.iter().map(|name| self.target(name)).collect(),
        }
    }

    /// One project by name, or all of them
    pub fn select_projects(&self, name: Option<&str>) -> Result<Vec<&ProjectSettings>, BackupError> {
        match name {
            Some(name) => Ok(vec![self.project(name)?]),
            None => Ok(self.projects.iter().collect()),
        }
    }
}

/// Config file locations in lookup order
pub fn candidate_paths(env_value: Option<String>, cwd: &Path, config_dir: Option<PathBuf>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        candidates.push(expand_home(&value));
    }
    candidates.extend(LOCAL_CONFIG_NAMES.iter().map(|name| cwd.join(name)));
    if let Some(dir) = config_dir {
        candidates.push(dir.join("project-backup").join("config.toml"));
    }
    candidates
}

/// First existing candidate
pub fn locate(candidates: &[PathBuf]) -> Result<PathBuf, BackupError> {
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            config_error(format!(
                "no configuration file found (searched: {}); run `project-backup init` to create one",
                searched.join(", ")
            ))
        })
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn check_max_backups(field: &str, value: usize) -> Result<(), BackupError> {
    if value == 0 {
        return Err(config_error(format!("{} must be at least 1", field)));
    }
    Ok(())
}

fn config_error(message: impl Into<String>) -> BackupError {
    BackupError::Config(message.into())
}

/// Written by `project-backup init`
pub const STARTER_CONFIG: &str = r#"# project-backup configuration

[log]
level = "info"

[defaults]
# Backups kept per project and target
max_backups = 7
# Excluded from every project. Patterns match paths relative to the project
# root; `*` stays within one folder, `**` spans folders, every other
# character is literal, and a pattern also matches anywhere it occurs as
# plain text.
exclude = [".git", "node_modules", ".DS_Store"]

[[targets]]
name = "local"
kind = "local"
path = "/var/backups/projects"

[[projects]]
name = "my-project"
path = "/path/to/my-project"
exclude = ["target", "*.log"]
"#;
