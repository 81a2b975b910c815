//! Deploy configuration stored in `.monodeploy.toml` at the working directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = ".monodeploy.toml";

/// Deploy configuration (TOML).
///
/// Edited by humans and read once per run. Missing fields fall back to
/// defaults; command-line flags override whatever the file says.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeployConfig {
    /// Output directory, relative to the working directory unless absolute.
    pub output_dir: String,

    /// File name that marks a directory as an action.
    pub manifest: String,

    pub changes: ChangesConfig,
    pub build: BuildConfig,
    pub deploy: TargetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChangesConfig {
    /// Revision the current `HEAD` is diffed against.
    pub base: String,

    /// Also count staged, unstaged and untracked files as changed.
    pub include_uncommitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Build command for actions whose manifest does not set `build`.
    pub command: Vec<String>,

    /// Wall-clock limit for one action's build, in seconds.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of build stdout/stderr in memory.
    pub output_limit_bytes: usize,

    /// Number of builds allowed to run at once.
    pub jobs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    /// Remote repository template; `{name}` is replaced by the action name.
    /// Empty means actions must name their own remote.
    pub remote: String,

    /// Branch artifacts are pushed to.
    pub branch: String,

    /// Commit message template; `{name}` is replaced by the action name.
    pub commit_message: String,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            base: "HEAD~1".to_string(),
            include_uncommitted: true,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
            jobs: 1,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            remote: String::new(),
            branch: "main".to_string(),
            commit_message: "deploy {name}".to_string(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            output_dir: "build".to_string(),
            manifest: "action.toml".to_string(),
            changes: ChangesConfig::default(),
            build: BuildConfig::default(),
            deploy: TargetConfig::default(),
        }
    }
}

impl DeployConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.trim().is_empty() {
            return Err(anyhow!("output_dir must be non-empty"));
        }
        if self.manifest.trim().is_empty() || self.manifest.contains('/') {
            return Err(anyhow!("manifest must be a plain file name"));
        }
        if self.changes.base.trim().is_empty() {
            return Err(anyhow!("changes.base must be non-empty"));
        }
        if self.build.command.is_empty() || self.build.command[0].trim().is_empty() {
            return Err(anyhow!("build.command must be a non-empty array"));
        }
        if self.build.timeout_secs == 0 {
            return Err(anyhow!("build.timeout_secs must be > 0"));
        }
        if self.build.output_limit_bytes == 0 {
            return Err(anyhow!("build.output_limit_bytes must be > 0"));
        }
        if self.build.jobs == 0 {
            return Err(anyhow!("build.jobs must be > 0"));
        }
        if self.deploy.branch.trim().is_empty() {
            return Err(anyhow!("deploy.branch must be non-empty"));
        }
        Ok(())
    }

    /// Resolve the configured remote for `name`, if a template is set.
    pub fn remote_for(&self, name: &str) -> Option<String> {
        if self.deploy.remote.trim().is_empty() {
            return None;
        }
        Some(self.deploy.remote.replace("{name}", name))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DeployConfig::default()`.
pub fn load_config(path: &Path) -> Result<DeployConfig> {
    if !path.exists() {
        let cfg = DeployConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DeployConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &DeployConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
