//! Action discovery: scan the working directory for action manifests.
//!
//! A directory holding the manifest file (`action.toml` by default) is an
//! action. It owns its own directory plus any extra `paths` it declares, and
//! builds by running a command inside that directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::action::{Action, DeployCoordinates, validate_action_name};
use crate::core::ownership::{Ownership, OwnershipRule};
use crate::core::path::normalize_relative;
use crate::io::config::DeployConfig;
use crate::io::process::run_command_with_timeout;

/// Environment variable holding the action name during its build.
pub const ENV_ACTION: &str = "MONODEPLOY_ACTION";
/// Environment variable holding the artifact directory during a build.
pub const ENV_OUTPUT_DIR: &str = "MONODEPLOY_OUTPUT_DIR";

/// Directories never descended into while scanning.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

/// Lines of build output kept in error messages.
const ERROR_TAIL_LINES: usize = 20;

/// Produces the ordered list of every known action for a run.
pub trait ActionCatalog {
    type Action: Action;

    fn collect_actions(&self, workdir: &Path, output_dir: &Path) -> Result<Vec<Self::Action>>;
}

/// On-disk action manifest.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub name: Option<String>,
    pub build: Option<Vec<String>>,
    /// Extra owned paths or globs, relative to the working directory.
    pub paths: Vec<String>,
    pub deploy: ManifestDeploy,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestDeploy {
    pub remote: Option<String>,
    pub branch: Option<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
    }
}

/// An action discovered from a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestAction {
    name: String,
    /// Action directory relative to the working directory (empty at the root).
    relative_dir: String,
    dir: PathBuf,
    ownership: Ownership,
    build_command: Vec<String>,
    build_timeout: Duration,
    output_limit_bytes: usize,
    artifact_dir: PathBuf,
    coordinates: DeployCoordinates,
}

impl ManifestAction {
    pub fn relative_dir(&self) -> &str {
        &self.relative_dir
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn build_command(&self) -> &[String] {
        &self.build_command
    }
}

impl Action for ManifestAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, path: &str) -> bool {
        self.ownership.contains(path)
    }

    fn ownership(&self) -> Option<&Ownership> {
        Some(&self.ownership)
    }

    fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    fn deploy_coordinates(&self) -> &DeployCoordinates {
        &self.coordinates
    }

    #[instrument(skip_all, fields(action = %self.name))]
    fn build(&self) -> Result<()> {
        fs::create_dir_all(&self.artifact_dir)
            .with_context(|| format!("create artifact dir {}", self.artifact_dir.display()))?;
        let (program, args) = self
            .build_command
            .split_first()
            .ok_or_else(|| anyhow!("empty build command"))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.dir)
            .env(ENV_ACTION, &self.name)
            .env(ENV_OUTPUT_DIR, &self.artifact_dir);
        debug!(command = ?self.build_command, "running build command");

        let output = run_command_with_timeout(cmd, self.build_timeout, self.output_limit_bytes)
            .with_context(|| format!("run build command {:?}", self.build_command))?;
        if output.timed_out {
            bail!(
                "build command timed out after {}s",
                self.build_timeout.as_secs()
            );
        }
        if !output.status.success() {
            let tail = output.tail(ERROR_TAIL_LINES);
            if tail.is_empty() {
                bail!("build command exited with {:?}", output.status.code());
            }
            bail!(
                "build command exited with {:?}:\n{}",
                output.status.code(),
                tail
            );
        }
        Ok(())
    }
}

/// Filesystem catalog of manifest-defined actions.
#[derive(Debug, Clone)]
pub struct Workspace {
    config: DeployConfig,
}

impl Workspace {
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    fn action_from_manifest(
        &self,
        workdir: &Path,
        output_dir: &Path,
        manifest_path: &Path,
    ) -> Result<ManifestAction> {
        let manifest = Manifest::load(manifest_path)?;
        let dir = manifest_path
            .parent()
            .ok_or_else(|| anyhow!("manifest without parent {}", manifest_path.display()))?
            .to_path_buf();
        let relative = dir
            .strip_prefix(workdir)
            .with_context(|| format!("{} is outside the working directory", dir.display()))?;
        let relative_dir = normalize_relative(&relative.to_string_lossy()).unwrap_or_default();

        let name = match manifest.name {
            Some(name) => name,
            None => dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| anyhow!("cannot derive action name for {}", dir.display()))?,
        };
        validate_action_name(&name).with_context(|| format!("in {}", manifest_path.display()))?;

        let own_rule = if relative_dir.is_empty() {
            OwnershipRule::parse("**")?
        } else {
            OwnershipRule::prefix(relative_dir.clone())
        };
        let mut ownership = Ownership::new(vec![own_rule]);
        for raw in &manifest.paths {
            let rule = OwnershipRule::parse(raw)
                .with_context(|| format!("ownership in {}", manifest_path.display()))?;
            ownership.push(rule);
        }

        let build_command = match manifest.build {
            Some(command) if !command.is_empty() => command,
            Some(_) => bail!("empty build command in {}", manifest_path.display()),
            None => self.config.build.command.clone(),
        };

        let coordinates = DeployCoordinates {
            remote: manifest
                .deploy
                .remote
                .filter(|remote| !remote.trim().is_empty())
                .or_else(|| self.config.remote_for(&name)),
            branch: manifest
                .deploy
                .branch
                .unwrap_or_else(|| self.config.deploy.branch.clone()),
        };

        Ok(ManifestAction {
            artifact_dir: output_dir.join(&name),
            name,
            relative_dir,
            dir,
            ownership,
            build_command,
            build_timeout: Duration::from_secs(self.config.build.timeout_secs),
            output_limit_bytes: self.config.build.output_limit_bytes,
            coordinates,
        })
    }
}

impl ActionCatalog for Workspace {
    type Action = ManifestAction;

    #[instrument(skip_all, fields(workdir = %workdir.display()))]
    fn collect_actions(&self, workdir: &Path, output_dir: &Path) -> Result<Vec<ManifestAction>> {
        let mut actions = Vec::new();
        let walker = WalkDir::new(workdir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !skip_entry(entry, workdir, output_dir));
        for entry in walker {
            let entry = entry.with_context(|| format!("scan {}", workdir.display()))?;
            if !entry.file_type().is_file() || entry.file_name() != self.config.manifest.as_str() {
                continue;
            }
            let action = self.action_from_manifest(workdir, output_dir, entry.path())?;
            debug!(action = %action.name, dir = %action.relative_dir, "found action");
            actions.push(action);
        }
        actions.sort_by(|a, b| a.relative_dir.cmp(&b.relative_dir));
        ensure_unique_names(&actions)?;
        info!(count = actions.len(), "actions collected");
        Ok(actions)
    }
}

fn skip_entry(entry: &DirEntry, workdir: &Path, output_dir: &Path) -> bool {
    if !entry.file_type().is_dir() || entry.path() == workdir {
        return false;
    }
    if entry.path() == output_dir {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn ensure_unique_names(actions: &[ManifestAction]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for action in actions {
        if let Some(previous) = seen.insert(&action.name, &action.relative_dir) {
            bail!(
                "duplicate action name '{}' in '{}' and '{}'",
                action.name,
                previous,
                action.relative_dir
            );
        }
    }
    Ok(())
}
