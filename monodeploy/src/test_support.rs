//! Test-only fakes for actions, catalogs, change sources and deploy targets,
//! plus helpers for throwaway git repositories.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;

use crate::action::{Action, DeployCoordinates};
use crate::core::ownership::Ownership;
use crate::core::types::ChangedFiles;
use crate::io::changes::ChangeSource;
use crate::io::deploy::DeployTarget;
use crate::io::workspace::ActionCatalog;
use crate::run::RunEvent;

/// In-memory action with scripted build behavior.
///
/// Clones share the build counter, so a catalog can hand out copies and still
/// report how often each action was built.
#[derive(Debug, Clone)]
pub struct FakeAction {
    name: String,
    ownership: Option<Ownership>,
    matcher: Option<fn(&str) -> bool>,
    artifact_dir: Option<PathBuf>,
    coordinates: DeployCoordinates,
    build_error: Option<String>,
    stray_output: Option<String>,
    builds: Arc<AtomicUsize>,
}

impl FakeAction {
    /// Action owning the given path prefixes or globs.
    pub fn owning<S: AsRef<str>>(name: &str, rules: &[S]) -> Self {
        let ownership = Ownership::parse(rules).expect("valid ownership rules");
        Self::base(name, Some(ownership), None)
    }

    /// Action with no declared rules, matched only through `matcher`.
    pub fn opaque(name: &str, matcher: fn(&str) -> bool) -> Self {
        Self::base(name, None, Some(matcher))
    }

    fn base(name: &str, ownership: Option<Ownership>, matcher: Option<fn(&str) -> bool>) -> Self {
        Self {
            name: name.to_string(),
            ownership,
            matcher,
            artifact_dir: None,
            coordinates: DeployCoordinates {
                remote: None,
                branch: "main".to_string(),
            },
            build_error: None,
            stray_output: None,
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_artifact_dir(mut self, dir: PathBuf) -> Self {
        self.artifact_dir = Some(dir);
        self
    }

    pub fn with_coordinates(mut self, coordinates: DeployCoordinates) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Every build fails with `message`.
    pub fn failing_build(mut self, message: &str) -> Self {
        self.build_error = Some(message.to_string());
        self
    }

    /// Builds also create `entry` next to the artifact directory.
    pub fn writing_outside(mut self, entry: &str) -> Self {
        self.stray_output = Some(entry.to_string());
        self
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl Action for FakeAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, path: &str) -> bool {
        match (&self.ownership, self.matcher) {
            (Some(ownership), _) => ownership.contains(path),
            (None, Some(matcher)) => matcher(path),
            (None, None) => false,
        }
    }

    fn ownership(&self) -> Option<&Ownership> {
        self.ownership.as_ref()
    }

    fn artifact_dir(&self) -> &Path {
        self.artifact_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(&self.name))
    }

    fn deploy_coordinates(&self) -> &DeployCoordinates {
        &self.coordinates
    }

    fn build(&self) -> Result<()> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.build_error {
            bail!("{message}");
        }
        let artifacts = self.artifact_dir();
        fs::create_dir_all(artifacts)?;
        fs::write(artifacts.join("artifact.txt"), &self.name)?;
        if let Some(stray) = &self.stray_output {
            let parent = artifacts
                .parent()
                .ok_or_else(|| anyhow!("artifact dir has no parent"))?;
            fs::write(parent.join(stray), "stray")?;
        }
        Ok(())
    }
}

/// Catalog returning a fixed list of fake actions, placed under the run's
/// output directory.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    actions: Vec<FakeAction>,
    fail: bool,
}

impl FakeCatalog {
    pub fn new(actions: Vec<FakeAction>) -> Self {
        Self {
            actions,
            fail: false,
        }
    }

    /// Catalog whose discovery always fails.
    pub fn failing() -> Self {
        Self {
            actions: Vec::new(),
            fail: true,
        }
    }

    pub fn build_count(&self, name: &str) -> usize {
        self.actions
            .iter()
            .find(|action| action.name == name)
            .map_or(0, FakeAction::build_count)
    }

    pub fn total_builds(&self) -> usize {
        self.actions.iter().map(FakeAction::build_count).sum()
    }
}

impl ActionCatalog for FakeCatalog {
    type Action = FakeAction;

    fn collect_actions(&self, _workdir: &Path, output_dir: &Path) -> Result<Vec<FakeAction>> {
        if self.fail {
            bail!("scripted discovery failure");
        }
        Ok(self
            .actions
            .iter()
            .map(|action| {
                let mut action = action.clone();
                if action.artifact_dir.is_none() {
                    action.artifact_dir = Some(output_dir.join(&action.name));
                }
                action
            })
            .collect())
    }
}

/// Change source returning a fixed set of paths.
#[derive(Debug, Clone)]
pub struct FixedChangeSource {
    files: ChangedFiles,
}

impl FixedChangeSource {
    pub fn new(paths: &[&str]) -> Self {
        Self {
            files: paths.iter().collect(),
        }
    }
}

impl ChangeSource for FixedChangeSource {
    fn changed_files(&self, _workdir: &Path) -> Result<ChangedFiles> {
        Ok(self.files.clone())
    }
}

/// Change source that always fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingChangeSource;

impl ChangeSource for FailingChangeSource {
    fn changed_files(&self, _workdir: &Path) -> Result<ChangedFiles> {
        bail!("scripted change detection failure")
    }
}

/// Deploy target that records calls and fails for selected action names.
#[derive(Debug, Default)]
pub struct RecordingDeployTarget {
    fail_for: BTreeSet<String>,
    attempted: Mutex<Vec<String>>,
    deployed: Mutex<Vec<String>>,
}

impl RecordingDeployTarget {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            fail_for: names.iter().map(|name| (*name).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().expect("lock").clone()
    }

    pub fn deployed(&self) -> Vec<String> {
        self.deployed.lock().expect("lock").clone()
    }
}

impl DeployTarget for RecordingDeployTarget {
    fn deploy(&self, action: &dyn Action) -> Result<()> {
        let name = action.name().to_string();
        self.attempted.lock().expect("lock").push(name.clone());
        if self.fail_for.contains(&name) {
            bail!("scripted deploy failure for {name}");
        }
        self.deployed.lock().expect("lock").push(name);
        Ok(())
    }
}

/// Compact label for asserting event sequences.
pub fn event_label(event: &RunEvent) -> String {
    match event {
        RunEvent::RunStarted { .. } => "run_started".to_string(),
        RunEvent::ActionsDiscovered { names } => format!("actions_discovered:{}", names.join(",")),
        RunEvent::ChangesDetected { files } => format!("changes_detected:{}", files.len()),
        RunEvent::ActionSelected { name, .. } => format!("selected:{name}"),
        RunEvent::NothingToDo => "nothing_to_do".to_string(),
        RunEvent::BuildStarted { name } => format!("build_started:{name}"),
        RunEvent::BuildSucceeded { name, .. } => format!("build_succeeded:{name}"),
        RunEvent::BuildFailed { name, .. } => format!("build_failed:{name}"),
        RunEvent::DeploySkipped { name } => format!("deploy_skipped:{name}"),
        RunEvent::DeployStarted { name } => format!("deploy_started:{name}"),
        RunEvent::DeploySucceeded { name, .. } => format!("deploy_succeeded:{name}"),
        RunEvent::DeployFailed { name, .. } => format!("deploy_failed:{name}"),
        RunEvent::ActionAborted { name } => format!("aborted:{name}"),
        RunEvent::RunCompleted { status, .. } => {
            let status = serde_json::to_value(status).expect("serialize status");
            format!("run_completed:{}", status.as_str().unwrap_or_default())
        }
    }
}

/// Git repository in a temporary directory with a local identity configured.
#[derive(Debug)]
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        git_output(dir.path(), &["init", "-q"])?;
        git_output(dir.path(), &["config", "user.name", "Test"])?;
        git_output(dir.path(), &["config", "user.email", "test@example.com"])?;
        git_output(dir.path(), &["config", "commit.gpgsign", "false"])?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        git_output(self.path(), &["add", "-A"])?;
        git_output(self.path(), &["commit", "-q", "-m", message])?;
        Ok(())
    }
}

/// Run git in `dir` and return stdout, failing on a non-zero exit.
pub fn git_output(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("run git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Create a bare repository at `path` and return its path.
pub fn init_bare_remote(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path).with_context(|| format!("create {}", path.display()))?;
    git_output(path, &["init", "-q", "--bare"])?;
    Ok(path.to_path_buf())
}
