//! Deploy targets: publish a built action's artifacts.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument};
#[cfg(not(unix))]
use tracing::warn;
use walkdir::WalkDir;

use crate::action::Action;
use crate::io::git::Git;

/// Publishes the artifacts of an action whose build succeeded.
pub trait DeployTarget {
    fn deploy(&self, action: &dyn Action) -> Result<()>;
}

/// Pushes each action's artifact directory to its own git remote and branch.
///
/// The remote branch is cloned into a scratch directory, its tree replaced by
/// the artifacts, and a commit pushed only when something changed. Existing
/// branch history is kept.
#[derive(Debug, Clone)]
pub struct GitDeployTarget {
    /// Commit message template; `{name}` is replaced by the action name.
    pub commit_message: String,
}

impl DeployTarget for GitDeployTarget {
    #[instrument(skip_all, fields(action = %action.name()))]
    fn deploy(&self, action: &dyn Action) -> Result<()> {
        let coordinates = action.deploy_coordinates();
        let remote = coordinates
            .remote
            .as_deref()
            .ok_or_else(|| anyhow!("no deploy remote configured"))?;
        let artifacts = action.artifact_dir();
        if !artifacts.is_dir() {
            bail!("artifact directory {} does not exist", artifacts.display());
        }

        let scratch = tempfile::tempdir().context("create deploy scratch directory")?;
        let staging = scratch.path().join("checkout");
        let git = Git::new(&staging);
        let cloned = Git::clone_branch(remote, &coordinates.branch, &staging)
            .with_context(|| format!("clone {remote} ({})", coordinates.branch))?;
        if !cloned {
            fs::create_dir_all(&staging)
                .with_context(|| format!("create {}", staging.display()))?;
            git.init_on_branch(&coordinates.branch)?;
        }

        clear_worktree(&staging)?;
        copy_tree(artifacts, &staging)?;
        git.add_all()?;

        let message = self.commit_message.replace("{name}", action.name());
        if !git.commit_staged(&message)? {
            info!(branch = %coordinates.branch, "artifacts unchanged, nothing to push");
            return Ok(());
        }
        git.push_head(remote, &coordinates.branch)
            .with_context(|| format!("push to {remote} ({})", coordinates.branch))?;
        debug!(branch = %coordinates.branch, "pushed artifacts");
        Ok(())
    }
}

/// Remove everything in a checkout except its `.git` directory.
fn clear_worktree(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.context("read entry")?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type().context("stat entry")?.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("remove {}", path.display()))?;
        } else {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
    }
    Ok(())
}

/// Copy the contents of `from` into `to`, skipping nested `.git` directories.
/// Symlinks are recreated as links, never followed.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    let walker = WalkDir::new(from)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", from.display()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("relativize {}", entry.path().display()))?;
        let target = to.join(relative);
        if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!("copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let points_to = fs::read_link(link).with_context(|| format!("read link {}", link.display()))?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::os::unix::fs::symlink(&points_to, target)
        .with_context(|| format!("link {} to {}", target.display(), points_to.display()))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _target: &Path) -> Result<()> {
    warn!(path = %link.display(), "skipping symlink in artifacts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DeployCoordinates;
    use crate::test_support::{FakeAction, TestRepo, git_output, init_bare_remote};

    fn target() -> GitDeployTarget {
        GitDeployTarget {
            commit_message: "deploy {name}".to_string(),
        }
    }

    fn action_with_artifacts(root: &Path, remote: Option<String>) -> FakeAction {
        let artifacts = root.join("build/svc");
        fs::create_dir_all(artifacts.join("dist")).expect("mkdir");
        fs::write(artifacts.join("dist/index.js"), "console.log(1)").expect("write");
        FakeAction::owning("svc", &["svc"])
            .with_artifact_dir(artifacts)
            .with_coordinates(DeployCoordinates {
                remote,
                branch: "release".to_string(),
            })
    }

    #[test]
    fn missing_remote_is_a_deploy_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let action = action_with_artifacts(temp.path(), None);
        let err = target().deploy(&action).expect_err("no remote");
        assert!(err.to_string().contains("no deploy remote"));
    }

    #[test]
    fn pushes_new_branch_then_only_real_changes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let remote = init_bare_remote(&temp.path().join("remote.git")).expect("remote");
        let remote_url = remote.to_string_lossy().to_string();
        let action = action_with_artifacts(temp.path(), Some(remote_url.clone()));

        target().deploy(&action).expect("first deploy");
        let log = git_output(&remote, &["log", "--format=%s", "release"]).expect("log");
        assert_eq!(log.trim(), "deploy svc");
        let files = git_output(&remote, &["ls-tree", "-r", "--name-only", "release"]).expect("ls");
        assert_eq!(files.trim(), "dist/index.js");

        // Unchanged artifacts do not produce a new commit.
        target().deploy(&action).expect("second deploy");
        let log = git_output(&remote, &["log", "--format=%s", "release"]).expect("log");
        assert_eq!(log.lines().count(), 1);

        // Changed artifacts replace the tree and keep history.
        let artifacts = action.artifact_dir().to_path_buf();
        fs::remove_dir_all(artifacts.join("dist")).expect("rm");
        fs::write(artifacts.join("main.js"), "v2").expect("write");
        target().deploy(&action).expect("third deploy");
        let log = git_output(&remote, &["log", "--format=%s", "release"]).expect("log");
        assert_eq!(log.lines().count(), 2);
        let files = git_output(&remote, &["ls-tree", "-r", "--name-only", "release"]).expect("ls");
        assert_eq!(files.trim(), "main.js");
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_recreates_symlinks() {
        let src = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(src.path().join("assets/v1")).expect("mkdir");
        fs::write(src.path().join("assets/v1/app.js"), "v1").expect("write");
        std::os::unix::fs::symlink("v1", src.path().join("assets/current")).expect("dir link");
        std::os::unix::fs::symlink("assets/v1/app.js", src.path().join("app.js"))
            .expect("file link");

        let dest = tempfile::tempdir().expect("tempdir");
        copy_tree(src.path(), dest.path()).expect("copy");

        let current = dest.path().join("assets/current");
        assert!(current.symlink_metadata().expect("meta").file_type().is_symlink());
        assert_eq!(fs::read_link(&current).expect("link"), Path::new("v1"));
        assert_eq!(
            fs::read_to_string(dest.path().join("app.js")).expect("read"),
            "v1"
        );
    }

    #[test]
    fn copy_tree_skips_nested_git_dirs() {
        let repo = TestRepo::new().expect("repo");
        repo.write("a/file.txt", "x").expect("write");
        let dest = tempfile::tempdir().expect("tempdir");
        copy_tree(repo.path(), dest.path()).expect("copy");
        assert!(dest.path().join("a/file.txt").is_file());
        assert!(!dest.path().join(".git").exists());
    }
}
