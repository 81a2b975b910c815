//! Git adapter used for change detection and artifact publishing.
//!
//! A small, explicit wrapper around `git` subprocess calls keeps the exact
//! commands visible and easy to reproduce by hand.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Identity used for deploy commits when the repository has none configured.
const FALLBACK_NAME: &str = "monodeploy";
const FALLBACK_EMAIL: &str = "monodeploy@localhost";

/// Git's well-known empty tree; diffing against it lists every tracked file.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Parsed `git status --porcelain -z` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file, relative to the repository root.
    pub path: String,
    /// Source path of a rename or copy.
    pub from: Option<String>,
}

impl StatusEntry {
    /// Every path the entry touches.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str()).chain(self.from.as_deref())
    }
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Path of the working directory relative to the repository root, with a
    /// trailing `/` (empty at the root).
    pub fn show_prefix(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--show-prefix"])?;
        Ok(out.trim().to_string())
    }

    /// True if `rev` names a commit in this repository.
    pub fn resolves(&self, rev: &str) -> Result<bool> {
        let spec = format!("{rev}^{{commit}}");
        let out = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        Ok(out.status.success())
    }

    /// Files changed between `base` and `HEAD`, relative to the repository root.
    ///
    /// Renames are split into a deletion and an addition so both sides count.
    #[instrument(skip_all, fields(base = %base))]
    pub fn diff_names(&self, base: &str) -> Result<Vec<String>> {
        let out = self.run_capture(&["diff", "--name-only", "-z", "--no-renames", base, "HEAD"])?;
        let names: Vec<String> = out
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = names.len(), "committed changes");
        Ok(names)
    }

    /// Staged, unstaged and untracked entries, NUL-separated so paths come
    /// back verbatim.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out =
            self.run_capture(&["status", "--porcelain=v1", "-z", "-uall", "--no-renames"])?;
        parse_status_records(&out)
    }

    /// Shallow-clone `branch` of `remote` into `dest`.
    ///
    /// Returns `Ok(false)` when the remote has no such branch, so callers can
    /// start the branch from scratch.
    #[instrument(skip_all, fields(branch = %branch))]
    pub fn clone_branch(remote: &str, branch: &str, dest: &Path) -> Result<bool> {
        let probe = Self::new(dest);
        let heads = probe.run_capture(&["ls-remote", "--heads", remote, branch])?;
        if heads.trim().is_empty() {
            debug!(remote, branch, "remote branch missing");
            return Ok(false);
        }
        let dest_arg = dest.to_string_lossy();
        probe.run_checked(&[
            "clone",
            "--quiet",
            "--depth",
            "1",
            "--branch",
            branch,
            remote,
            dest_arg.as_ref(),
        ])?;
        Ok(true)
    }

    /// Initialize a repository whose first commit will land on `branch`.
    pub fn init_on_branch(&self, branch: &str) -> Result<()> {
        self.run_checked(&["init", "--quiet"])?;
        let head = format!("refs/heads/{branch}");
        self.run_checked(&["symbolic-ref", "HEAD", &head])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        let mut args: Vec<String> = self.identity_overrides()?;
        args.extend(["commit", "--quiet", "-m", message].map(str::to_string));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_checked(&args)?;
        Ok(true)
    }

    /// Push the current `HEAD` to `branch` on `remote`.
    #[instrument(skip_all, fields(branch = %branch))]
    pub fn push_head(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.run_checked(&["push", "--quiet", remote, &refspec])?;
        Ok(())
    }

    fn identity_overrides(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        if !self.config_is_set("user.name")? {
            args.push("-c".to_string());
            args.push(format!("user.name={FALLBACK_NAME}"));
        }
        if !self.config_is_set("user.email")? {
            args.push("-c".to_string());
            args.push(format!("user.email={FALLBACK_EMAIL}"));
        }
        Ok(args)
    }

    fn config_is_set(&self, key: &str) -> Result<bool> {
        let out = self.run(&["config", "--get", key])?;
        Ok(out.status.success() && !out.stdout.trim_ascii().is_empty())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if self.workdir.is_dir() {
            cmd.current_dir(&self.workdir);
        }
        cmd.output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

/// Parse `--porcelain=v1 -z` output: `XY path\0`, with a second
/// `source\0` record after renames and copies.
fn parse_status_records(out: &str) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut records = out.split('\0').filter(|record| !record.is_empty());
    while let Some(record) = records.next() {
        let (code, rest) = record
            .split_at_checked(2)
            .filter(|(_, rest)| rest.len() > 1 && rest.starts_with(' '))
            .ok_or_else(|| anyhow!("unexpected porcelain record: '{record}'"))?;
        let from = if code.contains(|c: char| c == 'R' || c == 'C') {
            let source = records
                .next()
                .ok_or_else(|| anyhow!("rename record without source: '{record}'"))?;
            Some(source.to_string())
        } else {
            None
        };
        entries.push(StatusEntry {
            code: code.to_string(),
            path: rest[1..].to_string(),
            from,
        });
    }
    Ok(entries)
}
