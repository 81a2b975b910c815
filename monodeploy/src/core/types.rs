//! Shared deterministic types for the selection and run core.
//!
//! These types define stable contracts between the selector, the orchestrator
//! and the reporting layer. They hold no I/O handles.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::path::normalize_relative;

/// Set of changed paths, relative to the working directory.
///
/// Duplicates collapse and iteration is lexicographic, so selection and
/// "first match" reporting are reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedFiles {
    paths: BTreeSet<String>,
}

impl ChangedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw path, normalizing it first. Empty paths are ignored.
    pub fn insert(&mut self, raw: &str) -> bool {
        match normalize_relative(raw) {
            Some(path) => self.paths.insert(path),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ChangedFiles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut files = Self::new();
        for path in iter {
            files.insert(path.as_ref());
        }
        files
    }
}

/// Per-action outcome within one run.
///
/// Transitions only move forward: `Pending` to a build result, and
/// `BuildSucceeded` to a deploy result. Everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NotSelected,
    Pending,
    BuildSucceeded,
    BuildFailed,
    DeploySkipped,
    DeploySucceeded,
    DeployFailed,
    /// Not attempted (or not finished) because the run deadline passed.
    Aborted,
}

impl Outcome {
    pub fn can_advance_to(self, next: Outcome) -> bool {
        matches!(
            (self, next),
            (
                Outcome::Pending,
                Outcome::BuildSucceeded | Outcome::BuildFailed | Outcome::Aborted
            ) | (
                Outcome::BuildSucceeded,
                Outcome::DeploySkipped
                    | Outcome::DeploySucceeded
                    | Outcome::DeployFailed
                    | Outcome::Aborted
            )
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Outcome::BuildFailed | Outcome::DeployFailed | Outcome::Aborted
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Pending | Outcome::BuildSucceeded)
    }
}

/// Overall verdict for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No action was affected by the changed files.
    NoOp,
    Success,
    Failure,
}

impl RunStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, RunStatus::Failure)
    }
}

/// Recorded outcome and timing for one catalog action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub name: String,
    pub outcome: Outcome,
    /// First changed file that caused the action to be selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionReport {
    pub fn not_selected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::NotSelected,
            matched: None,
            build_ms: None,
            deploy_ms: None,
            error: None,
        }
    }

    pub fn pending(name: impl Into<String>, matched: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Pending,
            matched: Some(matched.into()),
            ..Self::not_selected(name)
        }
    }

    /// Move to `next`. Backward or sideways transitions are a logic error.
    pub fn advance(&mut self, next: Outcome) {
        debug_assert!(
            self.outcome.can_advance_to(next),
            "invalid outcome transition {:?} -> {:?} for {}",
            self.outcome,
            next,
            self.name
        );
        self.outcome = next;
    }

    pub fn was_selected(&self) -> bool {
        self.outcome != Outcome::NotSelected
    }
}

/// Everything one run produced, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// RFC 3339 timestamp of the run start.
    pub started_at: String,
    pub status: RunStatus,
    pub elapsed_ms: u64,
    pub changed: ChangedFiles,
    pub actions: Vec<ActionReport>,
}

impl RunReport {
    pub fn action(&self, name: &str) -> Option<&ActionReport> {
        self.actions.iter().find(|report| report.name == name)
    }

    pub fn selected(&self) -> impl Iterator<Item = &ActionReport> {
        self.actions.iter().filter(|report| report.was_selected())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ActionReport> {
        self.actions
            .iter()
            .filter(|report| report.outcome.is_failure())
    }
}

/// Fold per-action reports into the run verdict.
pub fn aggregate_status(reports: &[ActionReport]) -> RunStatus {
    if !reports.iter().any(ActionReport::was_selected) {
        return RunStatus::NoOp;
    }
    if reports.iter().any(|report| report.outcome.is_failure()) {
        return RunStatus::Failure;
    }
    RunStatus::Success
}

pub fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
