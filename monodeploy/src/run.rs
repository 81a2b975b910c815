//! Orchestration for one `monodeploy deploy` run.
//!
//! A run resets the output directory, discovers actions and changed files,
//! selects the affected actions, then builds and deploys each one. Failures
//! in the shared preparation steps abort the run with an error; failures of a
//! single action are recorded in its report and the run moves on.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::action::Action;
use crate::core::selector::{Selected, select};
use crate::core::types::{ActionReport, Outcome, RunReport, RunStatus, aggregate_status, millis};
use crate::io::changes::ChangeSource;
use crate::io::deploy::DeployTarget;
use crate::io::output::{reset_output_dir, top_level_entries};
use crate::io::workspace::ActionCatalog;

/// Inputs for a single run, threaded explicitly instead of read from
/// process-wide state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workdir: PathBuf,
    pub output_dir: PathBuf,
    /// Build only; never call the deploy target.
    pub skip_deploy: bool,
    /// Builds allowed to run at once. `1` keeps the run fully sequential.
    pub jobs: usize,
    /// Actions not yet started when this passes are marked aborted.
    pub deadline: Option<Instant>,
}

impl RunConfig {
    pub fn new(workdir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            output_dir: output_dir.into(),
            skip_deploy: false,
            jobs: 1,
            deadline: None,
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Progress notifications emitted during a run, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RunStarted {
        workdir: PathBuf,
        output_dir: PathBuf,
    },
    ActionsDiscovered {
        names: Vec<String>,
    },
    ChangesDetected {
        files: Vec<String>,
    },
    ActionSelected {
        name: String,
        matched: String,
    },
    NothingToDo,
    BuildStarted {
        name: String,
    },
    BuildSucceeded {
        name: String,
        elapsed: Duration,
    },
    BuildFailed {
        name: String,
        elapsed: Duration,
        error: String,
    },
    DeploySkipped {
        name: String,
    },
    DeployStarted {
        name: String,
    },
    DeploySucceeded {
        name: String,
        elapsed: Duration,
    },
    DeployFailed {
        name: String,
        elapsed: Duration,
        error: String,
    },
    ActionAborted {
        name: String,
    },
    RunCompleted {
        status: RunStatus,
        elapsed: Duration,
    },
}

/// Result of one build, collected before it is recorded.
enum BuildRun {
    Aborted,
    Finished(Result<()>, Duration),
}

/// Execute a full run.
///
/// Returns `Err` only for run-level failures: output directory reset, action
/// discovery, or change detection. Per-action build and deploy failures are
/// reported in the returned [`RunReport`].
#[instrument(skip_all, fields(workdir = %config.workdir.display(), skip_deploy = config.skip_deploy))]
pub fn run_deploy<C, S, D, F>(
    config: &RunConfig,
    catalog: &C,
    changes: &S,
    deployer: &D,
    mut on_event: F,
) -> Result<RunReport>
where
    C: ActionCatalog,
    C::Action: Sync,
    S: ChangeSource,
    D: DeployTarget,
    F: FnMut(&RunEvent),
{
    if config.jobs == 0 {
        bail!("jobs must be > 0");
    }
    let started = Instant::now();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    info!(output_dir = %config.output_dir.display(), "run started");
    on_event(&RunEvent::RunStarted {
        workdir: config.workdir.clone(),
        output_dir: config.output_dir.clone(),
    });

    reset_output_dir(&config.output_dir).context("prepare output directory")?;

    let actions = catalog
        .collect_actions(&config.workdir, &config.output_dir)
        .context("collect actions")?;
    on_event(&RunEvent::ActionsDiscovered {
        names: actions.iter().map(|a| a.name().to_string()).collect(),
    });

    let changed = changes
        .changed_files(&config.workdir)
        .context("collect changed files")?;
    info!(
        actions = actions.len(),
        changed = changed.len(),
        "discovery complete"
    );
    on_event(&RunEvent::ChangesDetected {
        files: changed.iter().map(str::to_string).collect(),
    });

    let selected = select(&actions, &changed);
    let mut reports: Vec<ActionReport> = actions
        .iter()
        .map(|action| ActionReport::not_selected(action.name()))
        .collect();
    for pick in &selected {
        let name = actions[pick.index].name();
        debug!(action = name, matched = %pick.matched, "action selected");
        reports[pick.index] = ActionReport::pending(name, pick.matched.clone());
        on_event(&RunEvent::ActionSelected {
            name: name.to_string(),
            matched: pick.matched.clone(),
        });
    }

    let mut exec = Execution {
        config,
        deployer,
        on_event: &mut on_event,
    };
    if selected.is_empty() {
        warn!("no actions affected by the changed files");
        (exec.on_event)(&RunEvent::NothingToDo);
    } else if config.jobs > 1 && selected.len() > 1 {
        exec.run_parallel(&actions, &selected, &mut reports)?;
    } else {
        exec.run_sequential(&actions, &selected, &mut reports);
    }

    let status = aggregate_status(&reports);
    let elapsed = started.elapsed();
    info!(?status, elapsed_ms = millis(elapsed), "run completed");
    on_event(&RunEvent::RunCompleted { status, elapsed });

    Ok(RunReport {
        started_at,
        status,
        elapsed_ms: millis(elapsed),
        changed,
        actions: reports,
    })
}

struct Execution<'a, D, F> {
    config: &'a RunConfig,
    deployer: &'a D,
    on_event: &'a mut F,
}

impl<D, F> Execution<'_, D, F>
where
    D: DeployTarget,
    F: FnMut(&RunEvent),
{
    fn run_sequential<A: Action>(
        &mut self,
        actions: &[A],
        selected: &[Selected],
        reports: &mut [ActionReport],
    ) {
        for pick in selected {
            let action = &actions[pick.index];
            let report = &mut reports[pick.index];
            if self.config.deadline_passed() {
                self.abort(report);
                continue;
            }
            (self.on_event)(&RunEvent::BuildStarted {
                name: action.name().to_string(),
            });
            let start = Instant::now();
            let result = self.build_isolated(action);
            if self.record_build(report, result, start.elapsed()) {
                self.deploy_phase(action, report);
            }
        }
    }

    /// Build on a scoped worker pool, then record and deploy in selection
    /// order so events and reports match a sequential run.
    ///
    /// Concurrent builds share the output directory, so a stray top-level
    /// entry cannot be pinned on one build. When one shows up, the output
    /// directory is reset and every build is redone sequentially, where the
    /// per-build check applies.
    fn run_parallel<A: Action + Sync>(
        &mut self,
        actions: &[A],
        selected: &[Selected],
        reports: &mut [ActionReport],
    ) -> Result<()> {
        let config = self.config;
        let Ok(before) = top_level_entries(&config.output_dir) else {
            warn!("cannot snapshot output directory, building sequentially");
            self.run_sequential(actions, selected, reports);
            return Ok(());
        };

        let cursor = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<BuildRun>>> =
            Mutex::new((0..selected.len()).map(|_| None).collect());
        let workers = config.jobs.min(selected.len());
        debug!(workers, "building in parallel");

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let slot = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(pick) = selected.get(slot) else {
                            break;
                        };
                        let run = if config.deadline_passed() {
                            BuildRun::Aborted
                        } else {
                            let start = Instant::now();
                            let result = actions[pick.index].build();
                            BuildRun::Finished(result, start.elapsed())
                        };
                        let mut guard = slots.lock().unwrap_or_else(|p| p.into_inner());
                        guard[slot] = Some(run);
                    }
                });
            }
        });

        let own: BTreeSet<&str> = selected
            .iter()
            .map(|pick| actions[pick.index].name())
            .collect();
        let stray: Vec<String> = match top_level_entries(&config.output_dir) {
            Ok(after) => after
                .difference(&before)
                .filter(|entry| !own.contains(entry.as_str()))
                .cloned()
                .collect(),
            Err(err) => vec![format!("<unreadable: {err:#}>")],
        };
        if !stray.is_empty() {
            warn!(
                stray = %stray.join(", "),
                "parallel builds wrote outside their output directories, rebuilding sequentially"
            );
            reset_output_dir(&config.output_dir)
                .context("reset output directory for sequential rebuild")?;
            self.run_sequential(actions, selected, reports);
            return Ok(());
        }

        let runs = slots.into_inner().unwrap_or_else(|p| p.into_inner());
        for (pick, run) in selected.iter().zip(runs) {
            let action = &actions[pick.index];
            let report = &mut reports[pick.index];
            match run {
                Some(BuildRun::Finished(result, elapsed)) => {
                    (self.on_event)(&RunEvent::BuildStarted {
                        name: action.name().to_string(),
                    });
                    if self.record_build(report, result, elapsed) {
                        self.deploy_phase(action, report);
                    }
                }
                Some(BuildRun::Aborted) | None => self.abort(report),
            }
        }
        Ok(())
    }

    /// Build `action`, failing it if new entries show up in the output
    /// directory beside its own artifact directory.
    fn build_isolated<A: Action>(&self, action: &A) -> Result<()> {
        let output_dir = &self.config.output_dir;
        let before = top_level_entries(output_dir)?;
        action.build()?;
        let after = top_level_entries(output_dir)?;
        let stray: Vec<&str> = after
            .difference(&before)
            .map(String::as_str)
            .filter(|entry| *entry != action.name())
            .collect();
        if !stray.is_empty() {
            bail!(
                "build wrote outside its output directory: {}",
                stray.join(", ")
            );
        }
        Ok(())
    }

    /// Record a build result. Returns true when the build succeeded.
    fn record_build(
        &mut self,
        report: &mut ActionReport,
        result: Result<()>,
        elapsed: Duration,
    ) -> bool {
        report.build_ms = Some(millis(elapsed));
        let name = report.name.clone();
        match result {
            Ok(()) => {
                info!(action = %name, elapsed_ms = millis(elapsed), "build succeeded");
                report.advance(Outcome::BuildSucceeded);
                (self.on_event)(&RunEvent::BuildSucceeded { name, elapsed });
                true
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(action = %name, error = %message, "build failed");
                report.advance(Outcome::BuildFailed);
                report.error = Some(message.clone());
                (self.on_event)(&RunEvent::BuildFailed {
                    name,
                    elapsed,
                    error: message,
                });
                false
            }
        }
    }

    fn deploy_phase<A: Action>(&mut self, action: &A, report: &mut ActionReport) {
        let name = action.name().to_string();
        if self.config.skip_deploy {
            debug!(action = %name, "skipping deploy");
            report.advance(Outcome::DeploySkipped);
            (self.on_event)(&RunEvent::DeploySkipped { name });
            return;
        }
        if self.config.deadline_passed() {
            self.abort(report);
            return;
        }

        (self.on_event)(&RunEvent::DeployStarted { name: name.clone() });
        let start = Instant::now();
        let result = self.deployer.deploy(action);
        let elapsed = start.elapsed();
        report.deploy_ms = Some(millis(elapsed));
        match result {
            Ok(()) => {
                info!(action = %name, elapsed_ms = millis(elapsed), "deploy succeeded");
                report.advance(Outcome::DeploySucceeded);
                (self.on_event)(&RunEvent::DeploySucceeded { name, elapsed });
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(action = %name, error = %message, "deploy failed");
                report.advance(Outcome::DeployFailed);
                report.error = Some(message.clone());
                (self.on_event)(&RunEvent::DeployFailed {
                    name,
                    elapsed,
                    error: message,
                });
            }
        }
    }

    fn abort(&mut self, report: &mut ActionReport) {
        warn!(action = %report.name, "deadline passed, action aborted");
        report.advance(Outcome::Aborted);
        (self.on_event)(&RunEvent::ActionAborted {
            name: report.name.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChangedFiles;
    use crate::test_support::{
        FailingChangeSource, FakeAction, FakeCatalog, FixedChangeSource, RecordingDeployTarget,
        event_label,
    };

    fn config(root: &std::path::Path) -> RunConfig {
        RunConfig::new(root, root.join("build"))
    }

    fn services() -> FakeCatalog {
        FakeCatalog::new(vec![
            FakeAction::owning("service-a", &["services/a/**"]),
            FakeAction::owning("service-b", &["services/b/**"]),
        ])
    }

    #[test]
    fn builds_and_deploys_only_affected_actions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = services();
        let changes = FixedChangeSource::new(&["services/a/main.txt"]);
        let deployer = RecordingDeployTarget::default();

        let report = run_deploy(&config(temp.path()), &catalog, &changes, &deployer, |_| {})
            .expect("run");

        assert_eq!(report.status, RunStatus::Success);
        let a = report.action("service-a").expect("a");
        assert_eq!(a.outcome, Outcome::DeploySucceeded);
        assert_eq!(a.matched.as_deref(), Some("services/a/main.txt"));
        assert!(a.build_ms.is_some() && a.deploy_ms.is_some());
        assert_eq!(
            report.action("service-b").expect("b").outcome,
            Outcome::NotSelected
        );
        assert_eq!(deployer.deployed(), vec!["service-a"]);
        assert_eq!(catalog.build_count("service-b"), 0);
    }

    #[test]
    fn build_failure_does_not_block_other_actions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = FakeCatalog::new(vec![
            FakeAction::owning("service-a", &["services/a/**"]).failing_build("compile error"),
            FakeAction::owning("service-b", &["services/b/**"]),
        ]);
        let changes = FixedChangeSource::new(&["services/a/x", "services/b/y"]);
        let deployer = RecordingDeployTarget::default();

        let report = run_deploy(&config(temp.path()), &catalog, &changes, &deployer, |_| {})
            .expect("run");

        assert_eq!(report.status, RunStatus::Failure);
        let a = report.action("service-a").expect("a");
        assert_eq!(a.outcome, Outcome::BuildFailed);
        assert!(a.error.as_deref().is_some_and(|e| e.contains("compile error")));
        assert_eq!(a.deploy_ms, None);
        assert_eq!(
            report.action("service-b").expect("b").outcome,
            Outcome::DeploySucceeded
        );
        assert_eq!(deployer.deployed(), vec!["service-b"]);
    }

    #[test]
    fn deploy_failure_is_recorded_and_run_continues() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = services();
        let changes = FixedChangeSource::new(&["services/a/x", "services/b/y"]);
        let deployer = RecordingDeployTarget::failing_for(&["service-a"]);

        let report = run_deploy(&config(temp.path()), &catalog, &changes, &deployer, |_| {})
            .expect("run");

        assert_eq!(report.status, RunStatus::Failure);
        assert_eq!(
            report.action("service-a").expect("a").outcome,
            Outcome::DeployFailed
        );
        assert_eq!(
            report.action("service-b").expect("b").outcome,
            Outcome::DeploySucceeded
        );
        assert_eq!(deployer.attempted(), vec!["service-a", "service-b"]);
    }

    #[test]
    fn skip_deploy_never_calls_the_target() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = services();
        let changes = FixedChangeSource::new(&["services/a/x", "services/b/y"]);
        let deployer = RecordingDeployTarget::default();
        let mut cfg = config(temp.path());
        cfg.skip_deploy = true;

        let report = run_deploy(&cfg, &catalog, &changes, &deployer, |_| {}).expect("run");

        assert_eq!(report.status, RunStatus::Success);
        assert!(
            report
                .selected()
                .all(|r| r.outcome == Outcome::DeploySkipped)
        );
        assert!(deployer.attempted().is_empty());
    }

    #[test]
    fn empty_change_set_is_noop_but_still_resets_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = config(temp.path());
        std::fs::create_dir_all(cfg.output_dir.join("stale")).expect("mkdir");
        let catalog = services();
        let changes = FixedChangeSource::new(&[]);
        let deployer = RecordingDeployTarget::default();
        let mut labels = Vec::new();

        let report = run_deploy(&cfg, &catalog, &changes, &deployer, |event| {
            labels.push(event_label(event));
        })
        .expect("run");

        assert_eq!(report.status, RunStatus::NoOp);
        assert!(report.status.is_success());
        assert!(!cfg.output_dir.join("stale").exists());
        assert!(cfg.output_dir.is_dir());
        assert_eq!(catalog.total_builds(), 0);
        assert!(deployer.attempted().is_empty());
        assert!(labels.contains(&"nothing_to_do".to_string()));
    }

    #[test]
    fn discovery_failures_are_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = services();
        let deployer = RecordingDeployTarget::default();

        let err = run_deploy(
            &config(temp.path()),
            &catalog,
            &FailingChangeSource,
            &deployer,
            |_| {},
        )
        .expect_err("fatal");
        assert!(format!("{err:#}").contains("collect changed files"));
        assert_eq!(catalog.total_builds(), 0);

        let err = run_deploy(
            &config(temp.path()),
            &FakeCatalog::failing(),
            &FixedChangeSource::new(&["x"]),
            &deployer,
            |_| {},
        )
        .expect_err("fatal");
        assert!(format!("{err:#}").contains("collect actions"));
    }

    #[test]
    fn uncreatable_output_dir_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "not a dir").expect("write");
        let cfg = RunConfig::new(temp.path(), blocker.join("build"));
        let catalog = services();

        let err = run_deploy(
            &cfg,
            &catalog,
            &FixedChangeSource::new(&["services/a/x"]),
            &RecordingDeployTarget::default(),
            |_| {},
        )
        .expect_err("fatal");
        assert!(format!("{err:#}").contains("prepare output directory"));
        assert_eq!(catalog.total_builds(), 0);
    }

    #[test]
    fn events_follow_selection_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = FakeCatalog::new(vec![
            FakeAction::owning("a", &["a"]),
            FakeAction::owning("b", &["b"]).failing_build("nope"),
            FakeAction::owning("c", &["c"]),
        ]);
        let changes = FixedChangeSource::new(&["c/1", "b/1", "a/1"]);
        let deployer = RecordingDeployTarget::default();
        let mut labels = Vec::new();

        run_deploy(&config(temp.path()), &catalog, &changes, &deployer, |event| {
            labels.push(event_label(event));
        })
        .expect("run");

        assert_eq!(
            labels,
            vec![
                "run_started",
                "actions_discovered:a,b,c",
                "changes_detected:3",
                "selected:a",
                "selected:b",
                "selected:c",
                "build_started:a",
                "build_succeeded:a",
                "deploy_started:a",
                "deploy_succeeded:a",
                "build_started:b",
                "build_failed:b",
                "build_started:c",
                "build_succeeded:c",
                "deploy_started:c",
                "deploy_succeeded:c",
                "run_completed:failure",
            ]
        );
    }

    #[test]
    fn parallel_builds_match_sequential_results() {
        let temp = tempfile::tempdir().expect("tempdir");
        let make_catalog = || {
            FakeCatalog::new(vec![
                FakeAction::owning("a", &["a"]),
                FakeAction::owning("b", &["b"]).failing_build("broken"),
                FakeAction::owning("c", &["c"]),
                FakeAction::owning("d", &["d"]),
                FakeAction::owning("e", &["e"]).writing_outside("not-mine"),
            ])
        };
        let changes = FixedChangeSource::new(&["a/1", "b/1", "c/1", "d/1", "e/1"]);

        let mut seq_labels = Vec::new();
        let sequential = run_deploy(
            &config(temp.path()),
            &make_catalog(),
            &changes,
            &RecordingDeployTarget::default(),
            |event| seq_labels.push(event_label(event)),
        )
        .expect("sequential");

        let mut par_labels = Vec::new();
        let mut cfg = config(temp.path());
        cfg.jobs = 3;
        let deployer = RecordingDeployTarget::default();
        let parallel = run_deploy(&cfg, &make_catalog(), &changes, &deployer, |event| {
            par_labels.push(event_label(event))
        })
        .expect("parallel");

        let outcomes = |report: &RunReport| -> Vec<(String, Outcome)> {
            report
                .actions
                .iter()
                .map(|r| (r.name.clone(), r.outcome))
                .collect()
        };
        assert_eq!(outcomes(&sequential), outcomes(&parallel));
        assert_eq!(sequential.status, parallel.status);
        assert_eq!(seq_labels, par_labels);
        assert_eq!(deployer.deployed(), vec!["a", "c", "d"]);
    }

    #[test]
    fn parallel_builds_fail_actions_writing_outside_their_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = FakeCatalog::new(vec![
            FakeAction::owning("a", &["a"]).writing_outside("not-mine"),
            FakeAction::owning("b", &["b"]),
        ]);
        let changes = FixedChangeSource::new(&["a/1", "b/1"]);
        let mut cfg = config(temp.path());
        cfg.jobs = 2;
        let deployer = RecordingDeployTarget::default();

        let report = run_deploy(&cfg, &catalog, &changes, &deployer, |_| {}).expect("run");

        assert_eq!(report.status, RunStatus::Failure);
        assert_eq!(report.action("a").expect("a").outcome, Outcome::BuildFailed);
        assert_eq!(
            report.action("b").expect("b").outcome,
            Outcome::DeploySucceeded
        );
        assert_eq!(deployer.deployed(), vec!["b"]);
        // Parallel attempt plus the sequential rebuild.
        assert_eq!(catalog.build_count("a"), 2);
    }

    #[test]
    fn passed_deadline_aborts_remaining_actions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = services();
        let changes = FixedChangeSource::new(&["services/a/x", "services/b/y"]);
        let deployer = RecordingDeployTarget::default();
        let mut cfg = config(temp.path());
        cfg.deadline = Some(Instant::now());

        let report = run_deploy(&cfg, &catalog, &changes, &deployer, |_| {}).expect("run");

        assert_eq!(report.status, RunStatus::Failure);
        assert!(report.selected().all(|r| r.outcome == Outcome::Aborted));
        assert_eq!(report.failed().count(), 2);
        assert_eq!(catalog.total_builds(), 0);
    }

    #[test]
    fn stray_output_fails_the_offending_build() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = FakeCatalog::new(vec![
            FakeAction::owning("a", &["a"]).writing_outside("not-mine"),
            FakeAction::owning("b", &["b"]),
        ]);
        let changes = FixedChangeSource::new(&["a/1", "b/1"]);

        let report = run_deploy(
            &config(temp.path()),
            &catalog,
            &changes,
            &RecordingDeployTarget::default(),
            |_| {},
        )
        .expect("run");

        let a = report.action("a").expect("a");
        assert_eq!(a.outcome, Outcome::BuildFailed);
        assert!(
            a.error
                .as_deref()
                .is_some_and(|e| e.contains("outside its output directory"))
        );
        assert_eq!(
            report.action("b").expect("b").outcome,
            Outcome::DeploySucceeded
        );
    }

    #[test]
    fn report_lists_changed_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let report = run_deploy(
            &config(temp.path()),
            &services(),
            &FixedChangeSource::new(&["README.md", "./README.md"]),
            &RecordingDeployTarget::default(),
            |_| {},
        )
        .expect("run");
        let expected: ChangedFiles = ["README.md"].into_iter().collect();
        assert_eq!(report.changed, expected);
        assert_eq!(report.status, RunStatus::NoOp);
    }
}
