//! Change detection: which files does this run consider modified?

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::types::ChangedFiles;
use crate::io::git::{EMPTY_TREE, Git};

/// Source of the changed-file set for a run.
pub trait ChangeSource {
    /// Changed paths relative to `workdir`, each at most once.
    fn changed_files(&self, workdir: &Path) -> Result<ChangedFiles>;
}

/// Change source backed by the git history of the working directory.
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    /// Revision `HEAD` is compared against.
    pub base: String,
    /// Include staged, unstaged and untracked files. Renames count on both
    /// sides.
    pub include_uncommitted: bool,
}

impl ChangeSource for GitChangeSource {
    #[instrument(skip_all, fields(base = %self.base))]
    fn changed_files(&self, workdir: &Path) -> Result<ChangedFiles> {
        let git = Git::new(workdir);
        let prefix = git
            .show_prefix()
            .context("locate working directory in git repository")?;

        let base = if git.resolves(&self.base)? {
            self.base.as_str()
        } else {
            // A first commit has no parent; treat every tracked file as changed.
            warn!(base = %self.base, "base revision not found, diffing against the empty tree");
            EMPTY_TREE
        };

        let mut repo_paths = git
            .diff_names(base)
            .with_context(|| format!("diff {} against HEAD", self.base))?;
        if self.include_uncommitted {
            let entries = git.status_porcelain().context("read worktree status")?;
            for entry in &entries {
                repo_paths.extend(entry.paths().map(str::to_string));
            }
        }

        let mut files = ChangedFiles::new();
        for path in &repo_paths {
            if let Some(relative) = reroot(path, &prefix) {
                files.insert(relative);
            }
        }
        debug!(
            repo_changes = repo_paths.len(),
            workdir_changes = files.len(),
            "changed files collected"
        );
        Ok(files)
    }
}

/// Re-root a repository-relative path onto the working directory.
///
/// Returns `None` for paths outside the working directory.
fn reroot<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn reroot_strips_prefix_and_drops_outsiders() {
        assert_eq!(reroot("apps/a/x.rs", "apps/"), Some("a/x.rs"));
        assert_eq!(reroot("libs/y.rs", "apps/"), None);
        assert_eq!(reroot("libs/y.rs", ""), Some("libs/y.rs"));
    }

    #[test]
    fn reports_last_commit_and_worktree_changes() {
        let repo = TestRepo::new().expect("repo");
        repo.write("services/a/main.txt", "one").expect("write");
        repo.write("services/b/main.txt", "one").expect("write");
        repo.commit_all("initial").expect("commit");
        repo.write("services/a/main.txt", "two").expect("write");
        repo.commit_all("change a").expect("commit");
        repo.write("services/b/new.txt", "untracked").expect("write");

        let committed_only = GitChangeSource {
            base: "HEAD~1".to_string(),
            include_uncommitted: false,
        };
        let files = committed_only.changed_files(repo.path()).expect("changes");
        assert_eq!(files.iter().collect::<Vec<_>>(), vec!["services/a/main.txt"]);

        let with_worktree = GitChangeSource {
            base: "HEAD~1".to_string(),
            include_uncommitted: true,
        };
        let files = with_worktree.changed_files(repo.path()).expect("changes");
        assert_eq!(
            files.iter().collect::<Vec<_>>(),
            vec!["services/a/main.txt", "services/b/new.txt"]
        );
    }

    #[test]
    fn first_commit_counts_every_file() {
        let repo = TestRepo::new().expect("repo");
        repo.write("a.txt", "a").expect("write");
        repo.write("dir/b.txt", "b").expect("write");
        repo.commit_all("initial").expect("commit");

        let source = GitChangeSource {
            base: "HEAD~1".to_string(),
            include_uncommitted: false,
        };
        let files = source.changed_files(repo.path()).expect("changes");
        assert_eq!(files.iter().collect::<Vec<_>>(), vec!["a.txt", "dir/b.txt"]);
    }

    #[test]
    fn subdirectory_workdir_sees_relative_paths() {
        let repo = TestRepo::new().expect("repo");
        repo.write("apps/a/x.txt", "1").expect("write");
        repo.write("other/y.txt", "1").expect("write");
        repo.commit_all("initial").expect("commit");
        repo.write("apps/a/x.txt", "2").expect("write");
        repo.write("other/y.txt", "2").expect("write");
        repo.commit_all("change").expect("commit");

        let source = GitChangeSource {
            base: "HEAD~1".to_string(),
            include_uncommitted: false,
        };
        let files = source
            .changed_files(&repo.path().join("apps"))
            .expect("changes");
        assert_eq!(files.iter().collect::<Vec<_>>(), vec!["a/x.txt"]);
    }

    #[test]
    fn non_ascii_names_match_their_owner() {
        let repo = TestRepo::new().expect("repo");
        repo.write("services/a/main.txt", "one").expect("write");
        repo.commit_all("initial").expect("commit");
        repo.write("services/a/café.txt", "new").expect("write");
        repo.commit_all("add accented file").expect("commit");

        let source = GitChangeSource {
            base: "HEAD~1".to_string(),
            include_uncommitted: false,
        };
        let files = source.changed_files(repo.path()).expect("changes");
        assert_eq!(files.iter().collect::<Vec<_>>(), vec!["services/a/café.txt"]);

        let service_a = crate::test_support::FakeAction::owning("service-a", &["services/a/**"]);
        let selected = crate::core::selector::select(&[service_a], &files);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn staged_rename_counts_both_sides() {
        let repo = TestRepo::new().expect("repo");
        repo.write("services/a/lib.txt", "shared").expect("write");
        repo.write("services/b/main.txt", "b").expect("write");
        repo.commit_all("initial").expect("commit");
        crate::test_support::git_output(
            repo.path(),
            &["mv", "services/a/lib.txt", "services/b/lib.txt"],
        )
        .expect("git mv");

        let source = GitChangeSource {
            base: "HEAD".to_string(),
            include_uncommitted: true,
        };
        let files = source.changed_files(repo.path()).expect("changes");
        assert_eq!(
            files.iter().collect::<Vec<_>>(),
            vec!["services/a/lib.txt", "services/b/lib.txt"]
        );
    }

    #[test]
    fn outside_a_repository_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = GitChangeSource {
            base: "HEAD~1".to_string(),
            include_uncommitted: true,
        };
        assert!(source.changed_files(temp.path()).is_err());
    }
}
