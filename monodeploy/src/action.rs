//! The unit of work: an independently buildable and deployable action.

use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::ownership::Ownership;

/// Where a built action is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployCoordinates {
    /// Remote repository URL. `None` when neither the manifest nor the
    /// configuration names one.
    pub remote: Option<String>,
    pub branch: String,
}

/// An independently buildable and deployable unit in the monorepo.
///
/// Implementations are discovered by an [`ActionCatalog`](crate::io::workspace::ActionCatalog)
/// and are immutable afterwards. Outcomes are recorded in reports, never on
/// the action itself.
pub trait Action {
    /// Unique name within a run; also the artifact subdirectory name.
    fn name(&self) -> &str;

    /// Deterministic ownership test for a workdir-relative path. Must not
    /// perform I/O.
    fn contains(&self, path: &str) -> bool;

    /// Declared ownership rules, if the action has them. Used to build an
    /// index; actions returning `None` are matched through [`Action::contains`].
    fn ownership(&self) -> Option<&Ownership> {
        None
    }

    /// Directory the build writes into (`<output_dir>/<name>`).
    fn artifact_dir(&self) -> &Path;

    fn deploy_coordinates(&self) -> &DeployCoordinates;

    /// Produce artifacts under [`Action::artifact_dir`] and nowhere else.
    fn build(&self) -> Result<()>;
}

/// Validate that `name` can serve as a single artifact directory component.
pub fn validate_action_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("action name must be non-empty");
    }
    if name == "." || name == ".." {
        bail!("action name '{name}' is reserved");
    }
    if name.contains(|c: char| c == '/' || c == '\\') {
        bail!("action name '{name}' must not contain path separators");
    }
    Ok(())
}
