//! Output directory lifecycle.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Resolve the working and output directories for a run.
///
/// The working directory must exist and is canonicalized. A relative output
/// directory is resolved against it. Because the output directory is wiped
/// on every run, it may not be the working directory or one of its ancestors.
pub fn normalize_directories(workdir: &Path, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let workdir = workdir
        .canonicalize()
        .with_context(|| format!("resolve working directory {}", workdir.display()))?;
    if !workdir.is_dir() {
        bail!("working directory {} is not a directory", workdir.display());
    }
    let joined = if output_dir.is_absolute() {
        output_dir.to_path_buf()
    } else {
        workdir.join(output_dir)
    };
    let output_dir = resolve_lexically(&joined);
    if workdir.starts_with(&output_dir) {
        bail!(
            "output directory {} would delete the working directory {}",
            output_dir.display(),
            workdir.display()
        );
    }
    Ok((workdir, output_dir))
}

/// Delete the output directory if present, then recreate it empty.
pub fn reset_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        debug!(path = %output_dir.display(), "removing output directory");
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("remove output directory {}", output_dir.display()))?;
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;
    Ok(())
}

/// Names of the top-level entries of the output directory.
pub fn top_level_entries(output_dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in
        fs::read_dir(output_dir).with_context(|| format!("read {}", output_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        names.insert(entry.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}

/// Collapse `.` and `..` without touching the filesystem; the output
/// directory may not exist yet.
fn resolve_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
