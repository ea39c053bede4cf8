//! Staging of fetched operator trees.
//!
//! After a fetch pass, each operator repository is expected to carry its
//! importable code in an inner directory named after the operator. That
//! subtree is copied into the stage directory with development artifacts
//! filtered out, plus the repository-level LICENSE and README.

use opcat_common::OperatorName;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("operator {0} has no inner {0}/ directory to stage")]
    MissingSubdir(OperatorName),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Entries never copied into the stage tree.
pub fn is_ignored(name: &str) -> bool {
    name == ".git"
        || name == "test"
        || name == "tests"
        || (name.ends_with(".py") && (name.starts_with("test_") || name.starts_with("tests_")))
        || (name.starts_with("catalog_def") && name.ends_with(".json"))
}

/// Recursively copy `src` into `dst`, skipping entries for which `skip`
/// returns true on the file name.
pub fn copy_tree(src: &Path, dst: &Path, skip: &dyn Fn(&str) -> bool) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if skip(&name.to_string_lossy()) {
            continue;
        }
        let target = dst.join(&name);
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target, skip)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Stage one fetched operator into `stage_dir/<name>`.
///
/// The previous staged copy is replaced in full so removals in the source
/// repository propagate.
pub fn stage_operator(
    fetch_dir: &Path,
    stage_dir: &Path,
    name: &OperatorName,
) -> Result<(), StageError> {
    let repo_dir = fetch_dir.join(format!("op-{name}"));
    let inner = repo_dir.join(name.as_str());
    if !inner.is_dir() {
        return Err(StageError::MissingSubdir(name.clone()));
    }

    let dest = stage_dir.join(name.as_str());
    if dest.exists() {
        fs::remove_dir_all(&dest)?;
    }
    copy_tree(&inner, &dest, &is_ignored)?;

    // Repository-level docs travel with the staged code.
    for doc in ["LICENSE", "README.md"] {
        let src = repo_dir.join(doc);
        if src.is_file() {
            fs::copy(&src, dest.join(doc))?;
        }
    }

    debug!(operator = %name, dest = %dest.display(), "staged");
    Ok(())
}

/// Remove staged operators that are no longer in the configured list.
/// The versions manifest is never pruned.
pub fn prune_unlisted(stage_dir: &Path, keep: &HashSet<OperatorName>) -> std::io::Result<()> {
    if !stage_dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(stage_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == crate::manifest::MANIFEST_FILE {
            continue;
        }
        if entry.file_type()?.is_dir() && !keep.contains(&OperatorName::new(name.clone())) {
            info!(operator = %name, "removing unlisted operator from stage");
            fs::remove_dir_all(entry.path())?;
        }
    }
    Ok(())
}

/// Whether a fetched repository carries at least one catalog definition
/// at its top level.
pub fn has_catalog_file(repo_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(repo_dir) else {
        warn!(dir = %repo_dir.display(), "could not read fetched repository");
        return false;
    };
    entries.filter_map(Result::ok).any(|e| {
        e.file_type().map(|t| t.is_file()).unwrap_or(false)
            && opcat_catalog::extract::is_catalog_file(&e.file_name().to_string_lossy())
    })
}
