//! Catalog extraction from fetched operator repositories.
//!
//! Looks for files named `catalog_def.json`, `catalog_def_1.json`, ... in
//! the repository root. Multiple files are legal (several algorithms per
//! operator). A repository with no match contributes nothing; a file that
//! fails to parse is skipped and reported, never aborting the batch.

use crate::definition::CatalogDefinition;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Filename pattern for catalog definition files.
const CATALOG_FILE_PATTERN: &str = r"^catalog_def(_[0-9]{1,2})?\.json$";

fn catalog_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CATALOG_FILE_PATTERN).expect("valid catalog file pattern"))
}

/// A catalog file that could not be loaded, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// The result of scanning one repository directory.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Parsed definitions, in filename sort order.
    pub definitions: Vec<CatalogDefinition>,
    /// Matched files that failed to load.
    pub skipped: Vec<SkippedFile>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.skipped.is_empty()
    }
}

/// Returns `true` if `file_name` matches the catalog definition pattern.
pub fn is_catalog_file(file_name: &str) -> bool {
    catalog_file_regex().is_match(file_name)
}

/// Scan `repo_dir` for catalog definition files and parse each one.
///
/// A missing directory or zero matches yields an empty extraction; the
/// caller decides whether that is worth more than the warning logged here.
pub fn extract_catalogs(repo_dir: &Path) -> Extraction {
    let mut extraction = Extraction::default();

    let entries = match std::fs::read_dir(repo_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %repo_dir.display(), error = %e, "repository directory not readable");
            return extraction;
        }
    };

    let mut matched: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_catalog_file)
        })
        .map(|entry| entry.path())
        .collect();
    matched.sort();

    if matched.is_empty() {
        warn!(dir = %repo_dir.display(), "no catalog file found");
        return extraction;
    }

    for path in matched {
        match load_one(&path) {
            Ok(def) => {
                debug!(file = %path.display(), algorithm = %def.name, "catalog definition loaded");
                extraction.definitions.push(def);
            }
            Err(reason) => {
                warn!(file = %path.display(), %reason, "skipping catalog file");
                extraction.skipped.push(SkippedFile { path, reason });
            }
        }
    }

    extraction
}

fn load_one(path: &Path) -> Result<CatalogDefinition, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("read failed: {e}"))?;
    CatalogDefinition::from_json(&raw).map_err(|e| e.to_string())
}
