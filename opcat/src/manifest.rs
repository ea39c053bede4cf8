//! The versions manifest written into the stage directory.
//!
//! One record per configured operator, recording the URL, reference, and
//! resolved commit of the fetch pass that produced the staged tree.

use crate::fetch::FetchOutcome;
use opcat_common::ManifestEntry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// File name of the manifest inside the stage directory.
pub const MANIFEST_FILE: &str = "versions.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "operator", default)]
    pub operators: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build the manifest from a fetch pass. Failed fetches are not
    /// recorded; the manifest only pins what actually landed.
    pub fn from_outcomes(outcomes: &[FetchOutcome]) -> Self {
        Self {
            operators: outcomes
                .iter()
                .filter(|o| o.succeeded())
                .map(|o| ManifestEntry {
                    url: o.source.url.clone(),
                    git_ref: o.source.git_ref.clone(),
                    commit: o.commit.clone(),
                })
                .collect(),
        }
    }

    /// Write the manifest to `stage_dir/versions.toml` and echo its
    /// records to the log.
    pub fn write(&self, stage_dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(stage_dir)?;
        let path = stage_dir.join(MANIFEST_FILE);
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        info!(path = %path.display(), operators = self.operators.len(), "manifest written");
        for entry in &self.operators {
            info!(
                url = %entry.url,
                reference = %entry.git_ref,
                commit = %entry.commit,
                "operator pinned"
            );
        }
        Ok(())
    }

    pub fn read(stage_dir: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(stage_dir.join(MANIFEST_FILE))?;
        Ok(toml::from_str(&raw)?)
    }
}
