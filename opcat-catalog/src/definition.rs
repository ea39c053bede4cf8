//! The catalog definition data model.
//!
//! One `CatalogDefinition` describes one algorithm: its metadata, the
//! executable entry point, and the ordered input/output/parameter profile.
//! Parsed straight from an operator's `catalog_def*.json`; optional fields
//! stay `None` until [`normalize`](crate::normalize::normalize) fills them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("catalog definition has an empty name")]
    EmptyName,
    #[error("catalog definition {0:?} has an empty entry_point")]
    EmptyEntryPoint(String),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single input, output, or parameter slot of an algorithm.
///
/// Direction, dtype, and order index are derived at generation time, not
/// stored on the source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Data-format tag (e.g. `ts_list`, `number`).
    #[serde(rename = "type")]
    pub data_format: String,
    /// Value set constraining a parameter; a JSON array or a plain string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<serde_json::Value>,
    /// Default scalar for a parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

/// The unit of catalog input: one algorithm's metadata and I/O profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    /// Unique identifier of the algorithm. Required; every derived default
    /// and synthetic row name keys off it.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Family reference by name; resolved against the registry during
    /// normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Executable implementation location, namespaced at generation time.
    pub entry_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<bool>,
    #[serde(default)]
    pub inputs: Vec<ProfileItem>,
    #[serde(default)]
    pub outputs: Vec<ProfileItem>,
    #[serde(default)]
    pub parameters: Vec<ProfileItem>,
}

impl CatalogDefinition {
    /// Parse and validate a definition from raw JSON.
    pub fn from_json(raw: &str) -> Result<Self, DefinitionError> {
        let def: Self = serde_json::from_str(raw)?;
        def.validate()?;
        Ok(def)
    }

    /// Missing `name` is the only hard validation error; every other
    /// absent field is resolvable to a default.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.entry_point.trim().is_empty() {
            return Err(DefinitionError::EmptyEntryPoint(self.name.clone()));
        }
        Ok(())
    }

    /// Effective visibility (defaults to visible).
    pub fn visible(&self) -> bool {
        self.visibility.unwrap_or(true)
    }
}
