//! Common types used across opcat components.

use serde::{Deserialize, Serialize};

/// Unique identifier for an operator repository.
///
/// Derived from the repository URL: the last path segment with the `.git`
/// suffix and `op-` prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorName(pub String);

impl OperatorName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Extract the operator name from a repository URL or local path.
    pub fn from_url(url: &str) -> Self {
        let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
        let name = last.trim_end_matches(".git");
        let name = name.strip_prefix("op-").unwrap_or(name);
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperatorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the configured operator list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSource {
    /// Git URL or absolute local path of the operator repository.
    pub url: String,
    /// Branch, tag, or commit to check out.
    #[serde(rename = "ref", default = "default_ref")]
    pub git_ref: String,
}

impl OperatorSource {
    pub fn name(&self) -> OperatorName {
        OperatorName::from_url(&self.url)
    }

    /// Local-path sources are copied rather than cloned.
    pub fn is_local_path(&self) -> bool {
        self.url.starts_with('/')
    }
}

fn default_ref() -> String {
    "master".to_string()
}

/// One record of the versions manifest written after a fetch pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Resolved commit, `local_changes` for path sources, `no_info` when
    /// the commit could not be resolved.
    pub commit: String,
}

// ── Family Registry ────────────────────────────────────────────────────────

/// Name of the fallback family for algorithms with a missing or unknown
/// family reference.
pub const SENTINEL_FAMILY: &str = "Uncategorized";

/// A classification bucket for algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    /// Unique key, referenced by name from catalog definitions.
    pub name: String,
    pub label: String,
    pub description: String,
}

impl Family {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: description.into(),
        }
    }
}

/// The loaded set of families, constructed once at startup and passed by
/// reference into the normalizer and the catalog loader.
///
/// The sentinel family is always a member, so family fallback can never
/// produce a dangling reference.
#[derive(Debug, Clone)]
pub struct FamilyRegistry {
    families: Vec<Family>,
}

impl FamilyRegistry {
    /// Build a registry from explicit family records. The sentinel family
    /// is appended if the input does not already carry it.
    pub fn new(mut families: Vec<Family>) -> Self {
        if !families.iter().any(|f| f.name == SENTINEL_FAMILY) {
            families.push(Family::new(
                SENTINEL_FAMILY,
                "Uncategorized",
                "Family for algorithms with a missing or unknown family",
            ));
        }
        Self { families }
    }

    /// The built-in family set used when no registry file is configured.
    pub fn builtin() -> Self {
        Self::new(vec![
            Family::new(
                "Data_Exploration",
                "Data Exploration",
                "Functions exploring the data: searches, highlights",
            ),
            Family::new(
                "Stats__TS_Correlation_Computation",
                "Stats/Ts Correlation Computation",
                "Correlation functions applied on time series",
            ),
            Family::new(
                "Stats__TS_Stats",
                "Stats/Statistics On Ts",
                "Statistics features on time series",
            ),
            Family::new(
                "Preprocessing_TS__Reduction",
                "Pre-Processing On Ts/Reduction",
                "Pre-processing functions which reduce information of time series",
            ),
            Family::new(
                "Preprocessing_TS__Cleaning",
                "Pre-Processing On Ts/Cleaning",
                "Pre-processing functions which clean time series",
            ),
            Family::new(
                "Preprocessing_TS__Transforming",
                "Pre-Processing On Ts/Transforming",
                "Pre-processing functions which transform time series",
            ),
            Family::new(
                "Data_Modeling__Supervised_Learning",
                "Data Modeling/Supervised Learning",
                "Supervised learning",
            ),
            Family::new(
                "Data_Modeling__Unsupervised_Learning",
                "Data Modeling/Unsupervised Learning",
                "Unsupervised learning algorithms",
            ),
        ])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.families.iter().any(|f| f.name == name)
    }

    pub fn sentinel(&self) -> &Family {
        // Guaranteed by construction.
        self.families
            .iter()
            .find(|f| f.name == SENTINEL_FAMILY)
            .expect("sentinel family is always registered")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Family> {
        self.families.iter()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_name_from_url() {
        assert_eq!(
            OperatorName::from_url("https://example.org/ops/op-ema.git").as_str(),
            "ema"
        );
        assert_eq!(
            OperatorName::from_url("git@example.org:ops/resample.git").as_str(),
            "resample"
        );
        assert_eq!(OperatorName::from_url("/srv/ops/op-cut").as_str(), "cut");
    }

    #[test]
    fn test_operator_source_default_ref() {
        let src: OperatorSource =
            toml::from_str("url = \"https://example.org/op-ema.git\"").unwrap();
        assert_eq!(src.git_ref, "master");
        assert!(!src.is_local_path());
    }

    #[test]
    fn test_operator_source_local_path() {
        let src: OperatorSource =
            toml::from_str("url = \"/srv/ops/op-cut\"\nref = \"main\"").unwrap();
        assert!(src.is_local_path());
        assert_eq!(src.name().as_str(), "cut");
    }

    #[test]
    fn test_registry_always_carries_sentinel() {
        let reg = FamilyRegistry::new(vec![Family::new("A", "a", "a")]);
        assert!(reg.contains("A"));
        assert!(reg.contains(SENTINEL_FAMILY));
        assert_eq!(reg.sentinel().name, SENTINEL_FAMILY);
    }

    #[test]
    fn test_registry_does_not_duplicate_sentinel() {
        let reg = FamilyRegistry::new(vec![Family::new(
            SENTINEL_FAMILY,
            "Uncategorized",
            "custom wording",
        )]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.sentinel().description, "custom wording");
    }

    #[test]
    fn test_builtin_registry_contains_sentinel() {
        let reg = FamilyRegistry::builtin();
        assert!(reg.contains("Data_Exploration"));
        assert!(reg.contains(SENTINEL_FAMILY));
    }
}
