//! Catalog normalization: fill every optional field with its default.
//!
//! Normalization never fails. Absent labels and descriptions fall back to
//! the owning record's name; an absent or unknown family falls back to the
//! registry's sentinel; parameter domains and defaults are canonicalized to
//! text form. Running it twice yields the same definition.

use crate::definition::{CatalogDefinition, ProfileItem};
use opcat_common::FamilyRegistry;
use serde_json::Value;
use tracing::debug;

/// Apply defaults to `def` in place, resolving the family against
/// `registry`.
pub fn normalize(def: &mut CatalogDefinition, registry: &FamilyRegistry) {
    let known = def
        .family
        .as_deref()
        .is_some_and(|f| registry.contains(f));
    if !known {
        if let Some(requested) = &def.family {
            debug!(
                algorithm = %def.name,
                family = %requested,
                "unknown family, falling back to sentinel"
            );
        }
        def.family = Some(registry.sentinel().name.clone());
    }

    if def.label.is_none() {
        def.label = Some(def.name.clone());
    }
    if def.description.is_none() {
        def.description = Some(def.name.clone());
    }
    if def.visibility.is_none() {
        def.visibility = Some(true);
    }

    for item in &mut def.inputs {
        normalize_item(item, false);
    }
    for item in &mut def.outputs {
        normalize_item(item, false);
    }
    for item in &mut def.parameters {
        normalize_item(item, true);
    }
}

fn normalize_item(item: &mut ProfileItem, is_parameter: bool) {
    if item.label.is_none() {
        item.label = Some(item.name.clone());
    }
    if item.description.is_none() {
        item.description = Some(item.name.clone());
    }

    if is_parameter {
        // Absent domain/default stay None: the explicit no-value marker,
        // bound as native NULL at load time.
        if let Some(domain) = item.domain.take() {
            item.domain = Some(Value::String(canonical_text(&domain)));
        }
        if let Some(default) = item.default_value.take() {
            item.default_value = Some(Value::String(canonical_text(&default)));
        }
    }
}

/// Canonical text form of a domain or default value.
///
/// Strings pass through unchanged; booleans become lowercase tokens;
/// numbers render as their JSON text; arrays and objects render as compact
/// JSON. Structured domains are parsed data, never evaluated.
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::CatalogDefinition;
    use serde_json::json;

    fn registry() -> FamilyRegistry {
        FamilyRegistry::builtin()
    }

    fn parse(raw: &str) -> CatalogDefinition {
        CatalogDefinition::from_json(raw).unwrap()
    }

    #[test]
    fn test_defaults_key_off_name() {
        let mut def = parse(r#"{"name": "ema", "entry_point": "smoothing.ema"}"#);
        normalize(&mut def, &registry());
        assert_eq!(def.label.as_deref(), Some("ema"));
        assert_eq!(def.description.as_deref(), Some("ema"));
        assert_eq!(def.visibility, Some(true));
        assert_eq!(def.family.as_deref(), Some("Uncategorized"));
    }

    #[test]
    fn test_known_family_is_preserved() {
        let mut def = parse(
            r#"{"name": "ema", "entry_point": "s.ema", "family": "Data_Exploration"}"#,
        );
        normalize(&mut def, &registry());
        assert_eq!(def.family.as_deref(), Some("Data_Exploration"));
    }

    #[test]
    fn test_unknown_family_falls_back_to_sentinel() {
        let mut def =
            parse(r#"{"name": "ema", "entry_point": "s.ema", "family": "No_Such_Family"}"#);
        normalize(&mut def, &registry());
        assert_eq!(def.family.as_deref(), Some("Uncategorized"));
    }

    #[test]
    fn test_item_defaults() {
        let mut def = parse(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "inputs": [{"name": "ts", "type": "ts_list"}],
                "parameters": [{"name": "window", "type": "number"}]
            }"#,
        );
        normalize(&mut def, &registry());
        assert_eq!(def.inputs[0].label.as_deref(), Some("ts"));
        assert_eq!(def.inputs[0].description.as_deref(), Some("ts"));
        assert!(def.parameters[0].domain.is_none());
        assert!(def.parameters[0].default_value.is_none());
    }

    #[test]
    fn test_domain_list_canonicalized_to_json_text() {
        let mut def = parse(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "parameters": [{"name": "mode", "type": "string", "domain": ["fast", "slow"]}]
            }"#,
        );
        normalize(&mut def, &registry());
        assert_eq!(
            def.parameters[0].domain,
            Some(json!(r#"["fast","slow"]"#))
        );
    }

    #[test]
    fn test_boolean_default_renders_lowercase() {
        let mut def = parse(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "parameters": [{"name": "strict", "type": "bool", "default_value": true}]
            }"#,
        );
        normalize(&mut def, &registry());
        assert_eq!(def.parameters[0].default_value, Some(json!("true")));
    }

    #[test]
    fn test_numeric_default_canonical() {
        let mut def = parse(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "parameters": [{"name": "window", "type": "number", "default_value": 5}]
            }"#,
        );
        normalize(&mut def, &registry());
        assert_eq!(def.parameters[0].default_value, Some(json!("5")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut def = parse(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "family": "bogus",
                "inputs": [{"name": "ts", "type": "ts_list"}],
                "outputs": [{"name": "out", "type": "ts_list", "description": "it's smoothed"}],
                "parameters": [
                    {"name": "mode", "type": "string", "domain": ["a", "b"], "default_value": "a"}
                ]
            }"#,
        );
        normalize(&mut def, &registry());
        let once = def.clone();
        normalize(&mut def, &registry());
        assert_eq!(def, once);
    }
}
