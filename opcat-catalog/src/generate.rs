//! Statement generation for one normalized catalog definition.
//!
//! Produces an ordered batch in referential dependency order: algorithm →
//! implementation → one row-pair (profile item + link) per input, then per
//! parameter, then per output. Statements carry bound parameters; the only
//! textual SQL with inlined literals is [`Statement::render`], used for
//! logs and `dump-sql` output.

use crate::definition::{CatalogDefinition, ProfileItem};
use serde_json::Value;

/// Direction code for inputs (parameters share it, see [`DTYPE_PARAMETER`]).
pub const DIRECTION_INPUT: i64 = 0;
/// Direction code for outputs.
pub const DIRECTION_OUTPUT: i64 = 1;
/// dtype tag for parameters.
pub const DTYPE_PARAMETER: i64 = 0;
/// dtype tag for plain inputs and outputs.
pub const DTYPE_IO: i64 = 1;

/// A single bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    /// Explicit no-value marker; binds as native NULL, never as the text
    /// `'None'`.
    Null,
}

impl SqlValue {
    /// SQL literal form, for display only. Text literals double embedded
    /// single quotes.
    pub fn literal(&self) -> String {
        match self {
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Integer(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Null => "NULL".to_string(),
        }
    }
}

/// One parameterized data-modification statement.
#[derive(Debug, Clone)]
pub struct Statement {
    /// SQL text with `?N` placeholders.
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Textual SQL with literals inlined, for logs and `dump-sql`.
    ///
    /// One pass over the SQL text: each `?N` placeholder is spliced with
    /// the corresponding literal, so placeholder-shaped text inside a
    /// bound value is never substituted again.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut rest = self.sql.as_str();
        while let Some(pos) = rest.find('?') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let digits = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            let value = after[..digits]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| self.params.get(i));
            match value {
                Some(value) => out.push_str(&value.literal()),
                // A bare `?` or an out-of-range index stays as written.
                None => out.push_str(&rest[pos..pos + 1 + digits]),
            }
            rest = &after[digits..];
        }
        out.push_str(rest);
        out
    }
}

/// Fixed identifiers embedded into generated rows.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Namespace prefixed to every entry point.
    pub entry_point_namespace: String,
    /// Execution-plugin identifier stored on every implementation row.
    pub execution_plugin: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            entry_point_namespace: "opcat.algo".to_string(),
            execution_plugin: "opcat.exec.local::LocalExecEngine".to_string(),
        }
    }
}

impl From<&opcat_common::CatalogConfig> for GeneratorConfig {
    fn from(cfg: &opcat_common::CatalogConfig) -> Self {
        Self {
            entry_point_namespace: cfg.entry_point_namespace.clone(),
            execution_plugin: cfg.execution_plugin.clone(),
        }
    }
}

/// Role of a profile item, deciding its token, direction, dtype, and link
/// table. Generation order is fixed: inputs, then parameters, then outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Input,
    Parameter,
    Output,
}

impl Role {
    fn token(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Parameter => "param",
            Self::Output => "output",
        }
    }

    fn direction(self) -> i64 {
        match self {
            Self::Input | Self::Parameter => DIRECTION_INPUT,
            Self::Output => DIRECTION_OUTPUT,
        }
    }

    fn dtype(self) -> i64 {
        match self {
            Self::Parameter => DTYPE_PARAMETER,
            Self::Input | Self::Output => DTYPE_IO,
        }
    }

    fn link_table(self) -> &'static str {
        match self {
            Self::Input | Self::Parameter => "implementation_input_items",
            Self::Output => "implementation_output_items",
        }
    }
}

/// Synthetic unique row name for a profile item. Role tokens keep the same
/// short name distinct across inputs, parameters, and outputs.
fn item_row_name(algorithm: &str, role: Role, item: &str) -> String {
    format!("{algorithm}_{}_{item}", role.token())
}

/// Generate the ordered statement batch for one normalized definition.
pub fn generate(def: &CatalogDefinition, cfg: &GeneratorConfig) -> Vec<Statement> {
    let mut batch = Vec::with_capacity(2 + 2 * (def.inputs.len() + def.parameters.len() + def.outputs.len()));

    let label = def.label.clone().unwrap_or_else(|| def.name.clone());
    let description = def.description.clone().unwrap_or_else(|| def.name.clone());
    let family = def
        .family
        .clone()
        .unwrap_or_else(|| opcat_common::types::SENTINEL_FAMILY.to_string());

    batch.push(Statement::new(
        "INSERT INTO algorithm (name, label, description, family_id) \
         VALUES (?1, ?2, ?3, (SELECT id FROM family WHERE name = ?4))",
        vec![
            SqlValue::Text(def.name.clone()),
            SqlValue::Text(label.clone()),
            SqlValue::Text(description.clone()),
            SqlValue::Text(family),
        ],
    ));

    let library_address = format!("{}.{}", cfg.entry_point_namespace, def.entry_point);
    batch.push(Statement::new(
        "INSERT INTO implementation \
         (name, label, description, algorithm_id, execution_plugin, library_address, visibility) \
         VALUES (?1, ?2, ?3, (SELECT id FROM algorithm WHERE name = ?1), ?4, ?5, ?6)",
        vec![
            SqlValue::Text(def.name.clone()),
            SqlValue::Text(label),
            SqlValue::Text(description),
            SqlValue::Text(cfg.execution_plugin.clone()),
            SqlValue::Text(library_address),
            SqlValue::Bool(def.visible()),
        ],
    ));

    // One strictly increasing order_index counter across all three lists.
    let mut order_index: i64 = 0;
    for (role, items) in [
        (Role::Input, &def.inputs),
        (Role::Parameter, &def.parameters),
        (Role::Output, &def.outputs),
    ] {
        for item in items.iter() {
            push_item_pair(&mut batch, &def.name, role, item, order_index);
            order_index += 1;
        }
    }

    batch
}

fn push_item_pair(
    batch: &mut Vec<Statement>,
    algorithm: &str,
    role: Role,
    item: &ProfileItem,
    order_index: i64,
) {
    let row_name = item_row_name(algorithm, role, &item.name);
    let label = item.label.clone().unwrap_or_else(|| item.name.clone());
    let description = item
        .description
        .clone()
        .unwrap_or_else(|| item.name.clone());

    let statement = if role == Role::Parameter {
        Statement::new(
            "INSERT INTO profile_item \
             (name, label, description, direction, dtype, order_index, data_format, \
              domain_of_values, default_value) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            vec![
                SqlValue::Text(row_name.clone()),
                SqlValue::Text(label),
                SqlValue::Text(description),
                SqlValue::Integer(role.direction()),
                SqlValue::Integer(role.dtype()),
                SqlValue::Integer(order_index),
                SqlValue::Text(item.data_format.clone()),
                optional_text(item.domain.as_ref()),
                optional_text(item.default_value.as_ref()),
            ],
        )
    } else {
        Statement::new(
            "INSERT INTO profile_item \
             (name, label, description, direction, dtype, order_index, data_format) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            vec![
                SqlValue::Text(row_name.clone()),
                SqlValue::Text(label),
                SqlValue::Text(description),
                SqlValue::Integer(role.direction()),
                SqlValue::Integer(role.dtype()),
                SqlValue::Integer(order_index),
                SqlValue::Text(item.data_format.clone()),
            ],
        )
    };
    batch.push(statement);

    batch.push(Statement::new(
        format!(
            "INSERT INTO {} (implementation_id, profile_item_id) \
             VALUES ((SELECT id FROM implementation WHERE name = ?1), \
                     (SELECT id FROM profile_item WHERE name = ?2))",
            role.link_table()
        ),
        vec![
            SqlValue::Text(algorithm.to_string()),
            SqlValue::Text(row_name),
        ],
    ));
}

/// Bind a canonicalized optional value: text when present, native NULL
/// when absent.
fn optional_text(value: Option<&Value>) -> SqlValue {
    match value {
        Some(v) => SqlValue::Text(crate::normalize::canonical_text(v)),
        None => SqlValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::CatalogDefinition;
    use crate::normalize::normalize;
    use opcat_common::FamilyRegistry;

    fn normalized(raw: &str) -> CatalogDefinition {
        let mut def = CatalogDefinition::from_json(raw).unwrap();
        normalize(&mut def, &FamilyRegistry::builtin());
        def
    }

    fn item_statements(batch: &[Statement]) -> Vec<&Statement> {
        batch
            .iter()
            .filter(|s| s.sql.starts_with("INSERT INTO profile_item"))
            .collect()
    }

    #[test]
    fn test_bare_definition_generates_two_statements() {
        let def = normalized(r#"{"name": "ema", "entry_point": "smoothing.ema"}"#);
        let batch = generate(&def, &GeneratorConfig::default());
        assert_eq!(batch.len(), 2);
        assert!(batch[0].sql.starts_with("INSERT INTO algorithm"));
        assert!(batch[1].sql.starts_with("INSERT INTO implementation"));
        // Sentinel family reference and namespaced entry point.
        assert_eq!(
            batch[0].params[3],
            SqlValue::Text("Uncategorized".to_string())
        );
        assert_eq!(
            batch[1].params[4],
            SqlValue::Text("opcat.algo.smoothing.ema".to_string())
        );
    }

    #[test]
    fn test_generation_order_and_order_index() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "inputs": [{"name": "ts", "type": "ts_list"}],
                "outputs": [{"name": "result", "type": "ts_list"}],
                "parameters": [{"name": "window", "type": "number"}]
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        // algorithm + implementation + 3 row-pairs
        assert_eq!(batch.len(), 8);

        let items = item_statements(&batch);
        // inputs, then parameters, then outputs
        assert_eq!(items[0].params[0], SqlValue::Text("ema_input_ts".into()));
        assert_eq!(items[1].params[0], SqlValue::Text("ema_param_window".into()));
        assert_eq!(items[2].params[0], SqlValue::Text("ema_output_result".into()));
        for (i, stmt) in items.iter().enumerate() {
            assert_eq!(stmt.params[5], SqlValue::Integer(i as i64));
        }
    }

    #[test]
    fn test_direction_and_dtype_codes() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "inputs": [{"name": "ts", "type": "ts_list"}],
                "outputs": [{"name": "result", "type": "ts_list"}],
                "parameters": [{"name": "window", "type": "number"}]
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let items = item_statements(&batch);

        // input: direction 0, dtype 1
        assert_eq!(items[0].params[3], SqlValue::Integer(DIRECTION_INPUT));
        assert_eq!(items[0].params[4], SqlValue::Integer(DTYPE_IO));
        // parameter: direction 0, dtype 0
        assert_eq!(items[1].params[3], SqlValue::Integer(DIRECTION_INPUT));
        assert_eq!(items[1].params[4], SqlValue::Integer(DTYPE_PARAMETER));
        // output: direction 1, dtype 1
        assert_eq!(items[2].params[3], SqlValue::Integer(DIRECTION_OUTPUT));
        assert_eq!(items[2].params[4], SqlValue::Integer(DTYPE_IO));
    }

    #[test]
    fn test_shared_base_name_across_roles_stays_unique() {
        let def = normalized(
            r#"{
                "name": "cut",
                "entry_point": "c.cut",
                "inputs": [{"name": "threshold", "type": "number"}],
                "parameters": [{"name": "threshold", "type": "number"}]
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let names: Vec<&SqlValue> = item_statements(&batch)
            .iter()
            .map(|s| &s.params[0])
            .collect();
        assert_eq!(
            names,
            vec![
                &SqlValue::Text("cut_input_threshold".into()),
                &SqlValue::Text("cut_param_threshold".into()),
            ]
        );
    }

    #[test]
    fn test_parameter_link_goes_to_input_table() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "outputs": [{"name": "result", "type": "ts_list"}],
                "parameters": [{"name": "window", "type": "number"}]
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let links: Vec<&str> = batch
            .iter()
            .filter(|s| s.sql.contains("_items"))
            .map(|s| s.sql.as_str())
            .collect();
        assert!(links[0].starts_with("INSERT INTO implementation_input_items"));
        assert!(links[1].starts_with("INSERT INTO implementation_output_items"));
    }

    #[test]
    fn test_absent_domain_binds_null() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "parameters": [{"name": "window", "type": "number"}]
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let item = item_statements(&batch)[0];
        assert_eq!(item.params[7], SqlValue::Null);
        assert_eq!(item.params[8], SqlValue::Null);
        let rendered = item.render();
        assert!(rendered.contains("NULL"));
        assert!(!rendered.contains("'None'"));
    }

    #[test]
    fn test_boolean_default_renders_lowercase_token() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "parameters": [{"name": "strict", "type": "bool", "default_value": true}]
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let rendered = item_statements(&batch)[0].render();
        assert!(rendered.contains("'true'"), "got: {rendered}");
        assert!(!rendered.contains("True"));
    }

    #[test]
    fn test_render_doubles_embedded_quotes() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "description": "it's a smoothing function"
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let rendered = batch[0].render();
        assert!(rendered.contains("it''s a smoothing function"));
        // Every quote is balanced: an even count means no literal breaks
        // the statement.
        assert_eq!(rendered.matches('\'').count() % 2, 0);
    }

    #[test]
    fn test_render_keeps_placeholder_text_inside_values_verbatim() {
        // A bound value that looks like a placeholder must land in the
        // output as-is, not get substituted a second time.
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "description": "weights decay as ?1 over the window"
            }"#,
        );
        let batch = generate(&def, &GeneratorConfig::default());
        let rendered = batch[0].render();
        assert!(
            rendered.contains("'weights decay as ?1 over the window'"),
            "got: {rendered}"
        );
        assert!(rendered.contains("'ema'"));
    }

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let def = normalized(
            r#"{
                "name": "ema",
                "entry_point": "s.ema",
                "parameters": [{"name": "mode", "type": "string", "domain": ["a"], "default_value": "a"}]
            }"#,
        );
        for stmt in generate(&def, &GeneratorConfig::default()) {
            assert!(!stmt.render().contains('?'), "unsubstituted: {}", stmt.sql);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn def_with_counts(inputs: usize, params: usize, outputs: usize) -> CatalogDefinition {
            let item = |name: String| ProfileItem {
                name,
                label: None,
                description: None,
                data_format: "number".to_string(),
                domain: None,
                default_value: None,
            };
            let mut def = CatalogDefinition::from_json(
                r#"{"name": "algo", "entry_point": "a.algo"}"#,
            )
            .unwrap();
            def.inputs = (0..inputs).map(|i| item(format!("in{i}"))).collect();
            def.parameters = (0..params).map(|i| item(format!("p{i}"))).collect();
            def.outputs = (0..outputs).map(|i| item(format!("out{i}"))).collect();
            normalize(&mut def, &FamilyRegistry::builtin());
            def
        }

        proptest! {
            #[test]
            fn order_index_is_contiguous_from_zero(
                inputs in 0usize..6,
                params in 0usize..6,
                outputs in 0usize..6,
            ) {
                let def = def_with_counts(inputs, params, outputs);
                let batch = generate(&def, &GeneratorConfig::default());
                let indices: Vec<i64> = batch
                    .iter()
                    .filter(|s| s.sql.starts_with("INSERT INTO profile_item"))
                    .map(|s| match &s.params[5] {
                        SqlValue::Integer(n) => *n,
                        other => panic!("order_index not an integer: {other:?}"),
                    })
                    .collect();
                let expected: Vec<i64> = (0..(inputs + params + outputs) as i64).collect();
                prop_assert_eq!(indices, expected);
            }

            #[test]
            fn synthetic_names_are_unique(
                inputs in 0usize..6,
                params in 0usize..6,
                outputs in 0usize..6,
            ) {
                let def = def_with_counts(inputs, params, outputs);
                let batch = generate(&def, &GeneratorConfig::default());
                let names: Vec<String> = batch
                    .iter()
                    .filter(|s| s.sql.starts_with("INSERT INTO profile_item"))
                    .map(|s| match &s.params[0] {
                        SqlValue::Text(name) => name.clone(),
                        other => panic!("row name not text: {other:?}"),
                    })
                    .collect();
                let mut deduped = names.clone();
                deduped.sort();
                deduped.dedup();
                prop_assert_eq!(names.len(), deduped.len());
            }
        }
    }
}
