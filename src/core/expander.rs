//! Expand connector templates into concrete components
//!
//! The system template, every datatype template and the built-in shim are
//! rendered in manifest order into one flat component list, which
//! [`materialize`] writes into `pipes/` and `systems/` of the expanded
//! directory.

use miette::Diagnostic;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::component::{Component, ComponentError, ComponentKind, PIPES_DIR, SYSTEMS_DIR};
use crate::core::manifest::{Manifest, ManifestError};
use crate::core::placeholder::{parameter_names, Substitution};
use crate::json::write_json;
use crate::schema::{TemplateEngine, TemplateError, SHIM_TEMPLATE};

/// Environment file written next to the expanded components
pub const TEST_ENV_FILE: &str = "test-env.json";

#[derive(Debug, Error, Diagnostic)]
pub enum ExpandError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("invalid component rendered from {template}")]
    #[diagnostic(code(connector::expand::component))]
    Component {
        template: String,
        #[source]
        #[diagnostic_source]
        source: ComponentError,
    },

    #[error("failed to write {path}")]
    #[diagnostic(code(connector::expand::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of expanding a connector
#[derive(Debug)]
pub struct Expansion {
    /// Components in render order: system, then per datatype its components
    /// followed by its shim
    pub components: Vec<Component>,
    pub manifest: Manifest,
}

impl Expansion {
    /// Declared parameters followed by the built-in ones
    pub fn parameters(&self) -> Vec<String> {
        parameter_names(self.manifest.parameter_names())
    }
}

/// Counts of what [`materialize`] wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpandStats {
    pub systems: usize,
    pub pipes: usize,
    pub skipped: usize,
}

/// Render all templates of the connector in `connector_dir`
pub fn expand(connector_dir: &Path, system_placeholder: &str) -> Result<Expansion, ExpandError> {
    let manifest = Manifest::load(connector_dir)?;
    let system_template = manifest.system_template()?.to_string();

    let mut engine = TemplateEngine::new()?;
    engine.add_template_file(connector_dir, &system_template)?;
    for entry in manifest.datatypes.values() {
        if !engine.has_template(&entry.template) {
            engine.add_template_file(connector_dir, &entry.template)?;
        }
    }

    let base = Substitution::base(system_placeholder, manifest.parameter_names());
    let mut components = Vec::new();

    let rendered = engine.render_list(&system_template, &base)?;
    tracing::debug!(template = %system_template, count = rendered.len(), "rendered system template");
    push_components(&mut components, &system_template, rendered)?;

    for (datatype, entry) in &manifest.datatypes {
        let rendered = engine.render_list(&entry.template, &base)?;
        tracing::debug!(
            datatype = %datatype,
            template = %entry.template,
            count = rendered.len(),
            "rendered datatype template"
        );
        push_components(&mut components, &entry.template, rendered)?;

        let shim = engine.render_list(SHIM_TEMPLATE, &Substitution::shim(system_placeholder, datatype))?;
        push_components(&mut components, SHIM_TEMPLATE, shim)?;
    }

    Ok(Expansion {
        components,
        manifest,
    })
}

fn push_components(
    components: &mut Vec<Component>,
    template: &str,
    rendered: Vec<Value>,
) -> Result<(), ExpandError> {
    for value in rendered {
        let component = Component::from_value(value).map_err(|source| ExpandError::Component {
            template: template.to_string(),
            source,
        })?;
        components.push(component);
    }
    Ok(())
}

/// Rebuild `expanded_dir` from scratch with the given expansion.
///
/// Anything already in `expanded_dir` is removed first.
pub fn materialize(expansion: &Expansion, expanded_dir: &Path) -> Result<ExpandStats, ExpandError> {
    if expanded_dir.is_dir() {
        tracing::debug!(dir = %expanded_dir.display(), "removing previous expansion");
        std::fs::remove_dir_all(expanded_dir).map_err(|source| ExpandError::Io {
            path: expanded_dir.to_path_buf(),
            source,
        })?;
    }
    for dir in [PIPES_DIR, SYSTEMS_DIR] {
        let path = expanded_dir.join(dir);
        std::fs::create_dir_all(&path).map_err(|source| ExpandError::Io { path, source })?;
    }

    let test_env = expanded_dir.join(TEST_ENV_FILE);
    write_json(&test_env, &test_env_value(&expansion.parameters())).map_err(|source| {
        ExpandError::Io {
            path: test_env.clone(),
            source,
        }
    })?;

    let mut stats = ExpandStats::default();
    for component in &expansion.components {
        let Some(dir) = component.kind().directory() else {
            if let ComponentKind::Other(type_name) = component.kind() {
                tracing::warn!(id = component.id(), component_type = %type_name, "skipping component of unknown type");
            }
            stats.skipped += 1;
            continue;
        };

        let path = expanded_dir.join(dir).join(component.file_name());
        write_json(&path, component).map_err(|source| ExpandError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote component");

        match component.kind() {
            ComponentKind::Pipe => stats.pipes += 1,
            _ => stats.systems += 1,
        }
    }

    Ok(stats)
}

/// `{"node-env": "test"}` plus an empty value per parameter
fn test_env_value(parameters: &[String]) -> Value {
    let mut env = Map::new();
    env.insert("node-env".to_string(), Value::String("test".to_string()));
    for name in parameters {
        env.insert(name.clone(), Value::String(String::new()));
    }
    Value::Object(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn person_connector() -> TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("templates")).unwrap();
        fs::write(
            dir.path().join("manifest.json"),
            r#"{
                "system-template": "templates/system.json",
                "datatypes": {"person": {"template": "templates/person.json"}},
                "additional_parameters": {"api_key": {}}
            }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("templates/system.json"),
            r#"{"_id": "{{@ system @}}", "type": "system:rest", "url": "{{@ token_url @}}"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("templates/person.json"),
            r#"{ "_id": "{{@ system @}}-person-main", "type": "pipe", "config_param": "{{@ api_key @}}" }"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_expand_orders_components() {
        let dir = person_connector();
        let expansion = expand(dir.path(), "sys01").unwrap();

        let ids: Vec<_> = expansion.components.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["sys01", "sys01-person-main", "sys01-person-transform"]);
        assert_eq!(expansion.components[1].body()["config_param"], "$ENV(api_key)");
        assert_eq!(expansion.components[0].body()["url"], "$ENV(token_url)");
    }

    #[test]
    fn test_expand_emits_one_shim_per_datatype_in_manifest_order() {
        let dir = person_connector();
        fs::write(
            dir.path().join("templates/order.json"),
            r#"[{"_id": "{{@ system @}}-order-a", "type": "pipe"}, {"_id": "{{@ system @}}-order-b", "type": "pipe"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("manifest.json"),
            r#"{
                "system-template": "templates/system.json",
                "datatypes": {
                    "person": {"template": "templates/person.json"},
                    "order": {"template": "templates/order.json"}
                },
                "additional_parameters": {"api_key": {}}
            }"#,
        )
        .unwrap();

        let expansion = expand(dir.path(), "sys01").unwrap();
        let shims: Vec<_> = expansion
            .components
            .iter()
            .map(|c| c.id())
            .filter(|id| id.ends_with("-transform"))
            .collect();
        assert_eq!(shims, vec!["sys01-person-transform", "sys01-order-transform"]);

        let ids: Vec<_> = expansion.components.iter().map(|c| c.id()).collect();
        assert_eq!(
            ids,
            vec![
                "sys01",
                "sys01-person-main",
                "sys01-person-transform",
                "sys01-order-a",
                "sys01-order-b",
                "sys01-order-transform",
            ]
        );
    }

    #[test]
    fn test_expand_missing_manifest() {
        let dir = tempdir().unwrap();
        let err = expand(dir.path(), "sys01").unwrap_err();
        assert!(matches!(err, ExpandError::Manifest(ManifestError::NotFound(_))));
    }

    #[test]
    fn test_expand_without_system_template() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("manifest.json"), r#"{"datatypes": {}, "additional_parameters": {}}"#)
            .unwrap();
        let err = expand(dir.path(), "sys01").unwrap_err();
        assert!(matches!(err, ExpandError::Manifest(ManifestError::MissingKey(_))));
    }

    #[test]
    fn test_expand_component_without_type() {
        let dir = person_connector();
        fs::write(
            dir.path().join("templates/person.json"),
            r#"{"_id": "{{@ system @}}-person-main"}"#,
        )
        .unwrap();
        let err = expand(dir.path(), "sys01").unwrap_err();
        assert!(matches!(err, ExpandError::Component { .. }));
    }

    #[test]
    fn test_materialize_writes_tree() {
        let dir = person_connector();
        let expansion = expand(dir.path(), "sys01").unwrap();
        let out = dir.path().join(".expanded");

        let stats = materialize(&expansion, &out).unwrap();
        assert_eq!(stats, ExpandStats { systems: 1, pipes: 2, skipped: 0 });

        assert!(out.join("systems/sys01.conf.json").is_file());
        assert!(out.join("pipes/sys01-person-transform.conf.json").is_file());

        let pipe: Value = serde_json::from_str(
            &fs::read_to_string(out.join("pipes/sys01-person-main.conf.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(pipe["config_param"], "$ENV(api_key)");

        let env: Value =
            serde_json::from_str(&fs::read_to_string(out.join("test-env.json")).unwrap()).unwrap();
        assert_eq!(env, json!({"node-env": "test", "api_key": "", "token_url": ""}));
    }

    #[test]
    fn test_materialize_replaces_previous_output() {
        let dir = person_connector();
        let out = dir.path().join(".expanded");
        fs::create_dir_all(out.join("pipes")).unwrap();
        fs::write(out.join("pipes/stale.conf.json"), "{}").unwrap();

        let expansion = expand(dir.path(), "sys01").unwrap();
        materialize(&expansion, &out).unwrap();

        assert!(!out.join("pipes/stale.conf.json").exists());
        assert!(out.join("pipes/sys01-person-main.conf.json").exists());
    }

    #[test]
    fn test_materialize_skips_unknown_types() {
        let dir = person_connector();
        fs::write(
            dir.path().join("templates/person.json"),
            r#"[{"_id": "{{@ system @}}-person-main", "type": "pipe"}, {"_id": "ds", "type": "dataset"}]"#,
        )
        .unwrap();
        let expansion = expand(dir.path(), "sys01").unwrap();
        let out = dir.path().join(".expanded");

        let stats = materialize(&expansion, &out).unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(!out.join("pipes/ds.conf.json").exists());
    }
}
