//! Connector manifest (`manifest.json`)
//!
//! Only the keys the tools act on are typed. Everything else, at the top
//! level and inside datatype entries, is carried through untouched so that
//! collapsing never drops metadata someone added by hand.

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::json::{write_json, JsonSyntaxError};

/// File name of the manifest inside a connector directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Template directory written by collapse, relative to the connector directory
pub const TEMPLATES_DIR: &str = "templates";

/// Group name reserved for system components
pub const SYSTEM_GROUP: &str = "system";

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("manifest not found at {0}")]
    #[diagnostic(
        code(connector::manifest::not_found),
        help("run `connector init` to create an empty manifest")
    )]
    NotFound(PathBuf),

    #[error("failed to read manifest {path}")]
    #[diagnostic(code(connector::manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] JsonSyntaxError),

    #[error("manifest {path} has an invalid shape: {message}")]
    #[diagnostic(code(connector::manifest::shape))]
    Shape { path: PathBuf, message: String },

    #[error("manifest is missing key `{0}`")]
    #[diagnostic(code(connector::manifest::missing_key))]
    MissingKey(String),
}

/// Per-datatype manifest entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatatypeEntry {
    /// Template path relative to the connector directory
    pub template: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatatypeEntry {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            extra: Map::new(),
        }
    }

    /// Apply `other` on top of this entry; keys present in `other` win
    fn overlay(mut self, other: &DatatypeEntry) -> Self {
        self.template = other.template.clone();
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
        self
    }
}

/// The connector manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(
        rename = "system-template",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub system_template: Option<String>,

    /// Datatypes in the order they appear in the file; expand follows it
    #[serde(default)]
    pub datatypes: IndexMap<String, DatatypeEntry>,

    #[serde(default)]
    pub additional_parameters: BTreeMap<String, Value>,

    /// Unrelated top-level keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Path of the manifest inside `connector_dir`
    pub fn path_in(connector_dir: &Path) -> PathBuf {
        connector_dir.join(MANIFEST_FILE)
    }

    /// Load `connector_dir/manifest.json`
    pub fn load(connector_dir: &Path) -> Result<Self, ManifestError> {
        let path = Self::path_in(connector_dir);
        if !path.exists() {
            return Err(ManifestError::NotFound(path));
        }
        Self::load_file(&path)
    }

    /// Load `connector_dir/manifest.json` if it exists
    pub fn load_existing(connector_dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = Self::path_in(connector_dir);
        if path.exists() {
            Self::load_file(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn load_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Deserialized straight from the text so datatype order survives
        serde_json::from_str(&content).map_err(|e| match e.classify() {
            Category::Data => ManifestError::Shape {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            _ => JsonSyntaxError::from_serde_error(&e, &content, &path.display().to_string()).into(),
        })
    }

    /// Write the manifest with sorted keys, datatypes included
    pub fn save(&self, connector_dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = Self::path_in(connector_dir);
        write_json(&path, self).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// The system template path; expanding requires it
    pub fn system_template(&self) -> Result<&str, ManifestError> {
        self.system_template
            .as_deref()
            .ok_or_else(|| ManifestError::MissingKey("system-template".to_string()))
    }

    /// Names of the declared additional parameters
    pub fn parameter_names(&self) -> impl Iterator<Item = &String> {
        self.additional_parameters.keys()
    }

    /// Template path collapse writes for a group
    pub fn template_path(group: &str) -> String {
        format!("{}/{}.json", TEMPLATES_DIR, group)
    }

    /// Build the manifest describing freshly collapsed templates.
    ///
    /// Starts from `existing` (or an empty manifest) and then assigns the
    /// three computed keys. Unrelated top-level keys of `existing` survive.
    /// Within the computed keys the old metadata is consulted per entry:
    /// parameter metadata is carried over, and an old datatype entry is laid
    /// over the computed `{template}` entry, so old keys win there.
    pub fn rebuild<'a, I>(
        existing: Option<Manifest>,
        groups: I,
        parameters: &BTreeSet<String>,
    ) -> Manifest
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut manifest = existing.unwrap_or_default();

        let additional_parameters = parameters
            .iter()
            .map(|name| {
                let metadata = manifest
                    .additional_parameters
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                (name.clone(), metadata)
            })
            .collect();

        let datatypes = groups
            .into_iter()
            .filter(|group| *group != SYSTEM_GROUP)
            .map(|group| {
                let computed = DatatypeEntry::new(Self::template_path(group));
                let entry = match manifest.datatypes.get(group) {
                    Some(old) => computed.overlay(old),
                    None => computed,
                };
                (group.to_string(), entry)
            })
            .collect();

        manifest.additional_parameters = additional_parameters;
        manifest.system_template = Some(Self::template_path(SYSTEM_GROUP));
        manifest.datatypes = datatypes;
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn params(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_full_manifest() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{
                "system-template": "templates/system.json",
                "datatypes": {"person": {"template": "templates/person.json", "label": "People"}},
                "additional_parameters": {"api_key": {"secret": true}},
                "description": "demo"
            }"#,
        )
        .unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.system_template().unwrap(), "templates/system.json");
        assert_eq!(manifest.datatypes["person"].template, "templates/person.json");
        assert_eq!(manifest.datatypes["person"].extra["label"], "People");
        assert_eq!(manifest.additional_parameters["api_key"], json!({"secret": true}));
        assert_eq!(manifest.extra["description"], "demo");
    }

    #[test]
    fn test_load_keeps_datatype_order() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"datatypes": {
                "zeta": {"template": "templates/zeta.json"},
                "alpha": {"template": "templates/alpha.json"},
                "mid": {"template": "templates/mid.json"}
            }}"#,
        )
        .unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        let names: Vec<_> = manifest.datatypes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_load_missing_manifest() {
        let dir = tempdir().unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
        assert!(Manifest::load_existing(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.json"), "{ not json").unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Syntax(_)));
    }

    #[test]
    fn test_datatype_without_template_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"datatypes": {"person": {}}}"#,
        )
        .unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Shape { .. }));
    }

    #[test]
    fn test_missing_system_template() {
        let manifest = Manifest::default();
        let err = manifest.system_template().unwrap_err();
        assert!(matches!(err, ManifestError::MissingKey(ref k) if k == "system-template"));
    }

    #[test]
    fn test_save_round_trip_with_sorted_keys() {
        let dir = tempdir().unwrap();
        let manifest = Manifest::rebuild(None, ["system", "person"], &params(&["api_key"]));
        let path = manifest.save(dir.path()).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let first = text.find("additional_parameters").unwrap();
        let second = text.find("datatypes").unwrap();
        let third = text.find("system-template").unwrap();
        assert!(first < second && second < third);

        assert_eq!(Manifest::load(dir.path()).unwrap(), manifest);
    }

    #[test]
    fn test_rebuild_from_scratch() {
        let manifest = Manifest::rebuild(None, ["person", "system"], &params(&["api_key"]));

        assert_eq!(manifest.system_template.as_deref(), Some("templates/system.json"));
        assert_eq!(manifest.datatypes.len(), 1);
        assert_eq!(manifest.datatypes["person"], DatatypeEntry::new("templates/person.json"));
        assert_eq!(manifest.additional_parameters["api_key"], json!({}));
        assert!(manifest.extra.is_empty());
    }

    #[test]
    fn test_rebuild_new_keys_overlay_old_manifest() {
        let mut old = Manifest {
            system_template: Some("old/system.json".to_string()),
            ..Default::default()
        };
        old.extra.insert("description".to_string(), json!("keep me"));
        old.additional_parameters
            .insert("api_key".to_string(), json!({"secret": true}));
        old.additional_parameters
            .insert("stale".to_string(), json!({"unused": true}));
        old.datatypes
            .insert("gone".to_string(), DatatypeEntry::new("templates/gone.json"));

        let manifest = Manifest::rebuild(Some(old), ["person"], &params(&["api_key", "token_url"]));

        // computed keys replace the old ones
        assert_eq!(manifest.system_template.as_deref(), Some("templates/system.json"));
        assert!(!manifest.datatypes.contains_key("gone"));
        assert!(!manifest.additional_parameters.contains_key("stale"));
        // unrelated keys survive
        assert_eq!(manifest.extra["description"], "keep me");
        // per-parameter metadata is carried over
        assert_eq!(manifest.additional_parameters["api_key"], json!({"secret": true}));
        assert_eq!(manifest.additional_parameters["token_url"], json!({}));
    }

    #[test]
    fn test_rebuild_old_datatype_metadata_wins() {
        let mut old_entry = DatatypeEntry::new("custom/person.json");
        old_entry.extra.insert("label".to_string(), json!("People"));
        let mut old = Manifest::default();
        old.datatypes.insert("person".to_string(), old_entry);

        let manifest = Manifest::rebuild(Some(old), ["person", "order"], &BTreeSet::new());

        assert_eq!(manifest.datatypes["person"].template, "custom/person.json");
        assert_eq!(manifest.datatypes["person"].extra["label"], "People");
        assert_eq!(manifest.datatypes["order"].template, "templates/order.json");
    }
}
