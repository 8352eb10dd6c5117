//! Configuration components and their naming convention
//!
//! A component is a JSON object with at least `_id` and `type`. Pipe ids and
//! file names follow `<system>-<datatype>-<suffix>`; [`ComponentName`] parses
//! that convention once so callers work with the parts instead of strings.

use miette::Diagnostic;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Suffix of generated shim pipes
pub const SHIM_SUFFIX: &str = "transform";

/// Directory holding pipe components
pub const PIPES_DIR: &str = "pipes";

/// Directory holding system components
pub const SYSTEMS_DIR: &str = "systems";

/// File suffix for expanded components
pub const COMPONENT_FILE_SUFFIX: &str = ".conf.json";

#[derive(Debug, Error, Diagnostic)]
pub enum ComponentError {
    #[error("component is not a JSON object (found {found})")]
    #[diagnostic(code(connector::component::not_object))]
    NotAnObject { found: &'static str },

    #[error(
        "component {} is missing string field `{}`",
        .id.as_deref().unwrap_or("<unknown>"),
        .field
    )]
    #[diagnostic(
        code(connector::component::missing_field),
        help("every component needs a string `_id` and a string `type`")
    )]
    MissingField {
        field: &'static str,
        id: Option<String>,
    },

    #[error("`{name}` does not follow the <system>-<datatype>-<suffix> naming convention")]
    #[diagnostic(
        code(connector::component::malformed_name),
        help("the datatype is read from the second '-' separated part of the name")
    )]
    MalformedName { name: String },
}

/// Where a component belongs in the expanded tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// `type: "pipe"`
    Pipe,
    /// `type: "system:<kind>"`
    System,
    /// Anything else; not written to the expanded tree
    Other(String),
}

impl ComponentKind {
    pub fn from_type(type_name: &str) -> Self {
        if type_name == "pipe" {
            ComponentKind::Pipe
        } else if type_name.starts_with("system:") {
            ComponentKind::System
        } else {
            ComponentKind::Other(type_name.to_string())
        }
    }

    /// Subdirectory of the expanded tree, if the kind is written at all
    pub fn directory(&self) -> Option<&'static str> {
        match self {
            ComponentKind::Pipe => Some(PIPES_DIR),
            ComponentKind::System => Some(SYSTEMS_DIR),
            ComponentKind::Other(_) => None,
        }
    }
}

/// A configuration object with validated `_id` and `type`
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: String,
    kind: ComponentKind,
    body: Value,
}

impl Component {
    /// Validate a rendered value as a component
    pub fn from_value(body: Value) -> Result<Self, ComponentError> {
        let object = body.as_object().ok_or(ComponentError::NotAnObject {
            found: json_type_name(&body),
        })?;

        let id = object
            .get("_id")
            .and_then(Value::as_str)
            .ok_or(ComponentError::MissingField {
                field: "_id",
                id: None,
            })?
            .to_string();

        let type_name = object.get("type").and_then(Value::as_str).ok_or_else(|| {
            ComponentError::MissingField {
                field: "type",
                id: Some(id.clone()),
            }
        })?;
        let kind = ComponentKind::from_type(type_name);

        Ok(Self { id, kind, body })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn is_pipe(&self) -> bool {
        self.kind == ComponentKind::Pipe
    }

    /// File name in the expanded tree: `<_id>.conf.json`
    pub fn file_name(&self) -> String {
        format!("{}{}", self.id, COMPONENT_FILE_SUFFIX)
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// A pipe name split into `<system>-<datatype>-<suffix>`.
///
/// The system part is everything before the first `-` and the datatype is
/// the second part, so neither may contain a hyphen. The suffix keeps any
/// further hyphens and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentName {
    pub system: String,
    pub datatype: String,
    pub suffix: String,
}

impl ComponentName {
    pub fn parse(name: &str) -> Result<Self, ComponentError> {
        let mut parts = name.splitn(3, '-');
        let system = parts.next().unwrap_or_default();
        let datatype = parts.next().filter(|d| !d.is_empty()).ok_or_else(|| {
            ComponentError::MalformedName {
                name: name.to_string(),
            }
        })?;
        let suffix = parts.next().unwrap_or_default();

        Ok(Self {
            system: system.to_string(),
            datatype: datatype.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Parse a file name, ignoring the `.json` and `.conf` extensions
    pub fn from_file_name(file_name: &str) -> Result<Self, ComponentError> {
        let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
        let stem = stem.strip_suffix(".conf").unwrap_or(stem);
        Self::parse(stem)
    }

    /// Name of the shim pipe generated for a datatype
    pub fn shim(system: &str, datatype: &str) -> Self {
        Self {
            system: system.to_string(),
            datatype: datatype.to_string(),
            suffix: SHIM_SUFFIX.to_string(),
        }
    }

    /// True for generated shim pipes, which are never templated.
    ///
    /// Only the bare `transform` suffix counts; `<system>-<datatype>-main-transform`
    /// is an ordinary pipe.
    pub fn is_shim(&self) -> bool {
        self.suffix == SHIM_SUFFIX
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suffix.is_empty() {
            write!(f, "{}-{}", self.system, self.datatype)
        } else {
            write!(f, "{}-{}-{}", self.system, self.datatype, self.suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_from_pipe() {
        let component =
            Component::from_value(json!({"_id": "sys01-person-main", "type": "pipe"})).unwrap();
        assert_eq!(component.id(), "sys01-person-main");
        assert!(component.is_pipe());
        assert_eq!(component.kind().directory(), Some("pipes"));
        assert_eq!(component.file_name(), "sys01-person-main.conf.json");
    }

    #[test]
    fn test_component_from_system() {
        let component =
            Component::from_value(json!({"_id": "sys01", "type": "system:rest"})).unwrap();
        assert_eq!(component.kind(), &ComponentKind::System);
        assert_eq!(component.kind().directory(), Some("systems"));
    }

    #[test]
    fn test_component_other_kind_has_no_directory() {
        let component = Component::from_value(json!({"_id": "x", "type": "dataset"})).unwrap();
        assert_eq!(component.kind().directory(), None);
    }

    #[test]
    fn test_component_missing_id() {
        let err = Component::from_value(json!({"type": "pipe"})).unwrap_err();
        assert!(matches!(err, ComponentError::MissingField { field: "_id", .. }));
    }

    #[test]
    fn test_component_missing_type() {
        let err = Component::from_value(json!({"_id": "a"})).unwrap_err();
        match err {
            ComponentError::MissingField { field, id } => {
                assert_eq!(field, "type");
                assert_eq!(id.as_deref(), Some("a"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_component_not_object() {
        let err = Component::from_value(json!("pipe")).unwrap_err();
        assert!(matches!(err, ComponentError::NotAnObject { found: "a string" }));
    }

    #[test]
    fn test_component_serializes_as_body() {
        let body = json!({"_id": "a", "type": "pipe", "extra": [1, 2]});
        let component = Component::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&component).unwrap(), body);
    }

    #[test]
    fn test_name_parse() {
        let name = ComponentName::parse("sys01-person-main-extra").unwrap();
        assert_eq!(name.system, "sys01");
        assert_eq!(name.datatype, "person");
        assert_eq!(name.suffix, "main-extra");
        assert_eq!(name.to_string(), "sys01-person-main-extra");
        assert!(!name.is_shim());
    }

    #[test]
    fn test_name_without_suffix() {
        let name = ComponentName::from_file_name("sys01-system.json").unwrap();
        assert_eq!(name.datatype, "system");
        assert_eq!(name.suffix, "");
        assert_eq!(name.to_string(), "sys01-system");
    }

    #[test]
    fn test_name_from_file_name_strips_extensions() {
        let name = ComponentName::from_file_name("sys01-person-main.conf.json").unwrap();
        assert_eq!(name, ComponentName::parse("sys01-person-main").unwrap());
    }

    #[test]
    fn test_name_malformed() {
        assert!(matches!(
            ComponentName::from_file_name("readme.json"),
            Err(ComponentError::MalformedName { .. })
        ));
        assert!(ComponentName::parse("sys01-").is_err());
    }

    #[test]
    fn test_shim_detection() {
        assert!(ComponentName::from_file_name("sys01-person-transform.json").unwrap().is_shim());
        assert!(ComponentName::from_file_name("sys01-person-transform.conf.json")
            .unwrap()
            .is_shim());
        assert!(!ComponentName::parse("sys01-person-extra-transform").unwrap().is_shim());
        assert!(!ComponentName::from_file_name("sys01-person-main-transform.conf.json")
            .unwrap()
            .is_shim());
        assert!(!ComponentName::parse("sys01-person-transformer").unwrap().is_shim());

        let shim = ComponentName::shim("xxxxxx", "person");
        assert_eq!(shim.to_string(), "xxxxxx-person-transform");
        assert!(shim.is_shim());
    }
}
