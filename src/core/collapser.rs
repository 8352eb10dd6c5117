//! Collapse a concrete configuration tree back into templates
//!
//! Components under `systems/` form the `system` group. Pipes under `pipes/`
//! are grouped by the datatype part of their file name; generated shim pipes
//! are left out because expand regenerates them. Each group is written as a
//! template with the concrete markers turned back into tokens, and the
//! manifest is rebuilt on top of the existing one.

use miette::Diagnostic;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::component::{ComponentError, ComponentName, PIPES_DIR, SYSTEMS_DIR};
use crate::core::loader::{self, LoadError, LoadedFile};
use crate::core::manifest::{Manifest, ManifestError, SYSTEM_GROUP, TEMPLATES_DIR};
use crate::core::placeholder::{tokenize, TokenRewrite};
use crate::json::to_pretty_string;

/// Indent used for collapsed templates
const TEMPLATE_INDENT: &[u8] = b"    ";

#[derive(Debug, Error, Diagnostic)]
pub enum CollapseError {
    #[error("template directory {0} already exists")]
    #[diagnostic(
        code(connector::collapse::templates_exist),
        help("remove the templates directory before collapsing again")
    )]
    TemplatesExist(PathBuf),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error("cannot classify pipe file {file}")]
    #[diagnostic(code(connector::collapse::pipe_name))]
    PipeName {
        file: String,
        #[source]
        #[diagnostic_source]
        source: ComponentError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to write {path}")]
    #[diagnostic(code(connector::collapse::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Components grouped by datatype; the `system` group holds system components
pub type Groups = BTreeMap<String, Vec<Value>>;

/// What [`collapse`] wrote
#[derive(Debug, Clone)]
pub struct CollapseReport {
    /// Group name and number of components, in template order
    pub groups: Vec<(String, usize)>,
    /// Shim pipes that were left out
    pub skipped_shims: Vec<String>,
    /// Parameters discovered from `$ENV(name)` markers
    pub parameters: BTreeSet<String>,
    pub manifest_path: PathBuf,
}

/// Collapse the tree in `connector_dir` into `templates/` and `manifest.json`
pub fn collapse(connector_dir: &Path, system_placeholder: &str) -> Result<CollapseReport, CollapseError> {
    let (groups, skipped_shims) = scan_groups(connector_dir, system_placeholder)?;

    let templates_dir = connector_dir.join(TEMPLATES_DIR);
    if templates_dir.exists() {
        return Err(CollapseError::TemplatesExist(templates_dir));
    }
    std::fs::create_dir_all(&templates_dir).map_err(|source| CollapseError::Io {
        path: templates_dir.clone(),
        source,
    })?;

    let mut parameters = BTreeSet::new();
    let mut written = Vec::new();
    for (group, components) in &groups {
        let rewrite = collapse_group(components, system_placeholder).map_err(|source| {
            CollapseError::Io {
                path: templates_dir.join(format!("{}.json", group)),
                source,
            }
        })?;

        let path = connector_dir.join(Manifest::template_path(group));
        std::fs::write(&path, &rewrite.text).map_err(|source| CollapseError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(
            group = %group,
            components = components.len(),
            parameters = rewrite.parameters.len(),
            "wrote template"
        );

        parameters.extend(rewrite.parameters);
        written.push((group.clone(), components.len()));
    }

    let existing = Manifest::load_existing(connector_dir)?;
    let manifest = Manifest::rebuild(existing, groups.keys().map(String::as_str), &parameters);
    let manifest_path = manifest.save(connector_dir)?;

    Ok(CollapseReport {
        groups: written,
        skipped_shims,
        parameters,
        manifest_path,
    })
}

/// Read `systems/` and `pipes/` into groups.
///
/// Returns the groups and the file names of the shim pipes left out.
pub fn scan_groups(
    connector_dir: &Path,
    system_placeholder: &str,
) -> Result<(Groups, Vec<String>), CollapseError> {
    let mut groups = Groups::new();
    let mut skipped = Vec::new();

    for file in loader::load_all(&connector_dir.join(SYSTEMS_DIR))? {
        tracing::debug!(file = %file.file_name, "adding system component");
        groups
            .entry(SYSTEM_GROUP.to_string())
            .or_default()
            .push(file.value);
    }

    for path in loader::json_files(&connector_dir.join(PIPES_DIR))? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = ComponentName::from_file_name(&file_name).map_err(|source| {
            CollapseError::PipeName {
                file: file_name.clone(),
                source,
            }
        })?;
        if name.is_shim() {
            tracing::debug!(file = %file_name, "skipping shim pipe");
            skipped.push(file_name);
            continue;
        }

        let LoadedFile { value, .. } = loader::load_file(&path)?;
        if is_shim_id(&value, system_placeholder, &name.datatype) {
            tracing::debug!(file = %file_name, "skipping shim pipe by id");
            skipped.push(file_name);
            continue;
        }

        groups.entry(name.datatype).or_default().push(value);
    }

    Ok((groups, skipped))
}

fn is_shim_id(value: &Value, system_placeholder: &str, datatype: &str) -> bool {
    let shim_id = ComponentName::shim(system_placeholder, datatype).to_string();
    value.get("_id").and_then(Value::as_str) == Some(shim_id.as_str())
}

/// Serialize one group as template text.
///
/// A group with a single component is written as a bare object, otherwise
/// as a list, so expanding the template yields the same components again.
pub fn collapse_group(components: &[Value], system_placeholder: &str) -> std::io::Result<TokenRewrite> {
    let text = match components {
        [single] => to_pretty_string(single, TEMPLATE_INDENT)?,
        many => to_pretty_string(&many, TEMPLATE_INDENT)?,
    };
    Ok(tokenize(&text, system_placeholder))
}
