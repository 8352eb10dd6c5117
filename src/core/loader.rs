//! Component file loading
//!
//! Reads the `*.json` files of a component directory (`pipes/`, `systems/`)
//! in file-name order, so grouping and list order do not depend on the
//! filesystem.

use miette::Diagnostic;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::json::{parse_json, JsonSyntaxError};

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to read {path}")]
    #[diagnostic(code(connector::loader::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] JsonSyntaxError),
}

/// A JSON file read from a component directory
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file_name: String,
    pub value: Value,
}

/// List the `*.json` files directly inside `dir`, sorted by file name.
///
/// A missing directory yields no files.
pub fn json_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| LoadError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |e| e == "json") {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Read and parse one JSON file
pub fn load_file(path: &Path) -> Result<LoadedFile, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = parse_json(&content, &path.display().to_string())?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(LoadedFile {
        file_name,
        value,
    })
}

/// Read every `*.json` file directly inside `dir`
pub fn load_all(dir: &Path) -> Result<Vec<LoadedFile>, LoadError> {
    json_files(dir)?.iter().map(|path| load_file(path)).collect()
}
