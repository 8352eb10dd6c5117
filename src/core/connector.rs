//! Connector directory layout

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::manifest::{Manifest, ManifestError, TEMPLATES_DIR};

/// Directory holding connector-local tool configuration
pub const CONFIG_DIR: &str = ".connector";

/// A connector source directory (holds `manifest.json`)
#[derive(Debug)]
pub struct Connector {
    root: PathBuf,
}

impl Connector {
    /// Open an existing connector directory
    pub fn open(path: &Path) -> Result<Self, ConnectorError> {
        if !path.is_dir() {
            return Err(ConnectorError::NotFound(path.to_path_buf()));
        }
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    /// Create an empty manifest at the given path
    pub fn init(path: &Path) -> Result<Self, ConnectorError> {
        let manifest_path = Manifest::path_in(path);
        if manifest_path.exists() {
            return Err(ConnectorError::AlreadyExists(manifest_path));
        }
        Self::init_force(path)
    }

    /// Create an empty manifest, replacing any existing one
    pub fn init_force(path: &Path) -> Result<Self, ConnectorError> {
        std::fs::create_dir_all(path).map_err(|source| ConnectorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Manifest::default().save(path)?;

        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    /// Get the connector root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        Manifest::path_in(&self.root)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    /// Connector-local configuration directory
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    /// Resolve the expanded output directory; relative paths are taken
    /// relative to the connector root
    pub fn expanded_dir(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root.join(dir)
        }
    }
}

/// Errors that can occur while setting up a connector directory
#[derive(Debug, Error, Diagnostic)]
pub enum ConnectorError {
    #[error("connector directory {0:?} does not exist")]
    #[diagnostic(code(connector::dir::not_found))]
    NotFound(PathBuf),

    #[error("manifest already exists at {0:?}")]
    #[diagnostic(code(connector::dir::already_exists))]
    AlreadyExists(PathBuf),

    #[error("failed to create {path:?}")]
    #[diagnostic(code(connector::dir::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),
}
