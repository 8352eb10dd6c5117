//! Core module - manifest, components, expand and collapse

pub mod collapser;
pub mod component;
pub mod config;
pub mod connector;
pub mod expander;
pub mod loader;
pub mod manifest;
pub mod placeholder;

pub use collapser::{collapse, CollapseError, CollapseReport};
pub use component::{Component, ComponentError, ComponentKind, ComponentName};
pub use config::{Config, ConfigError};
pub use connector::{Connector, ConnectorError};
pub use expander::{expand, materialize, ExpandError, ExpandStats, Expansion};
pub use manifest::{DatatypeEntry, Manifest, ManifestError};
pub use placeholder::{Substitution, TokenRewrite, DEFAULT_SYSTEM_PLACEHOLDER};
