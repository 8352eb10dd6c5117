//! Connector Kit
//!
//! Expands a connector's parameterized templates into a tree of concrete
//! pipe and system configuration files, and collapses such a tree back into
//! templates and a manifest.

pub mod cli;
pub mod core;
pub mod json;
pub mod schema;
