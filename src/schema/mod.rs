//! Template system - rendering connector templates into components

pub mod template;

pub use template::{TemplateEngine, TemplateError, Wrap, SHIM_TEMPLATE};
