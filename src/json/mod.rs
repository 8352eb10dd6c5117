//! JSON helpers - diagnostics and on-disk formatting

pub mod diagnostics;

pub use diagnostics::{parse_json, to_pretty_string, write_json, JsonSyntaxError};
