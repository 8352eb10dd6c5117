//! Template rendering for connector templates
//!
//! Connector templates are JSON documents with `{{@ name @}}` tokens. The
//! custom delimiters keep the tokens apart from JSON's own braces. Tera has
//! fixed delimiters, so each template is translated before it is registered:
//! literal text goes into `{% raw %}` blocks and every token becomes a tera
//! expression.

use miette::Diagnostic;
use rust_embed::Embed;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tera::Tera;
use thiserror::Error;

use crate::core::placeholder::Substitution;
use crate::json::{parse_json, JsonSyntaxError};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Name under which the built-in shim template is registered
pub const SHIM_TEMPLATE: &str = "shim.json";

const TOKEN_START: &str = "{{@";
const TOKEN_END: &str = "@}}";
const TAG_START: &str = "{%";

/// Whether a single rendered object is wrapped into a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// Always return a list
    List,
    /// Return objects as they are
    AsIs,
}

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    #[diagnostic(code(connector::template::not_found))]
    NotFound(String),

    #[error("failed to read template {path}")]
    #[diagnostic(code(connector::template::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unterminated token in {template} at byte {offset}")]
    #[diagnostic(
        code(connector::template::unterminated_token),
        help("close every token before the end of the template")
    )]
    UnterminatedToken { template: String, offset: usize },

    #[error("empty token in {template} at byte {offset}")]
    #[diagnostic(code(connector::template::empty_token))]
    EmptyToken { template: String, offset: usize },

    #[error("template syntax error in {template}: {message}")]
    #[diagnostic(code(connector::template::syntax))]
    Syntax { template: String, message: String },

    #[error("failed to render {template}: {message}")]
    #[diagnostic(
        code(connector::template::render),
        help("every token must be the system token or a declared parameter")
    )]
    Render { template: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Json(#[from] JsonSyntaxError),
}

/// Renders connector templates into JSON components
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Create an engine with the built-in templates registered
    pub fn new() -> Result<Self, TemplateError> {
        let mut engine = Self {
            tera: Tera::default(),
        };
        engine.tera.autoescape_on(vec![]);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    engine.add_template(filename, template_str)?;
                }
            }
        }

        Ok(engine)
    }

    /// Register a template under `name`
    pub fn add_template(&mut self, name: &str, text: &str) -> Result<(), TemplateError> {
        let source = translate_tokens(name, text)?;
        self.tera
            .add_raw_template(name, &source)
            .map_err(|e| TemplateError::Syntax {
                template: name.to_string(),
                message: error_chain(&e),
            })
    }

    /// Read `root/relative` and register it under `relative`
    pub fn add_template_file(&mut self, root: &Path, relative: &str) -> Result<(), TemplateError> {
        let path = root.join(relative);
        let text = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        self.add_template(relative, &text)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a template and parse the output as JSON.
    ///
    /// Lists are returned unchanged. A single value is wrapped into a
    /// one-element list when `wrap` is [`Wrap::List`].
    pub fn render(
        &self,
        name: &str,
        substitution: &Substitution,
        wrap: Wrap,
    ) -> Result<Value, TemplateError> {
        if !self.has_template(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }

        let rendered = self
            .tera
            .render(name, &substitution.to_context())
            .map_err(|e| TemplateError::Render {
                template: name.to_string(),
                message: error_chain(&e),
            })?;
        tracing::trace!(template = name, "rendered template");

        let value = parse_json(&rendered, name)?;
        Ok(match (value, wrap) {
            (Value::Array(items), _) => Value::Array(items),
            (value, Wrap::List) => Value::Array(vec![value]),
            (value, Wrap::AsIs) => value,
        })
    }

    /// Render a template as a flat list of values
    pub fn render_list(
        &self,
        name: &str,
        substitution: &Substitution,
    ) -> Result<Vec<Value>, TemplateError> {
        match self.render(name, substitution, Wrap::List)? {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new().expect("built-in templates are valid")
    }
}

/// Translate `{{@ expr @}}` tokens into tera syntax, keeping all other text
/// literal.
fn translate_tokens(name: &str, text: &str) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len() + 32);
    let mut rest = text;
    let mut consumed = 0;

    while let Some(start) = rest.find(TOKEN_START) {
        push_literal(&mut out, &rest[..start]);

        let after_start = &rest[start + TOKEN_START.len()..];
        let end = after_start
            .find(TOKEN_END)
            .ok_or_else(|| TemplateError::UnterminatedToken {
                template: name.to_string(),
                offset: consumed + start,
            })?;

        let expr = after_start[..end].trim();
        if expr.is_empty() {
            return Err(TemplateError::EmptyToken {
                template: name.to_string(),
                offset: consumed + start,
            });
        }
        out.push_str("{{ ");
        out.push_str(expr);
        out.push_str(" }}");

        let advance = start + TOKEN_START.len() + end + TOKEN_END.len();
        consumed += advance;
        rest = &rest[advance..];
    }
    push_literal(&mut out, rest);

    Ok(out)
}

/// Wrap literal text in raw blocks. Every `{%` is emitted as a string
/// expression so a literal `{% endraw %}` cannot end a block early.
fn push_literal(out: &mut String, literal: &str) {
    for (i, piece) in literal.split(TAG_START).enumerate() {
        if i > 0 {
            out.push_str("{{ \"{%\" }}");
        }
        if !piece.is_empty() {
            out.push_str("{% raw %}");
            out.push_str(piece);
            out.push_str("{% endraw %}");
        }
    }
}

/// Tera keeps the useful part of its messages in the source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
