//! Placeholder tokens shared by expand and collapse
//!
//! Two token families exist:
//!
//! - the **system placeholder**, a literal string standing in for the system
//!   identifier the connector is deployed under. Templates reference it as
//!   `{{@ system @}}`.
//! - **environment tokens**, `$ENV(name)`, which are left in the expanded
//!   output verbatim and resolved by the deployment environment at runtime.
//!   Templates reference them as `{{@ name @}}`.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Default system placeholder string
pub const DEFAULT_SYSTEM_PLACEHOLDER: &str = "xxxxxx";

/// Name of the token carrying the system placeholder
pub const SYSTEM_TOKEN: &str = "system";

/// Name of the token carrying the datatype in the shim template
pub const DATATYPE_TOKEN: &str = "datatype";

/// Parameters every connector gets without declaring them
pub const BUILT_IN_PARAMETERS: &[&str] = &["token_url"];

static ENV_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$ENV\((\w+)\)").expect("environment marker pattern is valid")
});

/// Render a template token, e.g. `{{@ api_key @}}`
pub fn template_token(name: &str) -> String {
    format!("{{{{@ {} @}}}}", name)
}

/// Render an environment deferral marker, e.g. `$ENV(api_key)`
pub fn env_marker(name: &str) -> String {
    format!("$ENV({})", name)
}

/// Declared parameter names followed by the built-in ones, without duplicates
pub fn parameter_names<'a, I>(declared: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut names: Vec<String> = Vec::new();
    for name in declared
        .into_iter()
        .map(String::as_str)
        .chain(BUILT_IN_PARAMETERS.iter().copied())
    {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Token name to value mapping used for a single render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    values: BTreeMap<String, String>,
}

impl Substitution {
    /// Mapping used for the system and datatype templates: the system token
    /// plus one `$ENV(name)` entry per parameter
    pub fn base<'a, I>(system_placeholder: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut values = BTreeMap::new();
        values.insert(SYSTEM_TOKEN.to_string(), system_placeholder.to_string());
        for name in parameter_names(parameters) {
            let marker = env_marker(&name);
            values.insert(name, marker);
        }
        Self { values }
    }

    /// Mapping used for the built-in shim template
    pub fn shim(system_placeholder: &str, datatype: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(SYSTEM_TOKEN.to_string(), system_placeholder.to_string());
        values.insert(DATATYPE_TOKEN.to_string(), datatype.to_string());
        Self { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        for (name, value) in self.iter() {
            context.insert(name, value);
        }
        context
    }
}

/// Result of turning concrete text back into template text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRewrite {
    /// The text with markers replaced by template tokens
    pub text: String,
    /// Names found in `$ENV(name)` markers
    pub parameters: BTreeSet<String>,
}

/// Replace concrete markers in `text` with template tokens.
///
/// Every occurrence of `system_placeholder` becomes `{{@ system @}}`, then
/// every `$ENV(name)` becomes `{{@ name @}}`. The set of names seen is
/// returned alongside the text.
pub fn tokenize(text: &str, system_placeholder: &str) -> TokenRewrite {
    let with_system = if system_placeholder.is_empty() {
        text.to_string()
    } else {
        text.replace(system_placeholder, &template_token(SYSTEM_TOKEN))
    };

    let mut parameters = BTreeSet::new();
    let text = ENV_MARKER
        .replace_all(&with_system, |caps: &regex::Captures| {
            let name = &caps[1];
            parameters.insert(name.to_string());
            template_token(name)
        })
        .into_owned();

    TokenRewrite { text, parameters }
}
