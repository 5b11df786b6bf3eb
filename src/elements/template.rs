//! `$placeholder` body templates with safe substitution.
//!
//! Supported tokens: `$name`, `${name}` and `$$` (a literal `$`). Names are
//! `[_a-zA-Z][_a-zA-Z0-9]*`. A name missing from the mapping, or a `$` that
//! does not start a valid token, is left in the output untouched.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([_a-zA-Z][_a-zA-Z0-9]*)|\{([_a-zA-Z][_a-zA-Z0-9]*)\})")
            .expect("static template regex")
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Render, leaving unknown placeholders as literal text.
    pub fn safe_substitute(&self, mapping: &HashMap<String, String>) -> String {
        token_re()
            .replace_all(&self.source, |caps: &Captures<'_>| {
                if caps.get(1).is_some() {
                    return "$".to_string();
                }
                let name = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
                match name.and_then(|name| mapping.get(name)) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Placeholder names referenced by the template, in order, deduplicated.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in token_re().captures_iter(&self.source) {
            if let Some(name) = caps.get(2).or_else(|| caps.get(3)) {
                if !names.iter().any(|n| n == name.as_str()) {
                    names.push(name.as_str().to_string());
                }
            }
        }
        names
    }
}

/// Text form used when a JSON value fills a placeholder: strings verbatim,
/// everything else as JSON text.
pub fn placeholder_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Build a substitution mapping from `text` plus metadata entries. Metadata
/// wins on key collisions.
pub fn mapping_from(text: &str, metadata: &Map<String, Value>) -> HashMap<String, String> {
    let mut mapping = HashMap::with_capacity(metadata.len() + 1);
    mapping.insert("text".to_string(), text.to_string());
    for (key, value) in metadata {
        mapping.insert(key.clone(), placeholder_text(value));
    }
    mapping
}
