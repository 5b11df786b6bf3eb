//! Element settings: static schema metadata and resolved values.
//!
//! Each element declares its settings as a `&'static [SettingSpec]`. The host
//! resolves raw configured values against that schema once, before startup,
//! and elements then read typed values from the resulting `Settings`.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKind {
    Text,
    Number,
    Bool,
}

/// Compile-time literal used for defaults and visibility conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Literal {
    Text(&'static str),
    Number(i64),
    Bool(bool),
}

impl Literal {
    fn kind(self) -> SettingKind {
        match self {
            Literal::Text(_) => SettingKind::Text,
            Literal::Number(_) => SettingKind::Number,
            Literal::Bool(_) => SettingKind::Bool,
        }
    }

    fn to_value(self) -> SettingValue {
        match self {
            Literal::Text(text) => SettingValue::Text(text.to_string()),
            Literal::Number(n) => SettingValue::Number(n),
            Literal::Bool(b) => SettingValue::Bool(b),
        }
    }
}

/// Display rule: the setting is only shown (and only required) when another
/// setting equals the given literal.
#[derive(Clone, Copy, Debug)]
pub struct DependsOn {
    pub setting: &'static str,
    pub equals: Literal,
}

pub const fn equals(setting: &'static str, value: Literal) -> DependsOn {
    DependsOn {
        setting,
        equals: value,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SettingSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub default: Literal,
    pub min_value: Option<i64>,
    pub step: Option<i64>,
    pub valid_values: &'static [&'static str],
    pub hints: &'static [&'static str],
    pub required: bool,
    pub depends_on: Option<DependsOn>,
}

impl SettingSpec {
    /// Base setting; the kind follows from the default literal.
    pub const fn new(name: &'static str, display_name: &'static str, default: Literal) -> Self {
        Self {
            name,
            display_name,
            description: "",
            default,
            min_value: None,
            step: None,
            valid_values: &[],
            hints: &[],
            required: false,
            depends_on: None,
        }
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn min(mut self, min_value: i64, step: i64) -> Self {
        self.min_value = Some(min_value);
        self.step = Some(step);
        self
    }

    pub const fn choices(mut self, valid_values: &'static [&'static str]) -> Self {
        self.valid_values = valid_values;
        self
    }

    pub const fn hints(mut self, hints: &'static [&'static str]) -> Self {
        self.hints = hints;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn depends_on(mut self, rule: DependsOn) -> Self {
        self.depends_on = Some(rule);
        self
    }

    pub fn kind(&self) -> SettingKind {
        self.default.kind()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Number(i64),
    Bool(bool),
}

impl SettingValue {
    fn matches(&self, literal: Literal) -> bool {
        match (self, literal) {
            (SettingValue::Text(a), Literal::Text(b)) => a == b,
            (SettingValue::Number(a), Literal::Number(b)) => *a == b,
            (SettingValue::Bool(a), Literal::Bool(b)) => *a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Text(text) => write!(f, "{:?}", text),
            SettingValue::Number(n) => write!(f, "{}", n),
            SettingValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Resolved, type-checked settings of one element instance.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    values: BTreeMap<&'static str, SettingValue>,
    visible: BTreeMap<&'static str, bool>,
}

impl Settings {
    /// Resolve raw values against a schema. Missing values take the default.
    pub fn resolve(schema: &'static [SettingSpec], raw: &Map<String, Value>) -> Result<Self> {
        let unknown: Vec<&str> = raw
            .keys()
            .map(String::as_str)
            .filter(|key| !schema.iter().any(|spec| spec.name == *key))
            .collect();
        if !unknown.is_empty() {
            return Err(anyhow!("unknown setting(s): {}", unknown.join(", ")));
        }

        let mut values = BTreeMap::new();
        for spec in schema {
            let value = match raw.get(spec.name) {
                Some(value) => coerce(spec, value)?,
                None => spec.default.to_value(),
            };
            check_bounds(spec, &value)?;
            values.insert(spec.name, value);
        }

        let mut visible = BTreeMap::new();
        for spec in schema {
            let shown = match spec.depends_on {
                Some(rule) => values
                    .get(rule.setting)
                    .map(|value| value.matches(rule.equals))
                    .ok_or_else(|| {
                        anyhow!(
                            "setting {} depends on undeclared setting {}",
                            spec.name,
                            rule.setting
                        )
                    })?,
                None => true,
            };
            visible.insert(spec.name, shown);
        }

        for spec in schema.iter().filter(|spec| spec.required) {
            if !visible[spec.name] {
                continue;
            }
            if let Some(SettingValue::Text(text)) = values.get(spec.name) {
                if text.trim().is_empty() {
                    return Err(anyhow!("setting {} is required", spec.name));
                }
            }
        }

        Ok(Self { values, visible })
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(SettingValue::Text(text)) => Ok(text),
            Some(other) => Err(anyhow!("setting {} is not text: {}", name, other)),
            None => Err(anyhow!("setting {} not declared", name)),
        }
    }

    pub fn number(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(SettingValue::Number(n)) => Ok(*n),
            Some(other) => Err(anyhow!("setting {} is not a number: {}", name, other)),
            None => Err(anyhow!("setting {} not declared", name)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.values.get(name) {
            Some(SettingValue::Bool(b)) => Ok(*b),
            Some(other) => Err(anyhow!("setting {} is not a bool: {}", name, other)),
            None => Err(anyhow!("setting {} not declared", name)),
        }
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visible.get(name).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SettingValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

fn coerce(spec: &SettingSpec, value: &Value) -> Result<SettingValue> {
    let coerced = match (spec.kind(), value) {
        (SettingKind::Text, Value::String(text)) => Some(SettingValue::Text(text.clone())),
        (SettingKind::Number, Value::Number(n)) => n.as_i64().map(SettingValue::Number),
        (SettingKind::Bool, Value::Bool(b)) => Some(SettingValue::Bool(*b)),
        _ => None,
    };
    coerced.ok_or_else(|| {
        anyhow!(
            "setting {} expects {:?}, got {}",
            spec.name,
            spec.kind(),
            value
        )
    })
}

fn check_bounds(spec: &SettingSpec, value: &SettingValue) -> Result<()> {
    match value {
        SettingValue::Number(n) => {
            if let Some(min) = spec.min_value {
                if *n < min {
                    return Err(anyhow!(
                        "setting {} must be >= {}, got {}",
                        spec.name,
                        min,
                        n
                    ));
                }
            }
        }
        SettingValue::Text(text) => {
            if !spec.valid_values.is_empty() && !spec.valid_values.contains(&text.as_str()) {
                return Err(anyhow!(
                    "setting {} must be one of [{}], got {:?}",
                    spec.name,
                    spec.valid_values.join(", "),
                    text
                ));
            }
        }
        SettingValue::Bool(_) => {}
    }
    Ok(())
}
