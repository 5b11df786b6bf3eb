//! Host configuration: the element chain and each stage's raw settings.
//!
//! Loaded from the file named by `ELEMENTS_CONFIG` (JSON, or TOML for a
//! `.toml` path), then overridden from the environment. `ELEMENTS_PIPELINE`
//! only applies when no file is given; `ELEMENTS_REST_AUTH_TOKEN` is injected
//! into every REST stage.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::elements::rest;

const DEFAULT_PIPELINE: &str = "helloworld";

#[derive(Debug, Deserialize, Default)]
struct HostConfigFile {
    pipeline: Option<Vec<StageConfigFile>>,
}

#[derive(Debug, Deserialize)]
struct StageConfigFile {
    element: String,
    #[serde(default)]
    settings: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub pipeline: Vec<StageConfig>,
}

/// One pipeline stage: an element name (or id) plus raw setting values.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub element: String,
    pub settings: Map<String, Value>,
}

impl StageConfig {
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_string(),
            settings: Map::new(),
        }
    }
}

impl HostConfig {
    /// Load from `ELEMENTS_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ELEMENTS_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty());
        Self::load_from(path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let from_file = file_cfg.is_some();
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env(from_file)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HostConfigFile) -> Self {
        let pipeline = match file.pipeline {
            Some(stages) => stages
                .into_iter()
                .map(|stage| StageConfig {
                    element: stage.element,
                    settings: stage.settings,
                })
                .collect(),
            None => vec![StageConfig::new(DEFAULT_PIPELINE)],
        };
        Self { pipeline }
    }

    fn apply_env(&mut self, from_file: bool) -> Result<()> {
        if let Ok(names) = std::env::var("ELEMENTS_PIPELINE") {
            let parsed = split_csv(&names);
            if !parsed.is_empty() {
                if from_file {
                    log::warn!("ELEMENTS_PIPELINE ignored: pipeline comes from the config file");
                } else {
                    self.pipeline = parsed.iter().map(|name| StageConfig::new(name)).collect();
                }
            }
        }
        if let Ok(token) = std::env::var("ELEMENTS_REST_AUTH_TOKEN") {
            if !token.trim().is_empty() {
                for stage in self
                    .pipeline
                    .iter_mut()
                    .filter(|stage| is_rest_stage(&stage.element))
                {
                    stage
                        .settings
                        .insert("auth_token".to_string(), Value::String(token.clone()));
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.is_empty() {
            return Err(anyhow!("pipeline must name at least one element"));
        }
        if let Some(idx) = self
            .pipeline
            .iter()
            .position(|stage| stage.element.trim().is_empty())
        {
            return Err(anyhow!("pipeline stage {} has an empty element name", idx));
        }
        Ok(())
    }
}

/// Stages may name an element by registry name or by descriptor id.
fn is_rest_stage(element: &str) -> bool {
    let element = element.trim();
    element == rest::NAME || element == rest::ID
}

/// JSON by default; TOML when the file name ends in `.toml`.
fn read_config_file(path: &Path) -> Result<HostConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
