//! Chain host for configured elements.
//!
//! Resolves each stage's settings when the chain is built, runs startup in
//! order, then feeds frames through the stages one at a time. The clock is
//! read once per incoming frame and shared by every stage it reaches.

use anyhow::{anyhow, Context as _, Result};
use serde_json::{Map, Value};

use super::{Clock, Context, Element, ElementRegistry, SystemClock};
use crate::config::HostConfig;
use crate::frame::Frame;
use crate::settings::Settings;

/// One element instance in the chain, with its resolved settings.
pub struct Stage {
    name: &'static str,
    element: Box<dyn Element>,
    settings: Settings,
}

impl Stage {
    pub fn new(element: Box<dyn Element>, raw: &Map<String, Value>) -> Result<Self> {
        let descriptor = element.descriptor();
        let settings = Settings::resolve(descriptor.settings, raw)
            .with_context(|| format!("invalid settings for element {}", descriptor.name))?;
        Ok(Self {
            name: descriptor.name,
            element,
            settings,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Drives a linear chain of elements.
///
/// Every input frame goes to the first stage; every output event of a stage
/// is handed, as a frame, to the next stage. Invocations are serialized.
pub struct ElementHost {
    stages: Vec<Stage>,
    clock: Box<dyn Clock>,
    started: bool,
}

impl ElementHost {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            clock: Box::new(SystemClock),
            started: false,
        }
    }

    /// Instantiate every configured stage. Settings errors are fatal here,
    /// before any startup hook runs.
    pub fn from_config(config: &HostConfig, registry: &ElementRegistry) -> Result<Self> {
        let mut host = Self::new();
        for stage in &config.pipeline {
            let element = registry.create(&stage.element)?;
            host.push(element, &stage.settings)?;
        }
        Ok(host)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn push(&mut self, element: Box<dyn Element>, raw: &Map<String, Value>) -> Result<()> {
        if self.started {
            return Err(anyhow!("cannot add stages to a running host"));
        }
        self.stages.push(Stage::new(element, raw)?);
        Ok(())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run each startup hook in order. The first failure aborts.
    pub fn start(&mut self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(anyhow!("pipeline has no stages"));
        }
        let now = self.clock.now();
        for stage in &mut self.stages {
            let ctx = Context::new(&stage.settings, now);
            stage
                .element
                .startup(&ctx)
                .with_context(|| format!("startup failed for element {}", stage.name))?;
            log::info!("element {} started", stage.name);
        }
        self.started = true;
        Ok(())
    }

    /// Feed one frame through the chain; returns the last stage's outputs.
    pub fn process(&mut self, frame: &Frame) -> Result<Vec<Frame>> {
        if !self.started {
            return Err(anyhow!("host not started"));
        }
        let now = self.clock.now();
        let mut current = vec![frame.clone()];
        for stage in &mut self.stages {
            if current.is_empty() {
                break;
            }
            let ctx = Context::new(&stage.settings, now);
            let mut next = Vec::new();
            for input in &current {
                let events = stage
                    .element
                    .execute(&ctx, input)
                    .with_context(|| format!("element {} failed", stage.name))?;
                next.extend(events.into_iter().map(Frame::from));
            }
            current = next;
        }
        Ok(current)
    }

    /// Run every shutdown hook, even after a failure; report the first error.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        let now = self.clock.now();
        let mut first_err = None;
        for stage in &mut self.stages {
            let ctx = Context::new(&stage.settings, now);
            if let Err(err) = stage.element.shutdown(&ctx) {
                log::error!("shutdown failed for element {}: {:#}", stage.name, err);
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for ElementHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ElementDescriptor, OutputEvent};
    use crate::settings::{Literal, SettingSpec};

    const UPPER_SETTINGS: &[SettingSpec] =
        &[SettingSpec::new("fail_startup", "Fail startup", Literal::Bool(false))];

    /// Emits the upper-cased message of every input.
    struct Upper;

    impl Element for Upper {
        fn descriptor(&self) -> ElementDescriptor {
            ElementDescriptor {
                id: "test-upper",
                name: "upper",
                display_name: "Upper",
                description: "",
                version: "0.0.0",
                inputs: &["input"],
                outputs: &["output"],
                settings: UPPER_SETTINGS,
            }
        }

        fn startup(&mut self, ctx: &Context<'_>) -> Result<()> {
            if ctx.settings().flag("fail_startup")? {
                return Err(anyhow!("refusing to start"));
            }
            Ok(())
        }

        fn execute(&mut self, _ctx: &Context<'_>, frame: &Frame) -> Result<Vec<OutputEvent>> {
            let msg = frame
                .other_data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("");
            Ok(vec![OutputEvent::new(msg.to_uppercase())])
        }
    }

    #[test]
    fn chains_outputs_into_next_stage() {
        let mut host = ElementHost::new();
        host.push(Box::new(Upper), &Map::new()).unwrap();
        host.push(Box::new(Upper), &Map::new()).unwrap();
        host.start().unwrap();

        let out = host.process(&Frame::message("hi")).unwrap();
        assert_eq!(out, vec![Frame::message("HI")]);
        host.shutdown().unwrap();
    }

    #[test]
    fn startup_failure_is_reported_with_element_name() {
        let mut raw = Map::new();
        raw.insert("fail_startup".to_string(), Value::Bool(true));
        let mut host = ElementHost::new();
        host.push(Box::new(Upper), &raw).unwrap();

        let err = host.start().unwrap_err();
        assert!(format!("{err:#}").contains("startup failed for element upper"));
        assert!(host.process(&Frame::default()).is_err());
    }

    #[test]
    fn invalid_settings_rejected_before_startup() {
        let mut raw = Map::new();
        raw.insert("fail_startup".to_string(), Value::from("yes"));
        let mut host = ElementHost::new();
        assert!(host.push(Box::new(Upper), &raw).is_err());
        assert!(host.start().is_err());
    }
}
