//! Element runtime boundary.
//!
//! This module defines the contract between the host and an element:
//! a static descriptor, three lifecycle hooks and the per-invocation
//! context. The host owns element instances and calls them serially;
//! an element never sees two invocations at once.

mod host;
mod registry;

pub use host::{ElementHost, Stage};
pub use registry::{ElementFactory, ElementRegistry};

use anyhow::Result;
use std::time::Instant;

use crate::frame::Frame;
use crate::settings::{SettingSpec, Settings};

/// Static metadata an element registers with the host.
#[derive(Clone, Copy, Debug)]
pub struct ElementDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
    pub settings: &'static [SettingSpec],
}

/// Event emitted by an element's executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputEvent {
    pub message: String,
}

impl OutputEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<OutputEvent> for Frame {
    fn from(event: OutputEvent) -> Self {
        Frame::message(event.message)
    }
}

/// Per-invocation view the host hands to an element.
pub struct Context<'a> {
    settings: &'a Settings,
    now: Instant,
}

impl<'a> Context<'a> {
    pub fn new(settings: &'a Settings, now: Instant) -> Self {
        Self { settings, now }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Invocation time, read once by the host before calling the element.
    pub fn now(&self) -> Instant {
        self.now
    }
}

/// Time source for the host.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Element lifecycle.
///
/// `startup` is called once before any frame and is where configuration is
/// parsed; an error there rejects the element instance. `execute` is called
/// once per input frame. `shutdown` is called once at the end.
pub trait Element: Send {
    fn descriptor(&self) -> ElementDescriptor;

    fn startup(&mut self, ctx: &Context<'_>) -> Result<()>;

    fn shutdown(&mut self, _ctx: &Context<'_>) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self, ctx: &Context<'_>, frame: &Frame) -> Result<Vec<OutputEvent>>;
}
