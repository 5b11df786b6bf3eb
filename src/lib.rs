//! Frame pipeline elements.
//!
//! This crate implements three elements for a frame-based pipeline host and
//! the small host needed to drive them.
//!
//! # Elements
//!
//! 1. **helloworld**: logs its settings and every frame it receives.
//! 2. **labeltrigger**: emits an event once a classification label has been
//!    continuously present (or absent) for a configured number of seconds.
//! 3. **rest**: renders each frame into a JSON body template and sends it to
//!    a REST endpoint.
//!
//! # Module Structure
//!
//! - `frame`: the Frame / ROI data model
//! - `settings`: setting schemas and resolved values
//! - `runtime`: the `Element` trait, registry and chain host
//! - `elements`: the built-in elements
//! - `config`: host configuration (file + env)

pub mod config;
pub mod elements;
pub mod frame;
pub mod runtime;
pub mod settings;

pub use config::{HostConfig, StageConfig};
pub use elements::{
    Dispatch, EchoElement, ForwarderConfig, HttpMethod, LabelTrigger, SkipReason, Template,
    TriggerConfig, TriggerState, WebhookForwarder,
};
pub use frame::{Classification, Frame, Roi, MESSAGE_KEY};
pub use runtime::{
    Clock, Context, Element, ElementDescriptor, ElementFactory, ElementHost, ElementRegistry,
    OutputEvent, Stage, SystemClock,
};
pub use settings::{Literal, SettingKind, SettingSpec, SettingValue, Settings};
