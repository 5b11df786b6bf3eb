//! Built-in elements.
//!
//! - `echo`: logs settings and frames (`helloworld`)
//! - `label_trigger`: label presence/absence trigger (`labeltrigger`)
//! - `rest`: template-rendering REST forwarder (`rest`)

pub mod echo;
pub mod label_trigger;
pub mod rest;
pub mod template;

pub use echo::EchoElement;
pub use label_trigger::{LabelTrigger, TriggerConfig, TriggerState};
pub use rest::{Dispatch, ForwarderConfig, HttpMethod, SkipReason, WebhookForwarder};
pub use template::Template;
