//! Label presence trigger.
//!
//! Watches classification results and emits an event once the configured
//! label has been continuously present (or continuously absent) for a
//! threshold. Evaluation only happens when a frame arrives; there is no
//! background timer, so sparse frames delay firing past the threshold.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use crate::frame::Frame;
use crate::runtime::{Context, Element, ElementDescriptor, OutputEvent};
use crate::settings::{Literal, SettingSpec, Settings};

const SETTINGS: &[SettingSpec] = &[
    SettingSpec::new("label", "Classification Label", Literal::Text("person")).required(),
    SettingSpec::new("present", "Label is present", Literal::Bool(true))
        .describe("Fire when the label has been present (on) or absent (off) long enough"),
    SettingSpec::new("repeat", "Repeat trigger every X seconds", Literal::Bool(true)),
    SettingSpec::new("seconds", "Seconds", Literal::Number(10))
        .describe("Time to wait before firing")
        .min(1, 1),
];

const DESCRIPTOR: ElementDescriptor = ElementDescriptor {
    id: "d92c7fca-d087-46b2-ac5a-3887221be247",
    name: "labeltrigger",
    display_name: "label_trigger",
    description: "Emit an event when a label has been present or absent for a while",
    version: "0.1.4",
    inputs: &["input"],
    outputs: &["output"],
    settings: SETTINGS,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerConfig {
    pub label: String,
    /// true: fire on sustained presence. false: fire on sustained absence.
    pub watch_present: bool,
    pub repeat: bool,
    pub threshold: Duration,
}

impl TriggerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let seconds = settings.number("seconds")?;
        let seconds = u64::try_from(seconds)
            .ok()
            .filter(|s| *s >= 1)
            .ok_or_else(|| anyhow!("seconds must be at least 1, got {}", seconds))?;
        Ok(Self {
            label: settings.text("label")?.to_string(),
            watch_present: settings.flag("present")?,
            repeat: settings.flag("repeat")?,
            threshold: Duration::from_secs(seconds),
        })
    }
}

/// Pending timers and the fired flag. At most one timer is armed at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerState {
    last_empty: Option<Instant>,
    last_present: Option<Instant>,
    fired: bool,
}

impl TriggerState {
    pub fn last_empty(&self) -> Option<Instant> {
        self.last_empty
    }

    pub fn last_present(&self) -> Option<Instant> {
        self.last_present
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Update timers for one observation and return the message to emit, if
    /// any.
    pub fn observe(&mut self, config: &TriggerConfig, label_seen: bool, now: Instant) -> Option<String> {
        if label_seen {
            self.last_empty = None;
            if self.last_present.is_none() {
                self.last_present = Some(now);
                if !config.watch_present {
                    self.fired = false;
                }
            }
        } else {
            self.last_present = None;
            if self.last_empty.is_none() {
                self.last_empty = Some(now);
                if config.watch_present {
                    self.fired = false;
                }
            }
        }

        let candidate = if config.watch_present {
            expired(&mut self.last_present, now, config.threshold).map(|elapsed| {
                format!(
                    "{} detected after absence of {}s",
                    config.label,
                    round_secs(elapsed)
                )
            })
        } else {
            expired(&mut self.last_empty, now, config.threshold).map(|elapsed| {
                format!("{} missing for {}s", config.label, round_secs(elapsed))
            })
        };
        let candidate = candidate?;

        if config.repeat {
            return Some(candidate);
        }
        if self.fired {
            log::debug!("suppressed repeat trigger: {}", candidate);
            return None;
        }
        self.fired = true;
        Some(candidate)
    }
}

/// Take the timer if it has been armed for at least `threshold`.
fn expired(timer: &mut Option<Instant>, now: Instant, threshold: Duration) -> Option<Duration> {
    let since = (*timer)?;
    let elapsed = now.saturating_duration_since(since);
    if elapsed < threshold {
        return None;
    }
    *timer = None;
    Some(elapsed)
}

fn round_secs(elapsed: Duration) -> u64 {
    elapsed.as_secs_f64().round_ties_even() as u64
}

pub struct LabelTrigger {
    config: Option<TriggerConfig>,
    state: TriggerState,
}

impl LabelTrigger {
    pub fn new() -> Self {
        Self {
            config: None,
            state: TriggerState::default(),
        }
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    /// Evaluate one frame observed at `now`.
    pub fn evaluate(&mut self, frame: &Frame, now: Instant) -> Result<Option<OutputEvent>> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| anyhow!("labeltrigger executed before startup"))?;
        let seen = frame.has_label(&config.label);
        let fired = self.state.observe(config, seen, now).map(|msg| {
            log::info!("trigger fired: {}", msg);
            OutputEvent::new(msg)
        });
        Ok(fired)
    }
}

impl Default for LabelTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for LabelTrigger {
    fn descriptor(&self) -> ElementDescriptor {
        DESCRIPTOR
    }

    fn startup(&mut self, ctx: &Context<'_>) -> Result<()> {
        let config = TriggerConfig::from_settings(ctx.settings())?;
        log::info!(
            "labeltrigger watching '{}' ({} for {}s, repeat={})",
            config.label,
            if config.watch_present { "present" } else { "absent" },
            config.threshold.as_secs(),
            config.repeat
        );
        self.config = Some(config);
        self.state = TriggerState::default();
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &Context<'_>) -> Result<()> {
        log::info!("labeltrigger shutting down");
        Ok(())
    }

    fn execute(&mut self, ctx: &Context<'_>, frame: &Frame) -> Result<Vec<OutputEvent>> {
        Ok(self.evaluate(frame, ctx.now())?.into_iter().collect())
    }
}
