//! Frame data model.
//!
//! A `Frame` is the unit of data the host hands to an element on every
//! invocation. Elements read frames; they never mutate the frame they were
//! given. Output frames are built fresh (see `Frame::message`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key carrying the human-readable text of an output event.
pub const MESSAGE_KEY: &str = "message";

/// A single classification attached to a region of interest.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Region of interest: a detected sub-region carrying classification results.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Roi {
    #[serde(default)]
    pub classes: Vec<Classification>,
}

impl Roi {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            classes: labels
                .iter()
                .map(|label| Classification {
                    label: label.to_string(),
                    score: None,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub rois: Vec<Roi>,
    /// Free-form metadata attached by upstream elements.
    #[serde(default)]
    pub other_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Frame {
    /// Output frame carrying only a message in `other_data`.
    pub fn message(msg: impl Into<String>) -> Self {
        let mut other_data = Map::new();
        other_data.insert(MESSAGE_KEY.to_string(), Value::String(msg.into()));
        Self {
            other_data,
            ..Self::default()
        }
    }

    /// True when any ROI carries a class whose label equals `label` exactly.
    pub fn has_label(&self, label: &str) -> bool {
        self.rois
            .iter()
            .any(|roi| roi.classes.iter().any(|class| class.label == label))
    }

    /// All labels across all ROIs, in order of appearance.
    pub fn labels(&self) -> Vec<&str> {
        self.rois
            .iter()
            .flat_map(|roi| roi.classes.iter().map(|class| class.label.as_str()))
            .collect()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
