//! Demo element: logs its settings and every frame it receives.

use anyhow::Result;

use crate::frame::Frame;
use crate::runtime::{Context, Element, ElementDescriptor, OutputEvent};
use crate::settings::{equals, Literal, SettingSpec, Settings};

const SETTINGS: &[SettingSpec] = &[
    SettingSpec::new("helloworld", "HelloWorld", Literal::Text("HelloWorld")),
    SettingSpec::new("number", "A Number", Literal::Number(10))
        .describe("This is a number")
        .min(1, 1),
    SettingSpec::new("bool_setting", "A Dropdown Toggle", Literal::Bool(true))
        .describe("Whether Dropdown should be displayed"),
    SettingSpec::new("dropdown_setting", "Dropdown Setting", Literal::Text("item1"))
        .describe("An Item")
        .choices(&["item1", "item2", "item3"])
        .hints(&["dropdown"])
        .depends_on(equals("bool_setting", Literal::Bool(true))),
    SettingSpec::new("folder_setting", "A Folder Path", Literal::Text(""))
        .describe("A folder location")
        .hints(&["folder_path"]),
];

const DESCRIPTOR: ElementDescriptor = ElementDescriptor {
    id: "c382bdae-6680-4c64-a647-4b89fcba860b",
    name: "helloworld",
    display_name: "helloworld",
    description: "Logs settings and incoming frames",
    version: "0.1.6",
    inputs: &["input"],
    outputs: &[],
    settings: SETTINGS,
};

#[derive(Default)]
pub struct EchoElement;

impl EchoElement {
    pub fn new() -> Self {
        Self
    }
}

/// One line listing every visible setting as `name=value`.
pub fn describe_settings(settings: &Settings) -> String {
    settings
        .iter()
        .filter(|(name, _)| settings.is_visible(name))
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line summarising the frame fields.
pub fn describe_frame(frame: &Frame) -> String {
    let headers = frame
        .headers
        .as_ref()
        .map(|h| serde_json::Value::Object(h.clone()).to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "id={} headers={} content_type={} text={:?} labels=[{}] other_data={}",
        frame.frame_id.as_deref().unwrap_or("-"),
        headers,
        frame.content_type.as_deref().unwrap_or("-"),
        frame.text_or_empty(),
        frame.labels().join(","),
        serde_json::Value::Object(frame.other_data.clone())
    )
}

impl Element for EchoElement {
    fn descriptor(&self) -> ElementDescriptor {
        DESCRIPTOR
    }

    fn startup(&mut self, _ctx: &Context<'_>) -> Result<()> {
        log::info!("***** HelloWorld Element Startup *****");
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &Context<'_>) -> Result<()> {
        log::info!("***** HelloWorld Element Shutdown *****");
        Ok(())
    }

    fn execute(&mut self, ctx: &Context<'_>, frame: &Frame) -> Result<Vec<OutputEvent>> {
        log::info!("Settings: {}", describe_settings(ctx.settings()));
        log::info!("Frame: {}", describe_frame(frame));
        Ok(Vec::new())
    }
}
