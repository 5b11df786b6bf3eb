//! Generic REST forwarder.
//!
//! Renders each incoming frame into a JSON body template and sends it to a
//! configured endpoint. Configuration problems fail startup. Per-frame
//! problems (unresolved placeholders, invalid JSON, transport errors,
//! non-2xx responses) are logged and the frame is dropped; they never reach
//! the caller as errors.

use anyhow::{anyhow, Context as _, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

use super::template::{mapping_from, placeholder_text, Template};
use crate::frame::Frame;
use crate::runtime::{Context, Element, ElementDescriptor, OutputEvent};
use crate::settings::{Literal, SettingSpec, Settings};

const DEFAULT_CONTENT_TYPE: &str = "application/json";
const MAX_LOGGED_RESPONSE_CHARS: usize = 512;

const SETTINGS: &[SettingSpec] = &[
    SettingSpec::new(
        "url",
        "Endpoint URL",
        Literal::Text("https://slack.com/api/chat.postMessage"),
    )
    .describe("Target REST endpoint (e.g. Slack, Discord, or any webhook).")
    .required(),
    SettingSpec::new("method", "HTTP method", Literal::Text("POST"))
        .choices(&["GET", "POST", "PUT", "PATCH", "DELETE"])
        .hints(&["dropdown"]),
    SettingSpec::new("auth_token", "Auth token (optional)", Literal::Text(""))
        .describe("Sent as a Bearer token in the Authorization header."),
    SettingSpec::new(
        "extra_headers",
        "Extra headers (JSON object)",
        Literal::Text(r#"{"Content-Type": "application/json; charset=utf-8"}"#),
    )
    .describe(r#"Additional request headers, e.g. {"X-Custom":"1"}."#),
    SettingSpec::new(
        "payload_template",
        "Body template (JSON with $placeholders)",
        Literal::Text(r#"{"channel":"a-slack-channel","message":"$message"}"#),
    )
    .describe("Rendered with incoming frame data using $placeholders.")
    .required(),
    SettingSpec::new("timeout_sec", "Timeout (seconds)", Literal::Number(10))
        .describe("Request timeout in seconds.")
        .min(1, 1),
    SettingSpec::new("log_payload", "Log rendered JSON body", Literal::Bool(true)),
    SettingSpec::new("enabled", "Enable or Disable", Literal::Bool(true)),
];

pub const ID: &str = "5c62aa25-cee0-4d20-914e-caadb73ae97f";
pub const NAME: &str = "rest";

const DESCRIPTOR: ElementDescriptor = ElementDescriptor {
    id: ID,
    name: NAME,
    display_name: "REST API",
    description: "Send an HTTP request to any REST endpoint using a template body.",
    version: "0.1.10",
    inputs: &["input"],
    outputs: &[],
    settings: SETTINGS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(anyhow!("unsupported HTTP method '{}'", other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET and DELETE carry the rendered object as query parameters.
    pub fn uses_query(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

#[derive(Clone, Debug)]
pub struct ForwarderConfig {
    pub endpoint: Url,
    pub method: HttpMethod,
    /// Final request headers, in send order, names unique ignoring case.
    pub headers: Vec<(String, String)>,
    pub template: Template,
    pub timeout: Duration,
    pub log_payload: bool,
    pub enabled: bool,
}

impl ForwarderConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let raw_url = settings.text("url")?;
        let endpoint =
            Url::parse(raw_url.trim()).with_context(|| format!("invalid url '{}'", raw_url))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported url scheme '{}'; expected http(s)",
                endpoint.scheme()
            ));
        }

        let mut headers = vec![(
            "Content-Type".to_string(),
            DEFAULT_CONTENT_TYPE.to_string(),
        )];
        for (name, value) in parse_extra_headers(settings.text("extra_headers")?)? {
            merge_header(&mut headers, name, value);
        }
        let token = settings.text("auth_token")?.trim();
        if !token.is_empty() {
            merge_header(
                &mut headers,
                "Authorization".to_string(),
                format!("Bearer {}", token),
            );
        }

        let timeout_sec = settings.number("timeout_sec")?;
        let timeout_sec = u64::try_from(timeout_sec)
            .ok()
            .filter(|s| *s >= 1)
            .ok_or_else(|| anyhow!("timeout_sec must be at least 1, got {}", timeout_sec))?;

        Ok(Self {
            endpoint,
            method: HttpMethod::parse(settings.text("method")?)?,
            headers,
            template: Template::new(settings.text("payload_template")?),
            timeout: Duration::from_secs(timeout_sec),
            log_payload: settings.flag("log_payload")?,
            enabled: settings.flag("enabled")?,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the `extra_headers` setting. An empty string means no headers.
pub fn parse_extra_headers(raw: &str) -> Result<Vec<(String, String)>> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| anyhow!("extra_headers is not valid JSON: {}", e))?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| anyhow!("extra_headers must decode to a JSON object"))?;
    obj.iter()
        .map(|(name, value)| match value {
            Value::String(v) => Ok((name.clone(), v.clone())),
            other => Err(anyhow!(
                "extra_headers value for '{}' must be a string, got {}",
                name,
                other
            )),
        })
        .collect()
}

fn merge_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
    {
        Some(slot) => *slot = (name, value),
        None => headers.push((name, value)),
    }
}

/// Why a frame was not sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Rendered body still contains `$`.
    UnresolvedPlaceholders(String),
    InvalidJson(String),
    /// GET/DELETE need an object to turn into query parameters.
    NotAnObject,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnresolvedPlaceholders(rendered) => {
                write!(f, "unresolved placeholders in body: {}", rendered)
            }
            SkipReason::InvalidJson(err) => write!(f, "body template rendered invalid JSON: {}", err),
            SkipReason::NotAnObject => write!(f, "query methods need a JSON object body"),
        }
    }
}

/// Outcome of forwarding one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Disabled,
    Skipped(SkipReason),
    Delivered { status: u16, body: String },
    /// The endpoint answered with a non-2xx status.
    Rejected { status: u16, body: String },
    Failed(String),
}

/// Render the body for one frame: substitute, reject leftovers, parse JSON.
pub fn render_body(template: &Template, frame: &Frame) -> std::result::Result<Value, SkipReason> {
    let mapping = mapping_from(frame.text_or_empty(), &frame.other_data);
    let rendered = template.safe_substitute(&mapping);
    if rendered.contains('$') {
        return Err(SkipReason::UnresolvedPlaceholders(rendered));
    }
    serde_json::from_str(&rendered).map_err(|e| SkipReason::InvalidJson(e.to_string()))
}

/// Send one rendered body. A fresh agent (and connection) per request.
pub fn send(config: &ForwarderConfig, body: &Value) -> Dispatch {
    let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
    let mut request = agent.request_url(config.method.as_str(), &config.endpoint);
    for (name, value) in &config.headers {
        request = request.set(name, value);
    }

    let result = if config.method.uses_query() {
        let Some(obj) = body.as_object() else {
            return Dispatch::Skipped(SkipReason::NotAnObject);
        };
        for (key, value) in obj {
            request = request.query(key, &placeholder_text(value));
        }
        request.call()
    } else {
        request.send_string(&body.to_string())
    };

    match result {
        Ok(response) => {
            let status = response.status();
            Dispatch::Delivered {
                status,
                body: response.into_string().unwrap_or_default(),
            }
        }
        Err(ureq::Error::Status(status, response)) => Dispatch::Rejected {
            status,
            body: response.into_string().unwrap_or_default(),
        },
        Err(err) => Dispatch::Failed(err.to_string()),
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_LOGGED_RESPONSE_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct WebhookForwarder {
    config: Option<ForwarderConfig>,
}

impl WebhookForwarder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn with_config(config: ForwarderConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn config(&self) -> Option<&ForwarderConfig> {
        self.config.as_ref()
    }

    /// Forward one frame. Errors only when called before startup; every
    /// per-frame failure is reported through the returned `Dispatch`.
    pub fn forward(&self, frame: &Frame) -> Result<Dispatch> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| anyhow!("rest executed before startup"))?;
        if !config.enabled {
            return Ok(Dispatch::Disabled);
        }

        let body = match render_body(&config.template, frame) {
            Ok(body) => body,
            Err(reason) => {
                log::warn!("rest: skipping frame: {}", reason);
                return Ok(Dispatch::Skipped(reason));
            }
        };
        if config.log_payload {
            log::info!("rest: body {}", body);
        }

        let outcome = send(config, &body);
        match &outcome {
            Dispatch::Delivered { status, body } => log::info!(
                "rest: {} {} -> {} {}",
                config.method.as_str(),
                config.endpoint,
                status,
                truncate(body)
            ),
            Dispatch::Rejected { status, body } => log::warn!(
                "rest: {} {} rejected with {} {}",
                config.method.as_str(),
                config.endpoint,
                status,
                truncate(body)
            ),
            Dispatch::Failed(err) => log::error!(
                "rest: {} {} failed: {}",
                config.method.as_str(),
                config.endpoint,
                err
            ),
            Dispatch::Skipped(reason) => log::warn!("rest: skipping frame: {}", reason),
            Dispatch::Disabled => {}
        }
        Ok(outcome)
    }
}

impl Default for WebhookForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for WebhookForwarder {
    fn descriptor(&self) -> ElementDescriptor {
        DESCRIPTOR
    }

    fn startup(&mut self, ctx: &Context<'_>) -> Result<()> {
        let config = ForwarderConfig::from_settings(ctx.settings())?;
        log::info!(
            "rest: {} {} (timeout {}s, enabled={})",
            config.method.as_str(),
            config.endpoint,
            config.timeout.as_secs(),
            config.enabled
        );
        log::debug!(
            "rest: template placeholders {:?}",
            config.template.placeholders()
        );
        self.config = Some(config);
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &Context<'_>) -> Result<()> {
        log::info!("generic REST element shutting down");
        Ok(())
    }

    fn execute(&mut self, _ctx: &Context<'_>, frame: &Frame) -> Result<Vec<OutputEvent>> {
        self.forward(frame)?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn settings(overrides: Value) -> Settings {
        let raw: Map<String, Value> = overrides.as_object().cloned().unwrap_or_default();
        Settings::resolve(SETTINGS, &raw).expect("settings resolve")
    }

    #[test]
    fn headers_merge_defaults_extras_and_token() {
        let cfg = ForwarderConfig::from_settings(&settings(json!({
            "extra_headers": r#"{"content-type": "application/json; charset=utf-8", "X-Custom": "1"}"#,
            "auth_token": "s3cret"
        })))
        .unwrap();
        assert_eq!(cfg.header("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(cfg.header("x-custom"), Some("1"));
        assert_eq!(cfg.header("Authorization"), Some("Bearer s3cret"));
        assert_eq!(cfg.headers.len(), 3);
    }

    #[test]
    fn empty_extra_headers_means_none() {
        let cfg = ForwarderConfig::from_settings(&settings(json!({"extra_headers": ""}))).unwrap();
        assert_eq!(cfg.headers, vec![("Content-Type".to_string(), "application/json".to_string())]);
    }

    #[test]
    fn extra_headers_must_be_json_object_of_strings() {
        let err = parse_extra_headers("not json").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
        let err = parse_extra_headers("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
        assert!(parse_extra_headers(r#"{"X-Retry": 3}"#).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let err =
            ForwarderConfig::from_settings(&settings(json!({"url": "ftp://example.com/x"})))
                .unwrap_err();
        assert!(err.to_string().contains("scheme"));
        assert!(ForwarderConfig::from_settings(&settings(json!({"url": "not a url"}))).is_err());
    }

    #[test]
    fn render_uses_text_and_metadata() {
        let frame = Frame {
            text: Some("caption".to_string()),
            other_data: json!({"message": "hi", "count": 2}).as_object().cloned().unwrap(),
            ..Frame::default()
        };
        let tpl = Template::new(r#"{"msg":"$message","t":"$text","n":$count}"#);
        assert_eq!(
            render_body(&tpl, &frame).unwrap(),
            json!({"msg": "hi", "t": "caption", "n": 2})
        );
    }

    #[test]
    fn render_reports_leftovers_and_bad_json() {
        let frame = Frame::message("hi");
        let tpl = Template::new(r#"{"msg":"$missing"}"#);
        assert_eq!(
            render_body(&tpl, &frame),
            Err(SkipReason::UnresolvedPlaceholders(r#"{"msg":"$missing"}"#.to_string()))
        );

        let tpl = Template::new(r#"{"msg": $message}"#);
        assert!(matches!(render_body(&tpl, &frame), Err(SkipReason::InvalidJson(_))));
    }

    #[test]
    fn disabled_forwarder_sends_nothing() {
        let cfg = ForwarderConfig::from_settings(&settings(json!({"enabled": false}))).unwrap();
        let forwarder = WebhookForwarder::with_config(cfg);
        assert_eq!(forwarder.forward(&Frame::message("hi")).unwrap(), Dispatch::Disabled);
    }

    #[test]
    fn method_parsing() {
        assert_eq!(HttpMethod::parse("patch").unwrap(), HttpMethod::Patch);
        assert!(HttpMethod::Delete.uses_query());
        assert!(!HttpMethod::Put.uses_query());
        assert!(HttpMethod::parse("TRACE").is_err());
    }
}
