//! REST forwarder tests against a one-shot local HTTP stub.

use serde_json::{json, Map, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use frame_elements::{
    Context, Dispatch, Element, Frame, SkipReason, Settings, WebhookForwarder,
};

#[derive(Debug)]
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Accept exactly one request, answer with `status` and `body`.
fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }
        let len = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).expect("body");

        let reason = if status < 300 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        let mut stream = stream;
        stream.write_all(response.as_bytes()).expect("write response");
        stream.flush().ok();

        tx.send(Captured {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(buf).expect("utf8 body"),
        })
        .ok();
    });
    (format!("http://{}/hook", addr), rx, handle)
}

/// URL on a port nobody listens on.
fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/hook", addr)
}

fn started(overrides: Value) -> anyhow::Result<WebhookForwarder> {
    let mut forwarder = WebhookForwarder::new();
    let raw: Map<String, Value> = overrides.as_object().cloned().unwrap_or_default();
    let settings = Settings::resolve(forwarder.descriptor().settings, &raw)?;
    forwarder.startup(&Context::new(&settings, Instant::now()))?;
    Ok(forwarder)
}

fn frame_with(data: Value) -> Frame {
    Frame {
        other_data: data.as_object().cloned().unwrap_or_default(),
        ..Frame::default()
    }
}

#[test]
fn posts_rendered_template_body() {
    let (url, rx, handle) = serve_once(200, r#"{"ok":true}"#);
    let forwarder = started(json!({
        "url": url,
        "payload_template": r#"{"msg":"$message"}"#,
        "extra_headers": r#"{"X-Custom": "1"}"#,
        "auth_token": "tok-123"
    }))
    .expect("startup");

    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi"})))
        .expect("forward");
    handle.join().expect("stub thread");
    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request captured");

    assert_eq!(
        outcome,
        Dispatch::Delivered {
            status: 200,
            body: r#"{"ok":true}"#.to_string()
        }
    );
    assert_eq!(captured.request_line, "POST /hook HTTP/1.1");
    assert_eq!(captured.body, r#"{"msg":"hi"}"#);
    assert_eq!(captured.header("Content-Type"), Some("application/json"));
    assert_eq!(captured.header("X-Custom"), Some("1"));
    assert_eq!(captured.header("Authorization"), Some("Bearer tok-123"));
}

#[test]
fn get_sends_object_as_query_parameters() {
    let (url, rx, handle) = serve_once(200, "{}");
    let forwarder = started(json!({
        "url": url,
        "method": "GET",
        "payload_template": r#"{"msg":"$message","n":$count}"#
    }))
    .expect("startup");

    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi", "count": 2})))
        .expect("forward");
    handle.join().expect("stub thread");
    let captured = rx.recv_timeout(Duration::from_secs(5)).expect("request captured");

    assert!(matches!(outcome, Dispatch::Delivered { status: 200, .. }));
    assert_eq!(captured.request_line, "GET /hook?msg=hi&n=2 HTTP/1.1");
    assert!(captured.body.is_empty());
}

#[test]
fn non_success_status_is_reported_not_raised() {
    let (url, _rx, handle) = serve_once(500, r#"{"error":"boom"}"#);
    let mut forwarder = started(json!({"url": url})).expect("startup");

    let settings = Settings::default();
    let ctx = Context::new(&settings, Instant::now());
    let outputs = forwarder
        .execute(&ctx, &frame_with(json!({"message": "hi"})))
        .expect("execute never fails per frame");
    handle.join().expect("stub thread");
    assert!(outputs.is_empty());
}

#[test]
fn rejected_status_carries_body() {
    let (url, _rx, handle) = serve_once(404, r#"{"error":"channel_not_found"}"#);
    let forwarder = started(json!({"url": url})).expect("startup");
    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi"})))
        .expect("forward");
    handle.join().expect("stub thread");
    assert_eq!(
        outcome,
        Dispatch::Rejected {
            status: 404,
            body: r#"{"error":"channel_not_found"}"#.to_string()
        }
    );
}

#[test]
fn connection_failure_is_reported() {
    let forwarder = started(json!({"url": closed_url(), "timeout_sec": 2})).expect("startup");
    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi"})))
        .expect("forward");
    assert!(matches!(outcome, Dispatch::Failed(_)));
}

#[test]
fn unresolved_placeholder_skips_send() {
    // Nothing listens on this URL; a send attempt would come back as Failed.
    let forwarder = started(json!({
        "url": closed_url(),
        "payload_template": r#"{"msg":"$missing"}"#
    }))
    .expect("startup");

    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi"})))
        .expect("forward");
    assert_eq!(
        outcome,
        Dispatch::Skipped(SkipReason::UnresolvedPlaceholders(
            r#"{"msg":"$missing"}"#.to_string()
        ))
    );
}

#[test]
fn invalid_rendered_json_skips_send() {
    let forwarder = started(json!({
        "url": closed_url(),
        "payload_template": r#"{"msg": $message}"#
    }))
    .expect("startup");
    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi"})))
        .expect("forward");
    assert!(matches!(outcome, Dispatch::Skipped(SkipReason::InvalidJson(_))));
}

#[test]
fn get_with_array_body_is_skipped() {
    let forwarder = started(json!({
        "url": closed_url(),
        "method": "DELETE",
        "payload_template": r#"["$message"]"#
    }))
    .expect("startup");
    let outcome = forwarder
        .forward(&frame_with(json!({"message": "hi"})))
        .expect("forward");
    assert_eq!(outcome, Dispatch::Skipped(SkipReason::NotAnObject));
}

#[test]
fn invalid_extra_headers_fail_startup() {
    let err = started(json!({"extra_headers": "not json"}))
        .err()
        .expect("startup must fail");
    assert!(format!("{err:#}").contains("extra_headers is not valid JSON"));

    let err = started(json!({"extra_headers": "[\"a\"]"}))
        .err()
        .expect("startup must fail");
    assert!(format!("{err:#}").contains("must decode to a JSON object"));
}

#[test]
fn unknown_method_is_a_settings_error() {
    assert!(started(json!({"method": "TRACE"})).is_err());
}

#[test]
fn forward_before_startup_is_an_error() {
    let forwarder = WebhookForwarder::new();
    assert!(forwarder.forward(&Frame::message("hi")).is_err());
}
