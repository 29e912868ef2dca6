//! End-to-end tests: real listener on an ephemeral loopback port, real HTTP
//! client, headless entry view on the test thread.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;

use question_bank::bridge::ImportBridgeState;
use question_bank::config::ImportConfig;
use question_bank::dispatch::{ui_channel, UiInbox};
use question_bank::entry::{ImportApplier, IMAGE_FAILED_MESSAGE};
use question_bank::memory_view::MemoryViewFactory;
use question_bank::preview::PreviewBox;
use question_bank::server::ListenerHandle;
use question_bank::view::ViewRegistry;

const TOKEN: &str = "test-token-0123456789";

fn png_base64(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    STANDARD.encode(out.into_inner())
}

fn ephemeral_config() -> ImportConfig {
    ImportConfig {
        bind: "127.0.0.1:0".to_string(),
        ..ImportConfig::default()
    }
}

struct Harness {
    bridge: ImportBridgeState,
    handle: ListenerHandle,
    inbox: UiInbox,
    client: Client,
}

impl Harness {
    fn start() -> Self {
        Self::start_with(ephemeral_config())
    }

    fn start_with(config: ImportConfig) -> Self {
        let (dispatcher, inbox) = ui_channel();
        let mut bridge = ImportBridgeState::with_token(TOKEN, config, dispatcher);
        let handle = bridge.start().unwrap();
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        Self {
            bridge,
            handle,
            inbox,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.local_addr(), path)
    }

    fn post_json(&self, body: &Value) -> (StatusCode, Value) {
        self.post_raw(body.to_string())
    }

    fn post_raw(&self, body: String) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.handle.endpoint())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .unwrap();
        let status = resp.status();
        (status, resp.json().unwrap())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.bridge.stop();
    }
}

fn applier() -> (ImportApplier, MemoryViewFactory) {
    let factory = MemoryViewFactory::new();
    let applier = ImportApplier::new(ViewRegistry::new(), factory.clone(), PreviewBox::default());
    (applier, factory)
}

#[test]
fn test_import_round_trip() {
    let h = Harness::start();
    let (mut applier, factory) = applier();

    let (status, body) = h.post_json(&json!({
        "token": TOKEN,
        "id": "ABC-123",
        "imageBase64": png_base64(20, 10),
    }));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "message": "Imported"}));

    let request = h.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
    applier.apply(request);

    let view = factory.last().unwrap();
    assert_eq!(view.question_id(), "ABC-123");
    assert_eq!(view.image_size(), Some((20, 10)));
    assert_eq!(view.focus_count(), 1);
}

#[test]
fn test_data_url_payload_accepted() {
    let h = Harness::start();
    let (status, _) = h.post_json(&json!({
        "token": TOKEN,
        "id": "Q-7",
        "imageBase64": format!("data:image/png;base64,{}", png_base64(3, 3)),
    }));
    assert_eq!(status, StatusCode::OK);
    let request = h.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(request.question_id, "Q-7");
}

#[test]
fn test_wrong_token_is_forbidden_and_leaves_view_untouched() {
    let h = Harness::start();
    let (mut applier, factory) = applier();
    let (status, _) = h.post_json(&json!({
        "token": TOKEN,
        "id": "KEEP-1",
        "imageBase64": png_base64(2, 2),
    }));
    assert_eq!(status, StatusCode::OK);
    let request = h.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
    applier.apply(request);

    for body in [
        json!({"token": "nope", "id": "Q1", "imageBase64": png_base64(2, 2)}),
        json!({"token": "nope", "id": 5, "imageBase64": "AAAA"}),
        json!({"token": 123, "id": "Q2", "imageBase64": "AAAA"}),
    ] {
        let (status, body) = h.post_json(&body);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({"ok": false, "message": "Invalid token"}));
    }

    assert!(h.inbox.recv_timeout(Duration::from_millis(200)).is_none());
    assert!(h.inbox.drain(&mut applier).is_empty());
    let view = factory.last().unwrap();
    assert_eq!(view.question_id(), "KEEP-1");
    assert_eq!(view.history(), vec!["KEEP-1"]);
}

#[test]
fn test_empty_data_url_payload_is_imported_with_placeholder() {
    let h = Harness::start();
    let (mut applier, factory) = applier();
    let (status, body) = h.post_json(&json!({
        "token": TOKEN,
        "id": "Q-EMPTY",
        "imageBase64": "data:image/png;base64,",
    }));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "message": "Imported"}));

    let request = h.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.image_bytes.is_empty());
    applier.apply(request);

    let view = factory.last().unwrap();
    assert_eq!(view.question_id(), "Q-EMPTY");
    assert_eq!(view.image_size(), None);
    assert_eq!(view.failure().as_deref(), Some(IMAGE_FAILED_MESSAGE));
    assert_eq!(view.focus_count(), 1);
}

#[test]
fn test_missing_image_is_bad_request() {
    let h = Harness::start();
    let (status, body) = h.post_json(&json!({"token": TOKEN, "id": "Q1"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing id or image");
    assert!(h.inbox.try_next().is_none());
}

#[test]
fn test_malformed_json_is_bad_request() {
    let h = Harness::start();
    let (status, body) = h.post_raw("{not json".to_string());
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"ok": false, "message": "Invalid JSON"}));
}

#[test]
fn test_invalid_base64_is_bad_request() {
    let h = Harness::start();
    let (status, body) = h.post_json(&json!({
        "token": TOKEN,
        "id": "Q1",
        "imageBase64": "@@@@",
    }));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid base64");
}

#[test]
fn test_unknown_path_is_json_404_with_cors() {
    let h = Harness::start();
    let resp = h.client.get(h.url("/nowhere")).send().unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    let body: Value = resp.json().unwrap();
    assert_eq!(body, json!({"ok": false, "message": "Not Found"}));
}

#[test]
fn test_preflight() {
    let h = Harness::start();
    let resp = h
        .client
        .request(reqwest::Method::OPTIONS, h.handle.endpoint())
        .header("Origin", "chrome-extension://abc")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert!(h.inbox.try_next().is_none());
}

#[test]
fn test_json_content_type_and_cors_on_success() {
    let h = Harness::start();
    let resp = h
        .client
        .post(h.handle.endpoint())
        .body(json!({"token": TOKEN, "id": "Q1", "imageBase64": png_base64(1, 1)}).to_string())
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[test]
fn test_wrong_method_is_405() {
    let h = Harness::start();
    let resp = h.client.get(h.handle.endpoint()).send().unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["ok"], false);
}

#[test]
fn test_oversized_body_is_413() {
    let h = Harness::start_with(ImportConfig {
        max_body_bytes: 1024,
        ..ephemeral_config()
    });
    let (status, body) = h.post_json(&json!({
        "token": TOKEN,
        "id": "Q1",
        "imageBase64": "A".repeat(4096),
    }));
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["ok"], false);
}

#[test]
fn test_client_not_ready_when_gui_gone() {
    let (dispatcher, inbox) = ui_channel();
    drop(inbox);
    let mut bridge = ImportBridgeState::with_token(TOKEN, ephemeral_config(), dispatcher);
    let handle = bridge.start().unwrap();

    let resp = Client::new()
        .post(handle.endpoint())
        .body(json!({"token": TOKEN, "id": "Q1", "imageBase64": png_base64(1, 1)}).to_string())
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().unwrap();
    assert_eq!(body, json!({"ok": false, "message": "Client not ready"}));
    bridge.stop();
}

#[test]
fn test_imports_applied_in_arrival_order() {
    let h = Harness::start();
    let (mut applier, factory) = applier();
    for id in ["Q1", "Q2"] {
        let (status, _) = h.post_json(&json!({
            "token": TOKEN,
            "id": id,
            "imageBase64": png_base64(2, 2),
        }));
        assert_eq!(status, StatusCode::OK);
    }

    for _ in 0..2 {
        let request = h.inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        applier.apply(request);
    }
    let view = factory.last().unwrap();
    assert_eq!(view.history(), vec!["Q1", "Q2"]);
    assert_eq!(view.question_id(), "Q2");
}

#[test]
fn test_start_is_idempotent() {
    let mut h = Harness::start();
    let again = h.bridge.start().unwrap();
    assert_eq!(again.local_addr(), h.handle.local_addr());
}

#[test]
fn test_busy_port_disables_import() {
    let h = Harness::start();
    let (dispatcher, _inbox) = ui_channel();
    let mut second = ImportBridgeState::with_token(
        TOKEN,
        ImportConfig {
            bind: h.handle.local_addr().to_string(),
            ..ImportConfig::default()
        },
        dispatcher,
    );
    assert!(second.start_or_disable().is_none());
    assert!(second.listener().is_none());
}

#[test]
fn test_non_loopback_bind_refused() {
    let (dispatcher, _inbox) = ui_channel();
    let mut bridge = ImportBridgeState::with_token(
        TOKEN,
        ImportConfig {
            bind: "0.0.0.0:0".to_string(),
            ..ImportConfig::default()
        },
        dispatcher,
    );
    assert!(bridge.start().is_err());
    assert!(bridge.start_or_disable().is_none());
}
