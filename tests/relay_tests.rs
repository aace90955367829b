// Face relay frame handling: error replies for bad input and verbatim
// forwarding through a proxy backend.

mod common;

use axum::http::StatusCode;
use base64::Engine;
use multimodal_sessions::relay::FaceRelay;
use std::time::Duration;

fn unconfigured_relay() -> FaceRelay {
    FaceRelay::new(None, None, None, Duration::from_secs(2)).unwrap()
}

fn assert_error_frame(reply: &str) -> serde_json::Value {
    let value: serde_json::Value = serde_json::from_str(reply).unwrap();
    assert_eq!(value["type"], serde_json::json!("error"));
    assert_eq!(value["message"], serde_json::json!("Failed to process frame"));
    assert!(value["error"].as_str().is_some());
    value
}

#[tokio::test]
async fn malformed_json_answers_an_error_frame() {
    let relay = unconfigured_relay();
    let reply = relay.handle_frame("{this is not json").await;
    assert_error_frame(&reply);
}

#[tokio::test]
async fn missing_payload_field_answers_an_error_frame() {
    let relay = unconfigured_relay();
    let reply = relay
        .handle_frame(&serde_json::json!({ "kind": "frame" }).to_string())
        .await;
    let value = assert_error_frame(&reply);
    assert!(value["error"].as_str().unwrap().contains("data or file"));
}

#[tokio::test]
async fn invalid_base64_answers_an_error_frame() {
    let relay = unconfigured_relay();
    let reply = relay
        .handle_frame(&serde_json::json!({ "data": "!!!not-base64!!!" }).to_string())
        .await;
    let value = assert_error_frame(&reply);
    assert!(value["error"].as_str().unwrap().contains("base64"));
}

#[tokio::test]
async fn valid_frame_without_any_target_answers_an_error_frame() {
    let relay = unconfigured_relay();
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"jpegbytes");
    let reply = relay
        .handle_frame(&serde_json::json!({ "data": encoded }).to_string())
        .await;
    let value = assert_error_frame(&reply);
    assert!(value["error"].as_str().unwrap().contains("configured"));
}

#[tokio::test]
async fn proxy_target_forwards_and_relays_the_response_verbatim() {
    let (proxy_url, mut bodies) = common::spawn_analyze_server(
        serde_json::json!({ "face": { "predictions": [] } }),
        StatusCode::OK,
    )
    .await;
    let relay = FaceRelay::new(None, None, Some(proxy_url), Duration::from_secs(5)).unwrap();

    let encoded = base64::engine::general_purpose::STANDARD.encode(b"jpegbytes");
    // Browser clients send data-URL payloads; the header is stripped before
    // forwarding.
    let frame = serde_json::json!({ "data": format!("data:image/jpeg;base64,{encoded}") });
    let reply = relay.handle_frame(&frame.to_string()).await;

    let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(value, serde_json::json!({ "face": { "predictions": [] } }));

    let seen = bodies.recv().await.expect("proxy saw no request");
    assert_eq!(seen, serde_json::json!({ "data": encoded }));
}

#[tokio::test]
async fn accepts_the_file_field_alias() {
    let (proxy_url, mut bodies) =
        common::spawn_analyze_server(serde_json::json!({}), StatusCode::OK).await;
    let relay = FaceRelay::new(None, None, Some(proxy_url), Duration::from_secs(5)).unwrap();

    let encoded = base64::engine::general_purpose::STANDARD.encode(b"frame");
    let reply = relay
        .handle_frame(&serde_json::json!({ "file": encoded }).to_string())
        .await;
    assert_eq!(reply, "{}");

    let seen = bodies.recv().await.expect("proxy saw no request");
    assert_eq!(seen["data"], serde_json::json!(encoded));
}
