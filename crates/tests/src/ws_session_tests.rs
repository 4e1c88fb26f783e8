use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;

    let resp = reqwest::get(app.http_url("/health")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["active_sessions"].is_number());
}

#[tokio::test]
async fn interim_streams_original_then_translation() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_hypothesis("Hello", false).await;

    // The source is shown immediately, translation pending.
    let first = ws.recv_json().await;
    assert_eq!(first["type"], "translation");
    assert_eq!(first["data"]["type"], "interim");
    assert_eq!(first["data"]["original"]["full_text"], "Hello");
    assert_eq!(first["data"]["original"]["delta"], "Hello");
    assert_eq!(first["data"]["original"]["language"], "en");
    assert!(first["data"]["translation"].is_null());
    assert!(first["data"]["timestamp"].is_number());

    // After the debounce window the translated update follows.
    let second = ws.recv_json().await;
    assert_eq!(second["data"]["type"], "interim");
    assert_eq!(second["data"]["translation"]["full_text"], "zh:Hello");
    assert_eq!(second["data"]["translation"]["language"], "zh");

    ws.close().await;
}

#[tokio::test]
async fn final_cancels_pending_interim() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_hypothesis("Hello wo", false).await;
    let interim = ws.recv_json().await;
    assert_eq!(interim["data"]["type"], "interim");

    // The final lands inside the debounce window, so the next frame is the
    // final itself, not a stale interim translation.
    ws.send_hypothesis("Hello world", true).await;
    let frame = ws.recv_json().await;
    assert_eq!(frame["data"]["type"], "final");
    assert_eq!(frame["data"]["original"]["full_text"], "Hello world");
    assert_eq!(frame["data"]["original"]["delta"], "Hello world");
    assert_eq!(frame["data"]["translation"]["full_text"], "zh:Hello world");

    ws.close().await;
}

#[tokio::test]
async fn finals_are_released_in_order_with_monotonic_timestamps() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_hypothesis("first sentence", true).await;
    ws.send_hypothesis("second sentence", true).await;
    ws.send_hypothesis("third sentence", true).await;

    let mut released = Vec::new();
    let mut last_timestamp = 0u64;
    while released.len() < 3 {
        let frame = ws.recv_json().await;
        if frame["data"]["type"] == "final" {
            let timestamp = frame["data"]["timestamp"].as_u64().unwrap();
            assert!(timestamp >= last_timestamp);
            last_timestamp = timestamp;
            released.push(
                frame["data"]["original"]["full_text"]
                    .as_str()
                    .unwrap()
                    .to_string(),
            );
        }
    }
    assert_eq!(
        released,
        vec!["first sentence", "second sentence", "third sentence"]
    );

    ws.close().await;
}

#[tokio::test]
async fn config_update_applies_to_next_translation() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_json(&json!({
        "type": "update_translation_config",
        "data": { "target": "fr", "debounce": 50 },
    }))
    .await;
    let reply = ws.recv_json().await;
    assert_eq!(reply["type"], "config_result");
    assert_eq!(reply["data"]["status"], "ok");

    ws.send_hypothesis("bonjour tout le monde", true).await;
    loop {
        let frame = ws.recv_json().await;
        if frame["data"]["type"] == "final" {
            assert_eq!(
                frame["data"]["translation"]["full_text"],
                "fr:bonjour tout le monde"
            );
            assert_eq!(frame["data"]["translation"]["language"], "fr");
            break;
        }
    }

    ws.close().await;
}

#[tokio::test]
async fn out_of_range_config_values_are_clamped_and_acked() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_json(&json!({
        "type": "update_translation_config",
        "data": { "batch_size": 0, "debounce": 99000 },
    }))
    .await;
    let reply = ws.recv_json().await;
    assert_eq!(reply["data"]["status"], "ok");

    ws.close().await;
}

#[tokio::test]
async fn malformed_config_payload_reports_error() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_json(&json!({
        "type": "update_translation_config",
        "data": 42,
    }))
    .await;
    let reply = ws.recv_json().await;
    assert_eq!(reply["type"], "config_result");
    let status = reply["data"]["status"].as_str().unwrap();
    assert!(status.starts_with("error:"), "status: {status}");

    ws.close().await;
}

#[tokio::test]
async fn garbage_frames_do_not_break_the_session() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_raw("not json at all").await;
    ws.send_json(&json!({ "type": "bogus", "data": {} })).await;
    ws.send_json(&json!({ "type": "hypothesis", "data": { "no_text": true } }))
        .await;

    // The session is still alive and translating.
    ws.send_hypothesis("still alive", true).await;
    loop {
        let frame = ws.recv_json().await;
        if frame["data"]["type"] == "final" {
            assert_eq!(frame["data"]["original"]["full_text"], "still alive");
            break;
        }
    }

    ws.close().await;
}

#[tokio::test]
async fn ping_frame_gets_pong() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_ws().await;

    ws.send_json(&json!({ "type": "ping" })).await;
    let reply = ws.recv_json().await;
    assert_eq!(reply["type"], "pong");

    ws.close().await;
}
