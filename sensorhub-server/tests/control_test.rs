use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use sensorhub_api::models::LedState;
use serde_json::json;

mod common;
use common::mock_app::{LED_TOPIC, MockApp, read_json};

#[tokio::test]
async fn test_led_control_then_echo_updates_dashboard() {
    let app = MockApp::new().await.with_control_handle().with_sensor_handle();
    let token = app.admin_token();

    let response = app.post_json("/api/led/control", json!({ "state": 1 }), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["state"], 1);
    assert_eq!(body["published"], true);
    assert_eq!(body["message"], "LED turned ON");
    assert_eq!(app.publisher.sent(), vec![LedState::On]);

    // Nothing changes until the device echoes the new state
    let body = read_json(app.get_authorized("/api/dashboard/data").await).await;
    assert_eq!(body["data"]["led"]["state"], 0);

    assert_eq!(app.publish(LED_TOPIC, "1").await, 1);

    let body = read_json(app.get_authorized("/api/dashboard/data").await).await;
    assert_eq!(body["data"]["led"]["state"], 1);
    assert_eq!(body["data"]["led"]["status"], "ON");
}

#[tokio::test]
async fn test_led_control_rejects_invalid_state() {
    let app = MockApp::new().await.with_control_handle();
    let token = app.admin_token();

    for body in [json!({ "state": 2 }), json!({ "state": "1" }), json!({}), json!({ "state": -1 })] {
        let response = app.post_json("/api/led/control", body, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["message"], "LED state must be 0 (OFF) or 1 (ON)");
    }

    assert!(app.publisher.sent().is_empty());
}

#[tokio::test]
async fn test_led_control_requires_token() {
    let app = MockApp::new().await.with_control_handle();

    let response = app.post_json("/api/led/control", json!({ "state": 1 }), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.publisher.sent().is_empty());
}

#[tokio::test]
async fn test_led_control_while_disconnected() {
    let app = MockApp::new().await.with_control_handle();
    app.publisher.connected.store(false, Ordering::SeqCst);

    let response = app
        .post_json("/api/led/control", json!({ "state": 0 }), Some(&app.admin_token()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["published"], false);
    assert!(app.publisher.sent().is_empty());
}

#[tokio::test]
async fn test_led_toggle_inverts_last_echo() {
    let app = MockApp::new().await.with_control_handle();
    let token = app.admin_token();

    let body = read_json(app.post_json("/api/led/toggle", json!({}), Some(&token)).await).await;
    assert_eq!(body["state"], 1);

    app.publish(LED_TOPIC, "1").await;

    let body = read_json(app.post_json("/api/led/toggle", json!({}), Some(&token)).await).await;
    assert_eq!(body["state"], 0);
    assert_eq!(body["message"], "LED turned OFF");

    assert_eq!(app.publisher.sent(), vec![LedState::On, LedState::Off]);
}
