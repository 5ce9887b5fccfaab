use axum::body::Body;
use axum::http::{Request, StatusCode};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

mod common;
use common::mock_app::{LED_TOPIC, MockApp, SENSOR_TOPIC, read_json};

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = MockApp::new().await.with_sensor_handle();

    let request = Request::builder()
        .uri("/api/sensors/chart")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized, no token provided.");

    let request = Request::builder()
        .uri("/api/dashboard/data")
        .header("Authorization", "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/dashboard/data")
        .header("Authorization", "Basic YWRtaW46YWRtaW4=")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chart_after_ingest() {
    let app = MockApp::new().await.with_sensor_handle();

    let body = read_json(app.get_authorized("/api/sensors/chart?minutes=0").await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["dht"]["count"], 0);
    assert_eq!(body["data"]["dht"]["labels"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["ldr"]["count"], 0);

    let started_at = OffsetDateTime::now_utc();
    assert_eq!(app.publish(SENSOR_TOPIC, r#"{"temperature":26.4,"humidity":61.0}"#).await, 1);

    let response = app.get_authorized("/api/sensors/chart?minutes=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let dht = &body["data"]["dht"];
    assert_eq!(dht["count"], 1);
    assert_eq!(dht["temperature"][0], 26.4);
    assert_eq!(dht["humidity"][0], 61.0);

    let received_at = OffsetDateTime::parse(dht["timestamps"][0].as_str().unwrap(), &Rfc3339).unwrap();
    assert!(received_at >= started_at - Duration::seconds(1));
    assert_eq!(body["data"]["timeRange"]["minutes"], 1);
}

#[tokio::test]
async fn test_chart_rejects_bad_minutes() {
    let app = MockApp::new().await.with_sensor_handle();

    let response = app.get_authorized("/api/sensors/chart?minutes=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get_authorized("/api/sensors/chart?minutes=-5").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_range() {
    let app = MockApp::new().await.with_sensor_handle();
    app.publish(SENSOR_TOPIC, r#"{"temperature":20,"humidity":40}"#).await;
    app.publish(SENSOR_TOPIC, r#"{"light_level":900,"voltage":2.1,"light_status":2}"#).await;

    let response = app.get_authorized("/api/sensors/range?startTime=2024-01-01T00:00:00Z").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["message"], "startTime and endTime are required");

    let response = app.get_authorized("/api/sensors/range?startTime=soon&endTime=later").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let now = OffsetDateTime::now_utc();
    let start = (now - Duration::minutes(5)).unix_timestamp() * 1000;
    let end = (now + Duration::minutes(5)).unix_timestamp() * 1000;

    let body = read_json(
        app.get_authorized(&format!("/api/sensors/range?startTime={start}&endTime={end}"))
            .await,
    )
    .await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["dataType"], "LDR");
    assert_eq!(body["data"][0]["lightStatus"], "Bright");
    assert!(body["data"][0].get("temperature").is_none());
    assert!(body["timeRange"]["startTime"].is_string());

    let body = read_json(
        app.get_authorized(&format!("/api/sensors/range?startTime={start}&endTime={end}&type=DHT"))
            .await,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["temperature"], 20.0);
}

#[tokio::test]
async fn test_typed_lists_and_latest() {
    let app = MockApp::new().await.with_sensor_handle();
    for i in 0..3 {
        app.publish(SENSOR_TOPIC, &format!(r#"{{"temperature":{i},"humidity":50}}"#)).await;
    }
    app.publish(SENSOR_TOPIC, r#"{"lightLevel":100}"#).await;
    app.publish(LED_TOPIC, "0").await;

    let body = read_json(app.get_authorized("/api/sensors/dht?limit=2").await).await;
    assert_eq!(body["count"], 2);
    assert!(body["data"].as_array().unwrap().iter().all(|r| r["dataType"] == "DHT"));

    let body = read_json(app.get_authorized("/api/sensor-data/dht22").await).await;
    assert_eq!(body["count"], 3);

    let body = read_json(app.get_authorized("/api/sensors/ldr").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["lightLevel"], 100);

    let body = read_json(app.get_authorized("/api/sensors/latest").await).await;
    assert_eq!(body["count"], 5);

    let body = read_json(app.get_authorized("/api/sensors/latest?type=LED").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["ledState"], 0);

    let response = app.get_authorized("/api/sensors/latest?type=PIR").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get_authorized("/api/sensors/dht?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_without_dht_records() {
    let app = MockApp::new().await.with_sensor_handle();
    app.publish(SENSOR_TOPIC, r#"{"light_level":400}"#).await;
    app.publish(SENSOR_TOPIC, r#"{"light_level":600}"#).await;

    let response = app.get_authorized("/api/sensors/stats").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["timeRange"], "24 hours");
    assert!(body["statistics"]["dht"].is_null());
    assert_eq!(body["statistics"]["ldr"]["count"], 2);
    assert_eq!(body["statistics"]["ldr"]["avgLightLevel"], 500.0);
    assert_eq!(body["statistics"]["ldr"]["minLightLevel"], 400);
}

#[tokio::test]
async fn test_dashboard_snapshot() {
    let app = MockApp::new().await.with_sensor_handle();

    let body = read_json(app.get_authorized("/api/dashboard/data").await).await;
    assert_eq!(body["data"]["sensors"]["temperature"], 0.0);
    assert_eq!(body["data"]["led"]["status"], "OFF");
    assert_eq!(body["data"]["status"], "online");
    assert!(body["data"]["timestamps"]["dht"].is_null());

    app.publish(SENSOR_TOPIC, r#"{"temperature":23.5,"humidity":55.5,"timestamp":1700000000000}"#)
        .await;
    app.publish(SENSOR_TOPIC, r#"{"light_level":1234}"#).await;

    let body = read_json(app.get_authorized("/api/dashboard/data").await).await;
    assert_eq!(body["data"]["sensors"]["temperature"], 23.5);
    assert_eq!(body["data"]["sensors"]["humidity"], 55.5);
    assert_eq!(body["data"]["sensors"]["light"], 1234);
    assert_eq!(body["data"]["lastUpdate"], body["data"]["timestamps"]["dht"]);
}

#[tokio::test]
async fn test_malformed_payload_does_not_stop_ingestion() {
    let app = MockApp::new().await.with_sensor_handle();

    assert_eq!(app.publish(SENSOR_TOPIC, "temperature=20").await, 0);
    assert_eq!(app.publish(SENSOR_TOPIC, r#"{"pressure":1013}"#).await, 0);
    assert_eq!(app.publish(SENSOR_TOPIC, r#"{"temperature":19,"humidity":45}"#).await, 1);

    let body = read_json(app.get_authorized("/api/sensors/latest").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["rawPayload"], r#"{"temperature":19,"humidity":45}"#);
}
