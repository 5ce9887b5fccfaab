use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router, middleware};
use sensorhub_api::models::*;

use crate::errors::{ApiError, SensorError};
use crate::middlewares::{TokenState, auth};
use crate::services::{CommandPublisher, QueryService};

#[derive(Clone)]
pub struct ControlState {
    pub command_publisher: Arc<dyn CommandPublisher>,
    pub query_service: Arc<QueryService>,
}

pub fn control_router(control_state: ControlState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/led/control", post(control_led))
        .route("/api/led/toggle", post(toggle_led))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(control_state)
}

async fn send_led_command(state: &ControlState, led: LedState) -> Json<LedControlResponse> {
    let outcome = state.command_publisher.publish_led(led).await;

    Json(LedControlResponse {
        success: true,
        message: format!("LED turned {led}"),
        state: led.code(),
        published: outcome.is_published(),
    })
}

#[utoipa::path(
    post,
    path = "/api/led/control",
    tag = "led",
    security(("bearer_auth" = [])),
    request_body = LedControlRequest,
    responses(
        (status = 200, description = "Command handed to the broker, or dropped when disconnected", body = LedControlResponse),
        (status = 400, description = "State is not 0 or 1"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn control_led(
    State(state): State<ControlState>,
    body: Result<Json<LedControlRequest>, JsonRejection>,
) -> Result<Json<LedControlResponse>, ApiError> {
    let Json(body) = body.map_err(|_| SensorError::InvalidLedState)?;

    let led = body
        .state
        .and_then(LedState::from_code)
        .ok_or(SensorError::InvalidLedState)?;

    Ok(send_led_command(&state, led).await)
}

#[utoipa::path(
    post,
    path = "/api/led/toggle",
    tag = "led",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Inverse of the last reported LED state was sent", body = LedControlResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn toggle_led(State(state): State<ControlState>) -> Result<Json<LedControlResponse>, ApiError> {
    let current = state.query_service.latest_led_state().await?;

    Ok(send_led_command(&state, current.toggled()).await)
}
