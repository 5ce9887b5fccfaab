use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router, middleware};
use sensorhub_api::models::*;
use time::OffsetDateTime;

use crate::errors::{ApiError, SensorError};
use crate::middlewares::{TokenState, auth};
use crate::services::{DEFAULT_LATEST_LIMIT, DEFAULT_TYPED_LIMIT, QueryService};

#[derive(Clone)]
pub struct SensorState {
    pub query_service: Arc<QueryService>,
}

pub fn sensor_router(sensor_state: SensorState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/dashboard/data", get(get_dashboard_data))
        .route("/api/sensors/chart", get(get_chart_data))
        .route("/api/sensors/range", get(get_sensor_data_in_range))
        .route("/api/sensors/dht", get(get_dht_data))
        .route("/api/sensors/ldr", get(get_ldr_data))
        .route("/api/sensors/latest", get(get_latest_sensor_data))
        .route("/api/sensors/stats", get(get_sensor_stats))
        .route("/api/sensor-data/dht22", get(get_dht_data))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(sensor_state)
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, SensorError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| SensorError::InvalidQuery(rejection.body_text()))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/data",
    tag = "sensors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Latest reading of every sensor", body = DashboardResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_dashboard_data(State(state): State<SensorState>) -> Result<Json<DashboardResponse>, ApiError> {
    let data = state.query_service.dashboard(OffsetDateTime::now_utc()).await?;

    Ok(Json(DashboardResponse { success: true, data }))
}

#[utoipa::path(
    get,
    path = "/api/sensors/chart",
    tag = "sensors",
    security(("bearer_auth" = [])),
    params(("minutes" = Option<i64>, Query, description = "Window length in minutes, default 1")),
    responses(
        (status = 200, description = "DHT and LDR series, oldest first", body = ChartResponse),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_chart_data(
    State(state): State<SensorState>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<Json<ChartResponse>, ApiError> {
    let query = query_params(query)?;

    let data = state
        .query_service
        .chart(query.minutes, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(ChartResponse { success: true, data }))
}

#[utoipa::path(
    get,
    path = "/api/sensors/range",
    tag = "sensors",
    security(("bearer_auth" = [])),
    params(
        ("startTime" = String, Query, description = "RFC 3339 instant or epoch milliseconds"),
        ("endTime" = String, Query, description = "RFC 3339 instant or epoch milliseconds"),
        ("type" = Option<DataType>, Query, description = "Only records of this type")
    ),
    responses(
        (status = 200, description = "Records in the range, newest first", body = RangeResponse),
        (status = 400, description = "Missing or invalid range"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_sensor_data_in_range(
    State(state): State<SensorState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<RangeResponse>, ApiError> {
    let query = query_params(query)?;

    let (data, time_range) = state
        .query_service
        .range(
            query.start_time.as_deref(),
            query.end_time.as_deref(),
            query.data_type.as_deref(),
        )
        .await?;

    Ok(Json(RangeResponse {
        success: true,
        count: data.len(),
        data,
        time_range,
    }))
}

async fn list_records(
    state: &SensorState,
    data_type: Option<&str>,
    limit: Option<i64>,
    default_limit: i64,
) -> Result<Json<RecordListResponse>, ApiError> {
    let data = state.query_service.latest(data_type, limit, default_limit).await?;

    Ok(Json(RecordListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/api/sensors/dht",
    tag = "sensors",
    security(("bearer_auth" = [])),
    params(("limit" = Option<i64>, Query, description = "Maximum records, default 20")),
    responses(
        (status = 200, description = "Latest DHT records, newest first", body = RecordListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_dht_data(
    State(state): State<SensorState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let query = query_params(query)?;

    list_records(&state, Some(DataType::Dht.as_str()), query.limit, DEFAULT_TYPED_LIMIT).await
}

#[utoipa::path(
    get,
    path = "/api/sensors/ldr",
    tag = "sensors",
    security(("bearer_auth" = [])),
    params(("limit" = Option<i64>, Query, description = "Maximum records, default 20")),
    responses(
        (status = 200, description = "Latest LDR records, newest first", body = RecordListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_ldr_data(
    State(state): State<SensorState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let query = query_params(query)?;

    list_records(&state, Some(DataType::Ldr.as_str()), query.limit, DEFAULT_TYPED_LIMIT).await
}

#[utoipa::path(
    get,
    path = "/api/sensors/latest",
    tag = "sensors",
    security(("bearer_auth" = [])),
    params(
        ("type" = Option<DataType>, Query, description = "Only records of this type"),
        ("limit" = Option<i64>, Query, description = "Maximum records, default 10")
    ),
    responses(
        (status = 200, description = "Latest records, newest first", body = RecordListResponse),
        (status = 400, description = "Unknown type or invalid limit"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_latest_sensor_data(
    State(state): State<SensorState>,
    query: Result<Query<LatestQuery>, QueryRejection>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let query = query_params(query)?;

    list_records(&state, query.data_type.as_deref(), query.limit, DEFAULT_LATEST_LIMIT).await
}

#[utoipa::path(
    get,
    path = "/api/sensors/stats",
    tag = "sensors",
    security(("bearer_auth" = [])),
    params(("hours" = Option<i64>, Query, description = "Lookback window in hours, default 24")),
    responses(
        (status = 200, description = "Min, max and average per sensor group", body = StatsResponse),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_sensor_stats(
    State(state): State<SensorState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<StatsResponse>, ApiError> {
    let query = query_params(query)?;

    let (hours, statistics) = state
        .query_service
        .statistics(query.hours, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(StatsResponse {
        success: true,
        time_range: format!("{hours} hours"),
        statistics,
    }))
}
