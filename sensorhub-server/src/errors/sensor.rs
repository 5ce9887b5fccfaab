use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("startTime and endTime are required")]
    MissingTimeRange,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown sensor type: {0}")]
    InvalidDataType(String),

    #[error("Time window must be a non-negative number")]
    InvalidWindow,

    #[error("Limit must be a positive number")]
    InvalidLimit,

    #[error("LED state must be 0 (OFF) or 1 (ON)")]
    InvalidLedState,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl SensorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SensorError::MissingTimeRange => StatusCode::BAD_REQUEST,
            SensorError::InvalidTimestamp(_) => StatusCode::BAD_REQUEST,
            SensorError::InvalidDataType(_) => StatusCode::BAD_REQUEST,
            SensorError::InvalidWindow => StatusCode::BAD_REQUEST,
            SensorError::InvalidLimit => StatusCode::BAD_REQUEST,
            SensorError::InvalidLedState => StatusCode::BAD_REQUEST,
            SensorError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        }
    }
}
