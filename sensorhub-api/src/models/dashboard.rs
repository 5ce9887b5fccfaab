use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub light: i64,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedSnapshot {
    pub state: u8,
    pub status: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTimestamps {
    #[serde(with = "time::serde::rfc3339::option")]
    pub dht: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ldr: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub led: Option<OffsetDateTime>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub sensors: SensorSnapshot,
    pub led: LedSnapshot,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
    pub timestamps: SnapshotTimestamps,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub data: DashboardData,
}
