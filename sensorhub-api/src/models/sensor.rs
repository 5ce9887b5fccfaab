use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::UnknownTag;

/// Variant tag of a stored record.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Temperature and humidity
    #[serde(rename = "DHT")]
    Dht,
    /// Light level
    #[serde(rename = "LDR")]
    Ldr,
    /// LED state echo
    #[serde(rename = "LED")]
    Led,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Dht => "DHT",
            DataType::Ldr => "LDR",
            DataType::Led => "LED",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = UnknownTag;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_uppercase().as_str() {
            "DHT" => Ok(DataType::Dht),
            "LDR" => Ok(DataType::Ldr),
            "LED" => Ok(DataType::Led),
            _ => Err(UnknownTag(input.to_string())),
        }
    }
}

/// Coarse light classification reported by the LDR node.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightStatus {
    Dark,
    Dim,
    Bright,
}

impl LightStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LightStatus::Dark),
            1 => Some(LightStatus::Dim),
            2 => Some(LightStatus::Bright),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LightStatus::Dark => 0,
            LightStatus::Dim => 1,
            LightStatus::Bright => 2,
        }
    }
}

impl FromStr for LightStatus {
    type Err = UnknownTag;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "dark" => Ok(LightStatus::Dark),
            "dim" => Ok(LightStatus::Dim),
            "bright" => Ok(LightStatus::Bright),
            _ => Err(UnknownTag(input.to_string())),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecordResponse {
    pub id: i64,
    pub device_id: String,
    pub node_address: String,
    pub data_type: DataType,
    /// Temperature in Celsius
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity %
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Raw ADC reading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_status: Option<LightStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub led_state: Option<u8>,
    /// Epoch milliseconds as reported by the device
    pub device_timestamp: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    pub raw_payload: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordListResponse {
    pub success: bool,
    pub data: Vec<SensorRecordResponse>,
    pub count: usize,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeResponse {
    pub success: bool,
    pub data: Vec<SensorRecordResponse>,
    pub count: usize,
    pub time_range: RangeWindow,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DhtSeries {
    pub labels: Vec<String>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub timestamps: Vec<String>,
    pub count: usize,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdrSeries {
    pub labels: Vec<String>,
    pub light_level: Vec<i64>,
    pub voltage: Vec<Option<f64>>,
    pub light_status: Vec<Option<LightStatus>>,
    pub timestamps: Vec<String>,
    pub count: usize,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub minutes: i64,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub time_range: ChartWindow,
    pub dht: DhtSeries,
    pub ldr: LdrSeries,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartResponse {
    pub success: bool,
    pub data: ChartData,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhtStatistics {
    pub avg_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub avg_humidity: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
    pub count: i64,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdrStatistics {
    pub avg_light_level: f64,
    pub min_light_level: i64,
    pub max_light_level: i64,
    pub count: i64,
}

/// Aggregates per sensor group; a group without records in the window is `null`.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub dht: Option<DhtStatistics>,
    pub ldr: Option<LdrStatistics>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub success: bool,
    pub time_range: String,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartQuery {
    pub minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestQuery {
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeQuery {
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {
    pub hours: Option<i64>,
}
