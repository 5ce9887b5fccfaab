use std::sync::Arc;

use sensorhub_api::models::{
    ChartData, ChartWindow, DashboardData, DataType, DhtSeries, LedSnapshot, LedState, LdrSeries, RangeWindow,
    SensorRecordResponse, SensorSnapshot, SnapshotTimestamps, Statistics,
};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::errors::{ApiError, SensorError};
use crate::models::{SensorReading, SensorRecord};
use crate::repositories::SensorRecordRepository;

pub const DEFAULT_CHART_MINUTES: i64 = 1;
pub const DEFAULT_STATS_HOURS: i64 = 24;
pub const DEFAULT_TYPED_LIMIT: i64 = 20;
pub const DEFAULT_LATEST_LIMIT: i64 = 10;

/// Read side of the record store, shaped for the dashboard and the charts.
pub struct QueryService {
    sensor_record_repository: Arc<SensorRecordRepository>,
}

impl QueryService {
    pub fn new(sensor_record_repository: Arc<SensorRecordRepository>) -> Self {
        Self {
            sensor_record_repository,
        }
    }

    /// Latest reading per type. Missing types fall back to zero values.
    pub async fn dashboard(&self, now: OffsetDateTime) -> Result<DashboardData, ApiError> {
        let dht = self.sensor_record_repository.find_latest_by_type(DataType::Dht).await?;
        let ldr = self.sensor_record_repository.find_latest_by_type(DataType::Ldr).await?;
        let led = self.sensor_record_repository.find_latest_by_type(DataType::Led).await?;

        let led_state = led_state_of(led.as_ref());

        Ok(DashboardData {
            sensors: SensorSnapshot {
                temperature: dht.as_ref().and_then(|r| r.temperature).unwrap_or_default(),
                humidity: dht.as_ref().and_then(|r| r.humidity).unwrap_or_default(),
                light: ldr.as_ref().and_then(|r| r.light_level).unwrap_or_default(),
            },
            led: LedSnapshot {
                state: led_state.code(),
                status: led_state.to_string(),
            },
            status: String::from("online"),
            last_update: dht
                .as_ref()
                .or(ldr.as_ref())
                .map(|r| r.received_at)
                .unwrap_or(now),
            timestamps: SnapshotTimestamps {
                dht: dht.map(|r| r.received_at),
                ldr: ldr.map(|r| r.received_at),
                led: led.map(|r| r.received_at),
            },
        })
    }

    /// DHT and LDR series over `[now - minutes, now]`, oldest first.
    pub async fn chart(&self, minutes: Option<i64>, now: OffsetDateTime) -> Result<ChartData, ApiError> {
        let minutes = minutes.unwrap_or(DEFAULT_CHART_MINUTES);
        let start = window_start(now, minutes, 60)?;

        let dht_records = self
            .sensor_record_repository
            .find_by_type_in_window(DataType::Dht, start, now)
            .await?;
        let ldr_records = self
            .sensor_record_repository
            .find_by_type_in_window(DataType::Ldr, start, now)
            .await?;

        let mut dht = DhtSeries::default();
        for record in dht_records {
            let (Some(temperature), Some(humidity)) = (record.temperature, record.humidity) else {
                continue;
            };
            let (label, timestamp) = chart_stamp(record.received_at)?;

            dht.labels.push(label);
            dht.temperature.push(temperature);
            dht.humidity.push(humidity);
            dht.timestamps.push(timestamp);
        }
        dht.count = dht.labels.len();

        let mut ldr = LdrSeries::default();
        for record in ldr_records {
            let Some(SensorReading::Ldr {
                light_level,
                voltage,
                light_status,
            }) = record.reading()
            else {
                continue;
            };
            let (label, timestamp) = chart_stamp(record.received_at)?;

            ldr.labels.push(label);
            ldr.light_level.push(light_level);
            ldr.voltage.push(voltage);
            ldr.light_status.push(light_status);
            ldr.timestamps.push(timestamp);
        }
        ldr.count = ldr.labels.len();

        Ok(ChartData {
            time_range: ChartWindow {
                start,
                end: now,
                minutes,
            },
            dht,
            ldr,
        })
    }

    /// Records between two instants, newest first.
    pub async fn range(
        &self,
        start_time: Option<&str>,
        end_time: Option<&str>,
        data_type: Option<&str>,
    ) -> Result<(Vec<SensorRecordResponse>, RangeWindow), ApiError> {
        let (Some(start_time), Some(end_time)) = (non_empty(start_time), non_empty(end_time)) else {
            return Err(SensorError::MissingTimeRange.into());
        };

        let start_time = parse_instant(start_time)?;
        let end_time = parse_instant(end_time)?;
        let data_type = parse_data_type(data_type)?;

        let records = self
            .sensor_record_repository
            .find_by_time_range(start_time, end_time, data_type)
            .await?;

        Ok((
            records.into_iter().map(SensorRecordResponse::from).collect(),
            RangeWindow { start_time, end_time },
        ))
    }

    /// Latest records, newest first, optionally of one type.
    pub async fn latest(
        &self,
        data_type: Option<&str>,
        limit: Option<i64>,
        default_limit: i64,
    ) -> Result<Vec<SensorRecordResponse>, ApiError> {
        let data_type = parse_data_type(data_type)?;
        let limit = limit.unwrap_or(default_limit);
        if limit <= 0 {
            return Err(SensorError::InvalidLimit.into());
        }

        let records = self.sensor_record_repository.find_latest(data_type, limit).await?;

        Ok(records.into_iter().map(SensorRecordResponse::from).collect())
    }

    /// Aggregates over the last `hours`. Returns the window length used.
    pub async fn statistics(&self, hours: Option<i64>, now: OffsetDateTime) -> Result<(i64, Statistics), ApiError> {
        let hours = hours.unwrap_or(DEFAULT_STATS_HOURS);
        let since = window_start(now, hours, 3600)?;

        let dht = self.sensor_record_repository.dht_statistics(since).await?;
        let ldr = self.sensor_record_repository.ldr_statistics(since).await?;

        Ok((hours, Statistics { dht, ldr }))
    }

    /// State of the most recent LED echo, OFF when none was ever received.
    pub async fn latest_led_state(&self) -> Result<LedState, ApiError> {
        let led = self.sensor_record_repository.find_latest_by_type(DataType::Led).await?;

        Ok(led_state_of(led.as_ref()))
    }
}

fn led_state_of(record: Option<&SensorRecord>) -> LedState {
    record
        .and_then(|r| r.led_state)
        .and_then(LedState::from_code)
        .unwrap_or_default()
}

fn window_start(now: OffsetDateTime, amount: i64, unit_seconds: i64) -> Result<OffsetDateTime, SensorError> {
    if amount < 0 {
        return Err(SensorError::InvalidWindow);
    }

    amount
        .checked_mul(unit_seconds)
        .map(Duration::seconds)
        .and_then(|window| now.checked_sub(window))
        .ok_or(SensorError::InvalidWindow)
}

fn chart_stamp(received_at: OffsetDateTime) -> Result<(String, String), ApiError> {
    let label = received_at
        .format(format_description!("[hour]:[minute]:[second]"))
        .map_err(anyhow::Error::from)?;
    let timestamp = received_at.format(&Rfc3339).map_err(anyhow::Error::from)?;

    Ok((label, timestamp))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 or epoch milliseconds.
pub fn parse_instant(value: &str) -> Result<OffsetDateTime, SensorError> {
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(instant);
    }

    value
        .parse::<i64>()
        .ok()
        .and_then(|millis| OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok())
        .ok_or_else(|| SensorError::InvalidTimestamp(value.to_string()))
}

fn parse_data_type(value: Option<&str>) -> Result<Option<DataType>, SensorError> {
    match non_empty(value) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| SensorError::InvalidDataType(value.to_string())),
        None => Ok(None),
    }
}
