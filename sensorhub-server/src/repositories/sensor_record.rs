use std::sync::Arc;

use sensorhub_api::models::{DataType, DhtStatistics, LdrStatistics};
use sqlx::{Error, Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{NewSensorRecord, SensorReading, SensorRecord, to_unix_nanos};

#[derive(sqlx::FromRow)]
struct DhtAggregate {
    count: i64,
    avg_temperature: Option<f64>,
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    avg_humidity: Option<f64>,
    min_humidity: Option<f64>,
    max_humidity: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct LdrAggregate {
    count: i64,
    avg_light_level: Option<f64>,
    min_light_level: Option<i64>,
    max_light_level: Option<i64>,
}

pub struct SensorRecordRepository {
    storage: Arc<Storage>,
}

impl SensorRecordRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        self.storage.get_pool()
    }
}

impl SensorRecordRepository {
    // Create new sensor record
    pub async fn create(
        &self,
        item: &NewSensorRecord,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i64, Error> {
        let (temperature, humidity, light_level, voltage, light_status, led_state) = match &item.reading {
            SensorReading::Dht { temperature, humidity } => {
                (Some(*temperature), Some(*humidity), None, None, None, None)
            }
            SensorReading::Ldr { light_level, voltage, light_status } => (
                None,
                None,
                Some(*light_level),
                *voltage,
                light_status.map(|status| status.code()),
                None,
            ),
            SensorReading::Led { state } => (None, None, None, None, None, Some(i64::from(state.code()))),
        };

        let id = sqlx::query(
            r#"
            INSERT INTO sensor_records (
                device_id, node_address, data_type,
                temperature, humidity,
                light_level, voltage, light_status,
                led_state,
                device_timestamp, received_at, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&item.device_id)
        .bind(&item.node_address)
        .bind(item.reading.data_type().as_str())
        .bind(temperature)
        .bind(humidity)
        .bind(light_level)
        .bind(voltage)
        .bind(light_status)
        .bind(led_state)
        .bind(item.device_timestamp)
        .bind(to_unix_nanos(item.received_at))
        .bind(&item.raw_payload)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    // Get latest N records, optionally of one type, newest first
    pub async fn find_latest(&self, data_type: Option<DataType>, limit: i64) -> Result<Vec<SensorRecord>, Error> {
        let records: Vec<SensorRecord> = sqlx::query_as(
            r#"
            SELECT * FROM sensor_records
            WHERE ($1 IS NULL OR data_type = $1)
            ORDER BY received_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(data_type.map(|t| t.as_str()))
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(records)
    }

    // Get the most recent record of a type
    pub async fn find_latest_by_type(&self, data_type: DataType) -> Result<Option<SensorRecord>, Error> {
        let record: Option<SensorRecord> = sqlx::query_as(
            r#"
            SELECT * FROM sensor_records
            WHERE data_type = $1
            ORDER BY received_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(data_type.as_str())
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(record)
    }

    // Get records of a type inside a window, oldest first
    pub async fn find_by_type_in_window(
        &self,
        data_type: DataType,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
    ) -> Result<Vec<SensorRecord>, Error> {
        let records: Vec<SensorRecord> = sqlx::query_as(
            r#"
            SELECT * FROM sensor_records
            WHERE data_type = $1 AND received_at >= $2 AND received_at <= $3
            ORDER BY received_at ASC, id ASC
            "#,
        )
        .bind(data_type.as_str())
        .bind(to_unix_nanos(start_time))
        .bind(to_unix_nanos(end_time))
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(records)
    }

    // Get records inside a time range, optionally of one type, newest first
    pub async fn find_by_time_range(
        &self,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
        data_type: Option<DataType>,
    ) -> Result<Vec<SensorRecord>, Error> {
        let records: Vec<SensorRecord> = sqlx::query_as(
            r#"
            SELECT * FROM sensor_records
            WHERE received_at >= $1 AND received_at <= $2
                AND ($3 IS NULL OR data_type = $3)
            ORDER BY received_at DESC, id DESC
            "#,
        )
        .bind(to_unix_nanos(start_time))
        .bind(to_unix_nanos(end_time))
        .bind(data_type.map(|t| t.as_str()))
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(records)
    }

    // Temperature and humidity aggregates since the given instant
    pub async fn dht_statistics(&self, since: OffsetDateTime) -> Result<Option<DhtStatistics>, Error> {
        let aggregate: DhtAggregate = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS count,
                AVG(temperature) AS avg_temperature,
                MIN(temperature) AS min_temperature,
                MAX(temperature) AS max_temperature,
                AVG(humidity) AS avg_humidity,
                MIN(humidity) AS min_humidity,
                MAX(humidity) AS max_humidity
            FROM sensor_records
            WHERE data_type = 'DHT' AND received_at >= $1
            "#,
        )
        .bind(to_unix_nanos(since))
        .fetch_one(self.storage.get_pool())
        .await?;

        if aggregate.count == 0 {
            return Ok(None);
        }

        Ok(Some(DhtStatistics {
            avg_temperature: aggregate.avg_temperature.unwrap_or_default(),
            min_temperature: aggregate.min_temperature.unwrap_or_default(),
            max_temperature: aggregate.max_temperature.unwrap_or_default(),
            avg_humidity: aggregate.avg_humidity.unwrap_or_default(),
            min_humidity: aggregate.min_humidity.unwrap_or_default(),
            max_humidity: aggregate.max_humidity.unwrap_or_default(),
            count: aggregate.count,
        }))
    }

    // Light level aggregates since the given instant
    pub async fn ldr_statistics(&self, since: OffsetDateTime) -> Result<Option<LdrStatistics>, Error> {
        let aggregate: LdrAggregate = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS count,
                AVG(light_level) AS avg_light_level,
                MIN(light_level) AS min_light_level,
                MAX(light_level) AS max_light_level
            FROM sensor_records
            WHERE data_type = 'LDR' AND received_at >= $1
            "#,
        )
        .bind(to_unix_nanos(since))
        .fetch_one(self.storage.get_pool())
        .await?;

        if aggregate.count == 0 {
            return Ok(None);
        }

        Ok(Some(LdrStatistics {
            avg_light_level: aggregate.avg_light_level.unwrap_or_default(),
            min_light_level: aggregate.min_light_level.unwrap_or_default(),
            max_light_level: aggregate.max_light_level.unwrap_or_default(),
            count: aggregate.count,
        }))
    }
}
