use sensorhub_api::models::{DataType, LedState, LightStatus, SensorRecordResponse};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use time::OffsetDateTime;

use super::Table;

/// `received_at` is kept as integer nanoseconds since the Unix epoch so SQL
/// comparisons and ordering follow time order. Out of range instants saturate.
pub fn to_unix_nanos(time: OffsetDateTime) -> i64 {
    let nanos = time.unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(if nanos < 0 { i64::MIN } else { i64::MAX })
}

pub fn from_unix_nanos(nanos: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
}

/// A single decoded reading. Exactly one variant per stored record.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorReading {
    Dht {
        /// Temperature in Celsius
        temperature: f64,
        /// Relative humidity %
        humidity: f64,
    },
    Ldr {
        /// Raw ADC units
        light_level: i64,
        voltage: Option<f64>,
        light_status: Option<LightStatus>,
    },
    Led {
        state: LedState,
    },
}

impl SensorReading {
    pub fn data_type(&self) -> DataType {
        match self {
            SensorReading::Dht { .. } => DataType::Dht,
            SensorReading::Ldr { .. } => DataType::Ldr,
            SensorReading::Led { .. } => DataType::Led,
        }
    }
}

/// A record that has not been written yet.
#[derive(Clone, Debug)]
pub struct NewSensorRecord {
    pub device_id: String,
    pub node_address: String,
    pub reading: SensorReading,
    /// Epoch milliseconds supplied by the device
    pub device_timestamp: Option<i64>,
    pub received_at: OffsetDateTime,
    pub raw_payload: String,
}

#[derive(Clone, Debug)]
pub struct SensorRecord {
    pub id: i64,
    pub device_id: String,
    pub node_address: String,
    pub data_type: DataType,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light_level: Option<i64>,
    pub voltage: Option<f64>,
    pub light_status: Option<i64>,
    pub led_state: Option<i64>,
    pub device_timestamp: Option<i64>,
    pub received_at: OffsetDateTime,
    pub raw_payload: String,
}

impl SensorRecord {
    /// Rebuilds the reading from the variant columns, `None` if they are incomplete.
    pub fn reading(&self) -> Option<SensorReading> {
        match self.data_type {
            DataType::Dht => Some(SensorReading::Dht {
                temperature: self.temperature?,
                humidity: self.humidity?,
            }),
            DataType::Ldr => Some(SensorReading::Ldr {
                light_level: self.light_level?,
                voltage: self.voltage,
                light_status: self.light_status.and_then(LightStatus::from_code),
            }),
            DataType::Led => Some(SensorReading::Led {
                state: LedState::from_code(self.led_state?)?,
            }),
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for SensorRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let data_type: String = row.try_get("data_type")?;
        let data_type = data_type
            .parse::<DataType>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "data_type".to_string(),
                source: Box::new(e),
            })?;

        let received_at: i64 = row.try_get("received_at")?;
        let received_at = from_unix_nanos(received_at).map_err(|e| sqlx::Error::ColumnDecode {
            index: "received_at".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            node_address: row.try_get("node_address")?,
            data_type,
            temperature: row.try_get("temperature")?,
            humidity: row.try_get("humidity")?,
            light_level: row.try_get("light_level")?,
            voltage: row.try_get("voltage")?,
            light_status: row.try_get("light_status")?,
            led_state: row.try_get("led_state")?,
            device_timestamp: row.try_get("device_timestamp")?,
            received_at,
            raw_payload: row.try_get("raw_payload")?,
        })
    }
}

impl From<SensorRecord> for SensorRecordResponse {
    fn from(record: SensorRecord) -> Self {
        Self {
            id: record.id,
            device_id: record.device_id,
            node_address: record.node_address,
            data_type: record.data_type,
            temperature: record.temperature,
            humidity: record.humidity,
            light_level: record.light_level,
            voltage: record.voltage,
            light_status: record.light_status.and_then(LightStatus::from_code),
            led_state: record.led_state.and_then(LedState::from_code).map(|state| state.code()),
            device_timestamp: record.device_timestamp,
            received_at: record.received_at,
            raw_payload: record.raw_payload,
        }
    }
}

#[derive(Clone)]
pub struct SensorRecordTable;

impl Table for SensorRecordTable {
    fn name(&self) -> &'static str {
        "sensor_records"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                node_address TEXT NOT NULL,
                data_type TEXT NOT NULL CHECK (data_type IN ('DHT', 'LDR', 'LED')),
                temperature REAL,
                humidity REAL,
                light_level INTEGER,
                voltage REAL,
                light_status INTEGER,
                led_state INTEGER,
                device_timestamp INTEGER,
                received_at INTEGER NOT NULL,
                raw_payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sensor_records_device_type_time
                ON sensor_records (device_id, data_type, device_timestamp DESC);
            CREATE INDEX IF NOT EXISTS idx_sensor_records_received_at
                ON sensor_records (received_at DESC);
            CREATE INDEX IF NOT EXISTS idx_sensor_records_node_type
                ON sensor_records (node_address, data_type);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS sensor_records;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
