use std::sync::Arc;

use sensorhub_api::models::{LedState, LightStatus};
use serde::Deserialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::configs::BrokerTopic;
use crate::errors::IngestError;
use crate::models::{NewSensorRecord, SensorReading};
use crate::repositories::SensorRecordRepository;

/// Identity a reading is filed under. Devices do not report it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: &'static str,
    pub node_address: &'static str,
}

pub const DHT_DEVICE: DeviceIdentity = DeviceIdentity {
    device_id: "ESP32_DHT_SERVER",
    node_address: "0x0002",
};

pub const LDR_DEVICE: DeviceIdentity = DeviceIdentity {
    device_id: "ESP32_LDR_SERVER",
    node_address: "0x0003",
};

// The LED sits on the DHT node.
pub const LED_DEVICE: DeviceIdentity = DeviceIdentity {
    device_id: "ESP32_LED_CONTROL",
    node_address: "0x0002",
};

#[derive(Debug, Clone, Deserialize)]
struct DhtPayload {
    #[serde(deserialize_with = "lenient::number")]
    temperature: f64,
    #[serde(deserialize_with = "lenient::number")]
    humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct LdrPayload {
    #[serde(rename = "lightLevel", alias = "light_level", deserialize_with = "lenient::integer")]
    light_level: i64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    voltage: Option<f64>,
    #[serde(
        default,
        rename = "lightStatus",
        alias = "light_status",
        deserialize_with = "lenient::light_status"
    )]
    light_status: Option<LightStatus>,
}

/// Readings recovered from one sensor-topic message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub readings: Vec<SensorReading>,
    /// Epoch milliseconds reported by the device, if any
    pub device_timestamp: Option<i64>,
}

/// Parses a sensor-topic payload into its tagged readings.
///
/// Shapes are tried in a fixed order (DHT, then LDR) and are not exclusive: a
/// payload carrying both key sets yields two readings. A shape whose keys are
/// present but whose values do not parse is skipped with a warning.
pub fn decode_sensor_payload(payload: &str) -> Result<DecodedPayload, IngestError> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(fields) = value else {
        return Err(IngestError::Unrecognized);
    };

    let mut readings = Vec::new();

    if fields.contains_key("temperature") && fields.contains_key("humidity") {
        match DhtPayload::deserialize(Value::Object(fields.clone())) {
            Ok(dht) => readings.push(SensorReading::Dht {
                temperature: dht.temperature,
                humidity: dht.humidity,
            }),
            Err(e) => tracing::warn!("skip malformed DHT reading: {}", e),
        }
    }

    if fields.contains_key("lightLevel") || fields.contains_key("light_level") {
        match LdrPayload::deserialize(Value::Object(fields.clone())) {
            Ok(ldr) => readings.push(SensorReading::Ldr {
                light_level: ldr.light_level,
                voltage: ldr.voltage,
                light_status: ldr.light_status,
            }),
            Err(e) => tracing::warn!("skip malformed LDR reading: {}", e),
        }
    }

    if readings.is_empty() {
        return Err(IngestError::Unrecognized);
    }

    Ok(DecodedPayload {
        readings,
        device_timestamp: device_timestamp(&fields),
    })
}

/// A zero or missing timestamp counts as absent.
fn device_timestamp(fields: &Map<String, Value>) -> Option<i64> {
    let timestamp = fields.get("timestamp")?;

    timestamp
        .as_i64()
        .or_else(|| timestamp.as_f64().map(|t| t as i64))
        .filter(|t| *t != 0)
}

/// Interprets an LED-topic echo. Only `1` or `"1"` means on.
pub fn decode_led_payload(payload: &str) -> LedState {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Number(n)) if n.as_f64() == Some(1.0) => LedState::On,
        Ok(Value::String(s)) if s == "1" => LedState::On,
        _ => LedState::Off,
    }
}

/// Routes broker messages to the record store.
pub struct IngestService {
    sensor_record_repository: Arc<SensorRecordRepository>,
    topic: BrokerTopic,
}

impl IngestService {
    pub fn new(sensor_record_repository: Arc<SensorRecordRepository>, topic: BrokerTopic) -> Self {
        Self {
            sensor_record_repository,
            topic,
        }
    }

    /// Handles one inbound message and returns how many records were stored.
    /// Never fails: every problem is logged and the message is dropped.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> usize {
        let result = if topic == self.topic.sensor_data {
            self.ingest_sensor_data(payload).await
        } else if topic == self.topic.led_control {
            self.ingest_led_echo(payload).await
        } else {
            tracing::debug!("ignore message on unexpected topic {}", topic);
            Ok(0)
        };

        match result {
            Ok(stored) => stored,
            Err(IngestError::Unrecognized) => {
                tracing::warn!("drop unrecognized payload on {}", topic);
                0
            }
            Err(e) => {
                tracing::warn!("drop message on {}: {}", topic, e);
                0
            }
        }
    }

    async fn ingest_sensor_data(&self, payload: &[u8]) -> Result<usize, IngestError> {
        let received_at = OffsetDateTime::now_utc();
        let message = std::str::from_utf8(payload)?;

        tracing::debug!("receive sensor data: {}", message);

        let decoded = decode_sensor_payload(message)?;
        let device_timestamp = decoded
            .device_timestamp
            .unwrap_or_else(|| (received_at.unix_timestamp_nanos() / 1_000_000) as i64);

        let mut stored = 0;
        for reading in decoded.readings {
            let device = match reading {
                SensorReading::Dht { .. } => DHT_DEVICE,
                SensorReading::Ldr { .. } => LDR_DEVICE,
                SensorReading::Led { .. } => LED_DEVICE,
            };

            let record = NewSensorRecord {
                device_id: device.device_id.to_string(),
                node_address: device.node_address.to_string(),
                reading,
                device_timestamp: Some(device_timestamp),
                received_at,
                raw_payload: message.to_string(),
            };

            match self.store(&record).await {
                Ok(id) => {
                    tracing::info!("stored {} record {}", record.reading.data_type(), id);
                    stored += 1;
                }
                Err(e) => tracing::error!("failed to store {} record: {}", record.reading.data_type(), e),
            }
        }

        Ok(stored)
    }

    async fn ingest_led_echo(&self, payload: &[u8]) -> Result<usize, IngestError> {
        let received_at = OffsetDateTime::now_utc();
        let message = std::str::from_utf8(payload)?;

        tracing::debug!("receive LED echo: {}", message);

        let state = decode_led_payload(message);
        let record = NewSensorRecord {
            device_id: LED_DEVICE.device_id.to_string(),
            node_address: LED_DEVICE.node_address.to_string(),
            reading: SensorReading::Led { state },
            device_timestamp: Some((received_at.unix_timestamp_nanos() / 1_000_000) as i64),
            received_at,
            raw_payload: message.to_string(),
        };

        match self.store(&record).await {
            Ok(id) => {
                tracing::info!("stored LED record {} ({})", id, state);
                Ok(1)
            }
            Err(e) => {
                tracing::error!("failed to store LED record: {}", e);
                Ok(0)
            }
        }
    }

    async fn store(&self, record: &NewSensorRecord) -> Result<i64, IngestError> {
        let mut transaction = self.sensor_record_repository.get_pool().begin().await?;
        let id = self.sensor_record_repository.create(record, &mut transaction).await?;
        transaction.commit().await?;

        Ok(id)
    }
}

mod lenient {
    use sensorhub_api::models::LightStatus;
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    fn as_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;

        as_number(&value).ok_or_else(|| D::Error::custom(format!("expected a number, got {value}")))
    }

    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(deserializer)?;

        match value.as_i64() {
            Some(n) => Ok(n),
            None => as_number(&value)
                .map(|n| n.round() as i64)
                .ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}"))),
        }
    }

    pub fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;

        if value.is_null() {
            return Ok(None);
        }

        as_number(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a number, got {value}")))
    }

    pub fn light_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LightStatus>, D::Error> {
        let value = Value::deserialize(deserializer)?;

        let status = match &value {
            Value::Null => return Ok(None),
            Value::Number(n) => n.as_i64().and_then(LightStatus::from_code),
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(code) => LightStatus::from_code(code),
                Err(_) => s.parse().ok(),
            },
            _ => None,
        };

        status
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unknown light status {value}")))
    }
}
