use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::configs::normalize_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerTopic {
    /// Device -> server sensor readings
    pub sensor_data: String,
    /// Server -> device commands, device -> server echoes
    pub led_control: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    pub host: String,
    pub port: u16,
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
    pub reconnect_interval_ms: u64,
    pub topic: BrokerTopic,
}

impl Broker {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub secret: String,
    /// Token lifetime in seconds
    pub expiration: u64,
    #[serde(default)]
    pub cookie_secure: bool,
}

/// The administrator account seeded at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub broker: Broker,
    pub database: Database,
    pub auth: Auth,
    pub admin: Admin,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()?;

        if settings.auth.secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.secret must not be empty".into()));
        }

        if let Some(migrate) = &settings.database.migration_path {
            let migrate_path = normalize_path(migrate).map_err(|e| ConfigError::Message(e.to_string()))?;

            settings.database.migration_path = if Path::new(&migrate_path).is_dir() {
                Some(migrate_path.to_string_lossy().to_string())
            } else {
                tracing::warn!("migration path {} is not a directory, skipping migrations", migrate);
                None
            };
        }

        Ok(settings)
    }
}
