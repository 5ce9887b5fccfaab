mod sensor_record;
mod user;

pub use sensor_record::SensorRecordRepository;
pub use user::UserRepository;
