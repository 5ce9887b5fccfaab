mod sensor_record;
mod user;

pub use sensor_record::{NewSensorRecord, SensorReading, SensorRecord, SensorRecordTable, to_unix_nanos};
pub use user::{User, UserTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}
