pub mod model;
pub mod sink;

pub use model::{BatteryRecord, DiskRecord};
pub use sink::{JsonlSink, SinkError, read_records};
