use std::collections::BTreeMap;

use thiserror::Error;

/// One sensor sample: field name to measured value, e.g. temperature and
/// humidity from a combined probe.
pub type SensorReading = BTreeMap<String, f64>;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("sensor read failed: {0}")]
    Read(String),
}

/// Contract against the physical sensor.
///
/// A failed read is a local fault: the caller skips the origination cycle
/// and retries on the next period.
#[cfg_attr(test, mockall::automock)]
pub trait SensorProbe: Send {
    fn sample(&mut self) -> Result<SensorReading, SensorError>;
}
