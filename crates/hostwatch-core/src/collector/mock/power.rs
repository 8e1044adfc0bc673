//! Fake native power-status API.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::collector::traits::PowerStatusApi;
use crate::storage::model::PowerStatusInfo;

#[derive(Debug, Clone)]
enum State {
    Status(PowerStatusInfo),
    Unsupported,
    Failing(String),
}

/// Power-status API returning a configurable reading.
///
/// Clones share state so a test can flip the reading between polls.
#[derive(Debug, Clone)]
pub struct MockPowerStatus {
    state: Arc<Mutex<State>>,
}

impl MockPowerStatus {
    pub fn with_status(status: PowerStatusInfo) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Status(status))),
        }
    }

    /// Laptop running on battery: 76%, 1h40m left.
    pub fn on_battery() -> Self {
        Self::with_status(PowerStatusInfo {
            ac_line_status: 0,
            battery_flag: 1,
            battery_life_percent: 76,
            battery_life_time: 6000,
            battery_full_life_time: u32::MAX,
        })
    }

    /// Laptop on AC power and charging.
    pub fn charging() -> Self {
        Self::with_status(PowerStatusInfo {
            ac_line_status: 1,
            battery_flag: 8,
            battery_life_percent: 54,
            battery_life_time: u32::MAX,
            battery_full_life_time: u32::MAX,
        })
    }

    /// Desktop: AC online, no system battery.
    pub fn no_battery() -> Self {
        Self::with_status(PowerStatusInfo {
            ac_line_status: 1,
            battery_flag: 128,
            battery_life_percent: 255,
            battery_life_time: u32::MAX,
            battery_full_life_time: u32::MAX,
        })
    }

    /// Platform without the API.
    pub fn unsupported() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Unsupported)),
        }
    }

    /// API present but the call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Failing(message.to_string()))),
        }
    }

    pub fn set(&self, status: PowerStatusInfo) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = State::Status(status);
    }
}

impl PowerStatusApi for MockPowerStatus {
    fn system_power_status(&self) -> io::Result<PowerStatusInfo> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            State::Status(status) => Ok(*status),
            State::Unsupported => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "GetSystemPowerStatus is only available on Windows",
            )),
            State::Failing(message) => Err(io::Error::other(message.clone())),
        }
    }
}
