use super::{BatterySource, CancelToken};
use crate::collector::traits::PowerStatusApi;
use crate::storage::model::{PowerStatusInfo, SourceResult, Unavailable};

/// The native `SYSTEM_POWER_STATUS` structure, reported as-is.
pub struct PowerStatusSource<P: PowerStatusApi> {
    api: P,
}

impl<P: PowerStatusApi> PowerStatusSource<P> {
    pub fn new(api: P) -> Self {
        Self { api }
    }
}

impl<P: PowerStatusApi> BatterySource for PowerStatusSource<P> {
    const NAME: &'static str = "system_power_status";
    type Info = PowerStatusInfo;

    fn query(&self, _cancel: &CancelToken) -> SourceResult<PowerStatusInfo> {
        match self.api.system_power_status() {
            Ok(status) => SourceResult::Available(status),
            Err(e) => SourceResult::Unavailable(Unavailable::error(e.to_string())),
        }
    }
}
