//! `From` implementations bridging `gamalog_config` types to `gamalog_core` types.

use std::time::Duration;

use crate::config::{RotatorSettings, SimulatorSettings, TailerSettings};
use crate::observation::MachineIdentity;

impl From<&gamalog_config::MachineCfg> for MachineIdentity {
    fn from(c: &gamalog_config::MachineCfg) -> Self {
        Self {
            name: c.name.clone(),
            location_name: c.location_name.clone(),
            location: c.location.clone(),
        }
    }
}

impl From<&gamalog_config::Config> for TailerSettings {
    fn from(c: &gamalog_config::Config) -> Self {
        Self {
            log_file: c.image.log_file.clone(),
            interval: Duration::from_millis(c.tailer.interval_ms),
            identity: (&c.machine).into(),
            timezone: c.timezone().unwrap_or_else(|| {
                tracing::warn!(
                    timezone = %c.machine.timezone,
                    "unknown machine.timezone; rendering timestamps in UTC"
                );
                chrono_tz::UTC
            }),
        }
    }
}

impl From<&gamalog_config::Config> for RotatorSettings {
    fn from(c: &gamalog_config::Config) -> Self {
        Self {
            log_file: c.image.log_file.clone(),
            backup_file: c.image.backup_file.clone(),
            lock_path: c.rotation.lock_path.clone(),
        }
    }
}

impl From<&gamalog_config::Config> for SimulatorSettings {
    fn from(c: &gamalog_config::Config) -> Self {
        Self {
            log_file: c.image.log_file.clone(),
            step: Duration::from_secs(c.simulator.step_secs),
        }
    }
}
