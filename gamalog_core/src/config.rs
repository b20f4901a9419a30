//! Runtime settings for the tailer, rotator and simulator.
//!
//! These are separate from the TOML-deserialized config in `gamalog_config`;
//! see `conversions` for the mapping.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::observation::MachineIdentity;

#[derive(Debug, Clone)]
pub struct TailerSettings {
    /// Inner name of the log inside the image
    pub log_file: String,
    /// Sleep between cycles
    pub interval: Duration,
    pub identity: MachineIdentity,
    /// Zone the controller writes timestamps in
    pub timezone: Tz,
}

impl Default for TailerSettings {
    fn default() -> Self {
        Self {
            log_file: "LOGGER.GAM".to_string(),
            interval: Duration::from_secs(1),
            identity: MachineIdentity::default(),
            timezone: chrono_tz::UTC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RotatorSettings {
    pub log_file: String,
    pub backup_file: String,
    pub lock_path: PathBuf,
}

impl Default for RotatorSettings {
    fn default() -> Self {
        Self {
            log_file: "LOGGER.GAM".to_string(),
            backup_file: "LOGS_BKP.GAM".to_string(),
            lock_path: PathBuf::from("/run/lock/gamalog-rotate.lock"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    pub log_file: String,
    /// Added to the timestamp of each generated record
    pub step: Duration,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            log_file: "LOGGER.GAM".to_string(),
            step: Duration::from_secs(2),
        }
    }
}
