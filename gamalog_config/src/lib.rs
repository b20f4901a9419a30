#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the gadget log tailer and rotator.
//!
//! - `Config` and its sections are deserialized from TOML; every section is
//!   optional and falls back to the values used on the production Pi.
//! - `Config::validate` rejects values the runtime cannot work with and names
//!   the offending key in the error.
use eyre::WrapErr;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageCfg {
    /// Raw FAT32 image backing the USB gadget
    pub path: PathBuf,
    /// Inner name of the machine log
    pub log_file: String,
    /// Inner name of the rotation backup
    pub backup_file: String,
    /// mtools binaries (names on PATH or absolute paths)
    pub mtype: String,
    pub mcopy: String,
    /// Upper bound on a single mtools call (ms)
    pub timeout_ms: u64,
}

impl Default for ImageCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/piusb.bin"),
            log_file: "LOGGER.GAM".to_string(),
            backup_file: "LOGS_BKP.GAM".to_string(),
            mtype: "mtype".to_string(),
            mcopy: "mcopy".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TailerCfg {
    /// Delay between polls of the log file (ms)
    pub interval_ms: u64,
}

impl Default for TailerCfg {
    fn default() -> Self {
        Self { interval_ms: 1_000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MachineCfg {
    /// Identity attached to every observation; also the document key
    pub name: String,
    pub location_name: String,
    /// WKT point, e.g. "POINT(-74.1771 45.3053)"
    pub location: String,
    /// IANA zone the controller writes its timestamps in
    pub timezone: String,
}

impl Default for MachineCfg {
    fn default() -> Self {
        Self {
            name: "unnamed-machine".to_string(),
            location_name: String::new(),
            location: String::new(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RotationCfg {
    /// Advisory lock held for the duration of one rotation pass
    pub lock_path: PathBuf,
}

impl Default for RotationCfg {
    fn default() -> Self {
        Self {
            lock_path: PathBuf::from("/run/lock/gamalog-rotate.lock"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SinksCfg {
    /// Tabular sink: one CSV row appended per observation (disabled when absent)
    pub table_csv: Option<PathBuf>,
    /// Document sink: JSON object keyed by machine name (disabled when absent)
    pub document_json: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorCfg {
    /// Seconds added to the timestamp of each generated record
    pub step_secs: u64,
    /// Delay between generated records (ms)
    pub interval_ms: u64,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            step_secs: 2,
            interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub image: ImageCfg,
    pub tailer: TailerCfg,
    pub machine: MachineCfg,
    pub rotation: RotationCfg,
    pub sinks: SinksCfg,
    pub logging: Logging,
    pub simulator: SimulatorCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// True for names that fit FAT's 8.3 scheme (base 1..=8, optional extension 1..=3).
fn is_short_name(name: &str) -> bool {
    let (base, ext) = match name.split_once('.') {
        Some((b, e)) => (b, Some(e)),
        None => (name, None),
    };
    let ok_chars = |s: &str| {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-~!#$%&'()@^{}".contains(c))
    };
    (1..=8).contains(&base.len())
        && ok_chars(base)
        && ext.is_none_or(|e| (1..=3).contains(&e.len()) && ok_chars(e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Image
        if self.image.path.as_os_str().is_empty() {
            eyre::bail!("image.path must not be empty");
        }
        for (key, name) in [
            ("image.log_file", &self.image.log_file),
            ("image.backup_file", &self.image.backup_file),
        ] {
            if name.trim().is_empty() {
                eyre::bail!("{key} must not be empty");
            }
            if !is_short_name(name) {
                eyre::bail!("{key} must be an 8.3 file name, got {name:?}");
            }
        }
        if self.image.log_file.eq_ignore_ascii_case(&self.image.backup_file) {
            eyre::bail!("image.backup_file must differ from image.log_file");
        }
        if self.image.mtype.trim().is_empty() || self.image.mcopy.trim().is_empty() {
            eyre::bail!("image.mtype and image.mcopy must not be empty");
        }
        if self.image.timeout_ms == 0 {
            eyre::bail!("image.timeout_ms must be >= 1");
        }
        if self.image.timeout_ms > 10 * 60 * 1000 {
            eyre::bail!("image.timeout_ms is unreasonably large (>10min)");
        }

        // Tailer
        if self.tailer.interval_ms == 0 {
            eyre::bail!("tailer.interval_ms must be >= 1");
        }
        if self.tailer.interval_ms > 60 * 60 * 1000 {
            eyre::bail!("tailer.interval_ms is unreasonably large (>1h)");
        }

        // Machine
        if self.machine.name.trim().is_empty() {
            eyre::bail!("machine.name must not be empty");
        }
        if self.machine.timezone.parse::<chrono_tz::Tz>().is_err() {
            eyre::bail!(
                "machine.timezone {:?} is not a known IANA zone",
                self.machine.timezone
            );
        }

        // Rotation
        if self.rotation.lock_path.as_os_str().is_empty() {
            eyre::bail!("rotation.lock_path must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        // Simulator
        if self.simulator.step_secs == 0 {
            eyre::bail!("simulator.step_secs must be >= 1");
        }

        Ok(())
    }

    /// Parsed `machine.timezone`; `None` when the name is not an IANA zone.
    pub fn timezone(&self) -> Option<chrono_tz::Tz> {
        self.machine.timezone.parse().ok()
    }
}
