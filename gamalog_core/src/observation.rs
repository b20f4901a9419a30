//! Enriched record handed to the upload sinks.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::record::{LogRecord, RecordError};
use crate::status::RunStatus;

/// Static identity stamped onto every observation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MachineIdentity {
    pub name: String,
    pub location_name: String,
    /// WKT geography, e.g. `POINT(-74.1771 45.3053)`
    pub location: String,
}

/// A record plus run status, identity and converted timestamps.
///
/// Field names follow the upload schema (`Minute ID`, `ISO Temp Real`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Controller time, RFC 3339 with the configured zone's offset
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Minute ID")]
    pub minute_id: i64,
    #[serde(rename = "ISO Temp Real")]
    pub iso_temp_real: f64,
    #[serde(rename = "ISO Temp Set")]
    pub iso_temp_set: f64,
    #[serde(rename = "RESIN Temp Real")]
    pub resin_temp_real: f64,
    #[serde(rename = "RESIN Temp Set")]
    pub resin_temp_set: f64,
    #[serde(rename = "HOSE Temp Real")]
    pub hose_temp_real: f64,
    #[serde(rename = "HOSE Temp Set")]
    pub hose_temp_set: f64,
    #[serde(rename = "Value8")]
    pub value8: f64,
    #[serde(rename = "Value9")]
    pub value9: f64,
    #[serde(rename = "ISO Amperage")]
    pub iso_amperage: f64,
    #[serde(rename = "RESIN Amperage")]
    pub resin_amperage: f64,
    #[serde(rename = "ISO Pressure")]
    pub iso_pressure: f64,
    #[serde(rename = "RESIN Pressure")]
    pub resin_pressure: f64,
    #[serde(rename = "Counter")]
    pub counter: i64,
    #[serde(rename = "Value15")]
    pub value15: f64,
    #[serde(rename = "Status")]
    pub status: RunStatus,
    #[serde(rename = "Machine")]
    pub machine: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Location Name")]
    pub location_name: String,
    /// When the Pi produced this observation (UTC)
    #[serde(rename = "PI_Timestamp")]
    pub pi_timestamp: String,
}

/// Interpret a controller timestamp in `tz` and render it as RFC 3339 with offset.
///
/// Ambiguous wall times (DST fall-back) resolve to the earlier instant; times
/// skipped by a spring-forward jump are rejected.
pub fn localize(record: &LogRecord, tz: Tz) -> Result<String, RecordError> {
    tz.from_local_datetime(&record.timestamp)
        .earliest()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false))
        .ok_or_else(|| RecordError::NonexistentLocalTime {
            value: record.timestamp.to_string(),
            zone: tz.name().to_string(),
        })
}

impl Observation {
    /// Build from a record whose status field is set (or an explicit `status`).
    pub fn from_record(
        record: &LogRecord,
        status: RunStatus,
        identity: &MachineIdentity,
        tz: Tz,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            timestamp: localize(record, tz)?,
            minute_id: record.minute_id,
            iso_temp_real: record.iso_temp_real,
            iso_temp_set: record.iso_temp_set,
            resin_temp_real: record.resin_temp_real,
            resin_temp_set: record.resin_temp_set,
            hose_temp_real: record.hose_temp_real,
            hose_temp_set: record.hose_temp_set,
            value8: record.value8,
            value9: record.value9,
            iso_amperage: record.iso_amperage,
            resin_amperage: record.resin_amperage,
            iso_pressure: record.iso_pressure,
            resin_pressure: record.resin_pressure,
            counter: record.counter,
            value15: record.value15,
            status: record.status.unwrap_or(status),
            machine: identity.name.clone(),
            location: identity.location.clone(),
            location_name: identity.location_name.clone(),
            pi_timestamp: observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    /// Equal apart from `pi_timestamp`: the same reading observed on another cycle.
    pub fn same_reading(&self, other: &Observation) -> bool {
        Observation {
            pi_timestamp: String::new(),
            ..self.clone()
        } == Observation {
            pi_timestamp: String::new(),
            ..other.clone()
        }
    }
}
