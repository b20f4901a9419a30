//! `LOGGER.GAM` line formats: the free-text header and the 16-field records.
//!
//! Record layout (semicolon separated):
//!
//! ```text
//! timestamp;minute_id;iso_t_real;iso_t_set;resin_t_real;resin_t_set;hose_t_real;hose_t_set;
//! value8;value9;iso_amps;resin_amps;iso_pressure;resin_pressure;counter;value15[;status]
//! ```
//!
//! The optional 17th field is the status appended by the tailer.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::status::RunStatus;

/// Fields in a record as written by the controller.
pub const RECORD_FIELDS: usize = 16;
/// Position of the cumulative counter (second-to-last raw field).
pub const COUNTER_INDEX: usize = 14;
/// Controller timestamp format, local time.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected at least {} fields, found {found}", RECORD_FIELDS)]
    TooFewFields { found: usize },
    #[error("expected at most {} fields, found {found}", RECORD_FIELDS + 1)]
    TooManyFields { found: usize },
    #[error("unparsable timestamp {value:?}")]
    Timestamp { value: String },
    #[error("timestamp {value} does not exist in zone {zone}")]
    NonexistentLocalTime { value: String, zone: String },
    #[error("field {name} has non-numeric value {value:?}")]
    Field { name: &'static str, value: String },
    #[error("invalid status field {value:?}")]
    Status { value: String },
}

/// One parsed line of the machine log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub minute_id: i64,
    pub iso_temp_real: f64,
    pub iso_temp_set: f64,
    pub resin_temp_real: f64,
    pub resin_temp_set: f64,
    pub hose_temp_real: f64,
    pub hose_temp_set: f64,
    pub value8: f64,
    pub value9: f64,
    pub iso_amperage: f64,
    pub resin_amperage: f64,
    pub iso_pressure: f64,
    pub resin_pressure: f64,
    pub counter: i64,
    pub value15: f64,
    pub status: Option<RunStatus>,
}

fn fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n'])
        .split(';')
        .map(str::trim)
        .collect()
}

fn int(name: &'static str, v: &str) -> Result<i64, RecordError> {
    v.parse().map_err(|_| RecordError::Field {
        name,
        value: v.to_string(),
    })
}

fn dec(name: &'static str, v: &str) -> Result<f64, RecordError> {
    match v.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(x),
        _ => Err(RecordError::Field {
            name,
            value: v.to_string(),
        }),
    }
}

pub fn parse_timestamp(v: &str) -> Result<NaiveDateTime, RecordError> {
    NaiveDateTime::parse_from_str(v.trim(), TIMESTAMP_FORMAT).map_err(|_| RecordError::Timestamp {
        value: v.to_string(),
    })
}

/// Counter of a raw line, taken as the second-to-last field.
///
/// Only the counter is parsed, so this also "works" on lines that would fail a
/// full parse; the tailer relies on that for the oldest window line.
pub fn counter_of(line: &str) -> Result<i64, RecordError> {
    let f = fields(line);
    if f.len() < 2 {
        return Err(RecordError::TooFewFields { found: f.len() });
    }
    int("counter", f[f.len() - 2])
}

impl LogRecord {
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let f = fields(line);
        if f.len() < RECORD_FIELDS {
            return Err(RecordError::TooFewFields { found: f.len() });
        }
        if f.len() > RECORD_FIELDS + 1 {
            return Err(RecordError::TooManyFields { found: f.len() });
        }
        let status = match f.get(RECORD_FIELDS) {
            None => None,
            Some(s) => Some(s.parse::<RunStatus>().map_err(|_| RecordError::Status {
                value: (*s).to_string(),
            })?),
        };

        Ok(Self {
            timestamp: parse_timestamp(f[0])?,
            minute_id: int("minute_id", f[1])?,
            iso_temp_real: dec("iso_temp_real", f[2])?,
            iso_temp_set: dec("iso_temp_set", f[3])?,
            resin_temp_real: dec("resin_temp_real", f[4])?,
            resin_temp_set: dec("resin_temp_set", f[5])?,
            hose_temp_real: dec("hose_temp_real", f[6])?,
            hose_temp_set: dec("hose_temp_set", f[7])?,
            value8: dec("value8", f[8])?,
            value9: dec("value9", f[9])?,
            iso_amperage: dec("iso_amperage", f[10])?,
            resin_amperage: dec("resin_amperage", f[11])?,
            iso_pressure: dec("iso_pressure", f[12])?,
            resin_pressure: dec("resin_pressure", f[13])?,
            counter: int("counter", f[COUNTER_INDEX])?,
            value15: dec("value15", f[15])?,
            status,
        })
    }
}

/// Parsed `GAMA LOG TYPE: <type>;VERSION: <ver>;METRIC: <unit>` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    pub log_type: String,
    pub version: String,
    pub metric: String,
}

impl LogHeader {
    /// `None` when the line is not a recognizable header.
    pub fn parse(line: &str) -> Option<Self> {
        let mut log_type = None;
        let mut version = None;
        let mut metric = None;
        for part in fields(line) {
            let (k, v) = part.split_once(':')?;
            let v = v.trim().to_string();
            match k.trim() {
                "GAMA LOG TYPE" => log_type = Some(v),
                "VERSION" => version = Some(v),
                "METRIC" => metric = Some(v),
                _ => return None,
            }
        }
        Some(Self {
            log_type: log_type?,
            version: version?,
            metric: metric?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "01-05-2024 08:30:00;510;45.2;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;500;0";

    #[test]
    fn parses_well_formed_record() {
        let r = LogRecord::parse(LINE).unwrap();
        assert_eq!(r.minute_id, 510);
        assert_eq!(r.counter, 500);
        assert_eq!(r.iso_pressure, 1450.0);
        assert_eq!(r.status, None);
        assert_eq!(r.timestamp.to_string(), "2024-05-01 08:30:00");
    }

    #[test]
    fn counter_is_second_to_last_field() {
        assert_eq!(counter_of(LINE).unwrap(), 500);
        assert_eq!(counter_of("x;42;y").unwrap(), 42);
        assert!(counter_of("GAMA LOG TYPE: A;VERSION: 1;METRIC: M").is_err());
    }

    #[test]
    fn header_parses() {
        let h = LogHeader::parse("GAMA LOG TYPE: G50-H;VERSION: 2.1;METRIC: C\r").unwrap();
        assert_eq!(h.log_type, "G50-H");
        assert_eq!(h.version, "2.1");
        assert_eq!(h.metric, "C");
        assert!(LogHeader::parse(LINE).is_none());
    }
}
