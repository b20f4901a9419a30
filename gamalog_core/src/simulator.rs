//! Bench-side generator that keeps a log growing without the real machine.
//!
//! Takes the last data record, moves its timestamp forward by `step` and bumps
//! the counter (second-to-last field) by one. Every other field is copied
//! verbatim, so the output keeps whatever formatting the source record had.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::TimeDelta;
use gamalog_traits::{Clock, ImageFs};

use crate::config::SimulatorSettings;
use crate::error::{GamalogError, Result};
use crate::image_error::map_image_error;
use crate::record::{RecordError, TIMESTAMP_FORMAT, parse_timestamp};
use crate::util::{split_lines, terminate};

/// Next record after `line`: timestamp + `step`, counter + 1.
pub fn next_record_line(line: &str, step: Duration) -> std::result::Result<String, RecordError> {
    let mut parts: Vec<String> = line.split(';').map(str::to_string).collect();
    if parts.len() < 2 {
        return Err(RecordError::TooFewFields { found: parts.len() });
    }

    let ts = parse_timestamp(&parts[0])?;
    let next = TimeDelta::from_std(step)
        .ok()
        .and_then(|d| ts.checked_add_signed(d))
        .ok_or_else(|| RecordError::Timestamp {
            value: parts[0].clone(),
        })?;
    parts[0] = next.format(TIMESTAMP_FORMAT).to_string();

    let idx = parts.len() - 2;
    let raw = parts[idx].trim();
    let bumped = raw
        .parse::<i64>()
        .ok()
        .and_then(|c| c.checked_add(1))
        .ok_or_else(|| RecordError::Field {
            name: "counter",
            value: raw.to_string(),
        })?;
    parts[idx] = bumped.to_string();

    Ok(parts.join(";"))
}

fn is_data_record(line: &str) -> bool {
    line.split(';')
        .next()
        .is_some_and(|ts| parse_timestamp(ts).is_ok())
}

pub struct Simulator<F> {
    fs: F,
    settings: SimulatorSettings,
}

impl<F: ImageFs> Simulator<F> {
    pub fn new(fs: F, settings: SimulatorSettings) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &SimulatorSettings {
        &self.settings
    }

    /// Append one generated record to the log and return it (without line ending).
    pub fn append_next(&mut self) -> Result<String> {
        let file = self.settings.log_file.clone();
        let mut content = match self.fs.read_file(&file) {
            Ok(Some(c)) => c,
            Ok(None) => return Err(GamalogError::MissingFile(file).into()),
            Err(e) => return Err(map_image_error(e.as_ref()).into()),
        };

        let (last, crlf) = {
            let lines = split_lines(&content);
            let Some(raw) = lines
                .iter()
                .rev()
                .find(|l| is_data_record(String::from_utf8_lossy(l).trim()))
            else {
                return Err(GamalogError::NoRecords(file).into());
            };
            let crlf = raw.ends_with(b"\r");
            (String::from_utf8_lossy(raw).trim().to_string(), crlf)
        };

        let next = next_record_line(&last, self.settings.step).map_err(GamalogError::from)?;
        terminate(&mut content);
        content.extend_from_slice(next.as_bytes());
        content.extend_from_slice(if crlf { b"\r\n" } else { b"\n" });
        self.fs
            .write_file(&file, &content)
            .map_err(|e| map_image_error(e.as_ref()))?;
        tracing::debug!(file = %file, record = %next, "record appended");
        Ok(next)
    }

    /// Append up to `count` records (unbounded when `None`), sleeping `interval`
    /// between them, until `stop` is set. Returns how many were written.
    pub fn run<C: Clock>(
        &mut self,
        clock: &C,
        interval: Duration,
        count: Option<u64>,
        stop: &AtomicBool,
    ) -> Result<u64> {
        let mut written = 0u64;
        while !stop.load(Ordering::Relaxed) && count.is_none_or(|n| written < n) {
            self.append_next()?;
            written += 1;
            if count.is_none_or(|n| written < n) {
                clock.sleep(interval);
            }
        }
        tracing::info!(file = %self.settings.log_file, written, "simulation finished");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_timestamp_and_counter() {
        let line = "31-12-2023 23:59:59;1;45.2;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;620;0";
        let next = next_record_line(line, Duration::from_secs(2)).unwrap();
        assert_eq!(
            next,
            "01-01-2024 00:00:01;1;45.2;46.0;44.8;46.0;47.1;48.0;0;0;12.5;11.9;1450;1390;621;0"
        );
    }

    #[test]
    fn rejects_lines_without_counter() {
        assert!(next_record_line("01-01-2024 00:00:00", Duration::from_secs(2)).is_err());
        assert!(matches!(
            next_record_line("01-01-2024 00:00:00;x;0", Duration::from_secs(2)),
            Err(RecordError::Field { name: "counter", .. })
        ));
    }
}
