//! Polling loop over the machine log.
//!
//! Each cycle reads the whole log through `ImageFs`, refills the 3-line
//! window, classifies the run state from the counters of the oldest and newest
//! lines, and forwards the newest record to the sinks. Nothing a cycle runs
//! into is fatal; the outcome is returned and the next cycle starts over.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use gamalog_traits::{Clock, ImageFs, SystemClock};

use crate::config::TailerSettings;
use crate::image_error::map_image_error;
use crate::observation::Observation;
use crate::record::{LogRecord, RecordError, counter_of};
use crate::sink::{DocumentSink, NullSink, TableSink};
use crate::status::{RunStatus, classify};
use crate::util::data_lines;
use crate::window::{SlidingWindow, WINDOW_LEN};

/// What happened to one sink during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Same reading as the last row appended; not sent again.
    Suppressed,
    Failed,
}

/// Result of a single tailer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    NoLogFile,
    ReadFailed,
    /// Fewer than `WINDOW_LEN` non-blank lines were read.
    NotEnoughLines(usize),
    Malformed,
    Forwarded {
        status: RunStatus,
        table: Delivery,
        document: Delivery,
    },
}

pub struct Tailer<F, C = SystemClock> {
    fs: F,
    clock: C,
    settings: TailerSettings,
    window: SlidingWindow<String>,
    table: Box<dyn TableSink>,
    document: Box<dyn DocumentSink>,
    // last observation the table sink accepted
    last_sent: Option<Observation>,
    // last status the document sink accepted
    last_status: Option<RunStatus>,
}

impl<F: ImageFs, C: Clock> Tailer<F, C> {
    /// Tailer with both sinks disabled; attach them with `with_*_sink`.
    pub fn new(fs: F, clock: C, settings: TailerSettings) -> Self {
        Self {
            fs,
            clock,
            settings,
            window: SlidingWindow::new(WINDOW_LEN),
            table: Box::new(NullSink),
            document: Box::new(NullSink),
            last_sent: None,
            last_status: None,
        }
    }

    /// Attach the table sink and resume from the newest row it already holds
    /// for this machine, so a restart does not append that row again.
    pub fn with_table_sink(mut self, sink: impl TableSink + 'static) -> Self {
        self.table = Box::new(sink);
        self.resume_from_table();
        self
    }

    fn resume_from_table(&mut self) {
        match self.table.last_row() {
            Ok(Some(row)) if row.machine == self.settings.identity.name => {
                tracing::info!(
                    counter = row.counter,
                    status = %row.status,
                    pi_timestamp = %row.pi_timestamp,
                    "resuming after last stored row"
                );
                self.last_status = Some(row.status);
                self.last_sent = Some(row);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(sink = "table", error = %e, "cannot read last stored row; starting fresh");
            }
        }
    }

    pub fn with_document_sink(mut self, sink: impl DocumentSink + 'static) -> Self {
        self.document = Box::new(sink);
        self
    }

    pub fn settings(&self) -> &TailerSettings {
        &self.settings
    }

    /// Lines held after the last read, oldest first.
    pub fn window(&self) -> &SlidingWindow<String> {
        &self.window
    }

    /// Status last accepted by the document sink.
    pub fn last_status(&self) -> Option<RunStatus> {
        self.last_status
    }

    /// Run one cycle: read, classify, forward.
    pub fn poll_once(&mut self) -> CycleOutcome {
        let file = self.settings.log_file.as_str();
        let content = match self.fs.read_file(file) {
            Ok(Some(c)) => c,
            Ok(None) => {
                tracing::warn!(file, "log file not present in image");
                return CycleOutcome::NoLogFile;
            }
            Err(e) => {
                let err = map_image_error(e.as_ref());
                tracing::warn!(file, error = %err, "log read failed");
                return CycleOutcome::ReadFailed;
            }
        };

        self.window.clear();
        for raw in data_lines(&content) {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim();
            if !line.is_empty() {
                self.window.push(line.to_string());
            }
        }
        if !self.window.is_full() {
            tracing::debug!(file, lines = self.window.len(), "not enough lines to classify");
            return CycleOutcome::NotEnoughLines(self.window.len());
        }

        let (status, observation) = match self.observe() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(file, error = %e, "malformed record; cycle dropped");
                return CycleOutcome::Malformed;
            }
        };
        if self.last_status.is_some_and(|prev| prev != status) {
            tracing::info!(machine = %observation.machine, %status, "machine status changed");
        }

        let table = self.send_row(&observation);
        let document = match self.document.upsert(&observation, self.last_status) {
            Ok(()) => {
                self.last_status = Some(status);
                Delivery::Sent
            }
            Err(e) => {
                tracing::warn!(sink = "document", error = %e, "upload failed");
                Delivery::Failed
            }
        };
        tracing::debug!(
            counter = observation.counter,
            %status,
            ?table,
            ?document,
            "observation forwarded"
        );
        CycleOutcome::Forwarded {
            status,
            table,
            document,
        }
    }

    // Oldest and newest only; the middle line does not take part.
    fn observe(&self) -> Result<(RunStatus, Observation), RecordError> {
        let (Some(oldest), Some(newest)) = (self.window.oldest(), self.window.newest()) else {
            return Err(RecordError::TooFewFields { found: 0 });
        };
        let status = classify(counter_of(oldest)?, counter_of(newest)?);
        let record = LogRecord::parse(&format!("{newest};{status}"))?;
        let observed_at = DateTime::<Utc>::from(self.clock.wall());
        let obs = Observation::from_record(
            &record,
            status,
            &self.settings.identity,
            self.settings.timezone,
            observed_at,
        )?;
        Ok((status, obs))
    }

    fn send_row(&mut self, obs: &Observation) -> Delivery {
        if self
            .last_sent
            .as_ref()
            .is_some_and(|prev| prev.same_reading(obs))
        {
            return Delivery::Suppressed;
        }
        match self.table.append(obs) {
            Ok(()) => {
                self.last_sent = Some(obs.clone());
                Delivery::Sent
            }
            Err(e) => {
                tracing::warn!(sink = "table", error = %e, "upload failed");
                Delivery::Failed
            }
        }
    }

    /// Poll until `stop` is set, sleeping `settings.interval` between cycles.
    /// Returns the number of cycles run.
    pub fn run(&mut self, stop: &AtomicBool) -> u64 {
        tracing::info!(
            file = %self.settings.log_file,
            interval_ms = u64::try_from(self.settings.interval.as_millis()).unwrap_or(u64::MAX),
            machine = %self.settings.identity.name,
            "tailer started"
        );
        let mut cycles = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let outcome = self.poll_once();
            cycles += 1;
            tracing::trace!(cycle = cycles, ?outcome, "cycle done");
            self.clock.sleep(self.settings.interval);
        }
        tracing::info!(cycles, "tailer stopped");
        cycles
    }
}
