//! Upload sinks for observations.
//!
//! Two seams mirror the two cloud destinations: a tabular sink that appends one
//! row per observation, and a document sink that keeps one document per machine.
//! The local implementations here stage data on disk; shipping it to a cloud
//! service is done by a separate uploader.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observation::Observation;
use crate::status::RunStatus;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persist {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Append-one-row destination.
pub trait TableSink {
    fn append(&mut self, obs: &Observation) -> Result<(), SinkError>;

    /// Newest row already stored, if the sink can tell. Lets a restarted
    /// tailer pick up where the previous run stopped.
    fn last_row(&self) -> Result<Option<Observation>, SinkError> {
        Ok(None)
    }
}

/// Keyed-document destination, one document per machine.
pub trait DocumentSink {
    /// Upsert the machine's document. `previous` is the last status this sink
    /// accepted; when it differs from `obs.status` the whole document is replaced,
    /// otherwise only `PI_Timestamp` is refreshed.
    fn upsert(&mut self, obs: &Observation, previous: Option<RunStatus>) -> Result<(), SinkError>;
}

/// Discards everything; stands in for a disabled sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TableSink for NullSink {
    fn append(&mut self, _obs: &Observation) -> Result<(), SinkError> {
        Ok(())
    }
}

impl DocumentSink for NullSink {
    fn upsert(&mut self, _obs: &Observation, _previous: Option<RunStatus>) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Appends observations as CSV rows; the header is written when the file is new.
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    path: PathBuf,
}

impl CsvTableSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSink for CsvTableSink {
    fn append(&mut self, obs: &Observation) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;
        let mut w = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        w.serialize(obs)?;
        w.flush()?;
        Ok(())
    }

    fn last_row(&self) -> Result<Option<Observation>, SinkError> {
        let mut rdr = match csv::Reader::from_path(&self.path) {
            Ok(r) => r,
            Err(e)
                if matches!(e.kind(), csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let mut last = None;
        for row in rdr.deserialize::<Observation>() {
            last = Some(row?);
        }
        Ok(last)
    }
}

/// Stored shape of a machine document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDocument {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Status")]
    pub status: RunStatus,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "PI_Timestamp")]
    pub pi_timestamp: String,
}

impl MachineDocument {
    fn from_observation(obs: &Observation) -> Self {
        Self {
            location: obs.location_name.clone(),
            status: obs.status,
            timestamp: obs.timestamp.clone(),
            pi_timestamp: obs.pi_timestamp.clone(),
        }
    }
}

/// JSON object of machine documents keyed by machine name, replaced atomically.
#[derive(Debug, Clone)]
pub struct JsonDocumentSink {
    path: PathBuf,
}

impl JsonDocumentSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<BTreeMap<String, MachineDocument>, SinkError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, docs: &BTreeMap<String, MachineDocument>) -> Result<(), SinkError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, docs)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| SinkError::Persist {
            path: self.path.clone(),
            reason: e.error.to_string(),
        })?;
        Ok(())
    }
}

impl DocumentSink for JsonDocumentSink {
    fn upsert(&mut self, obs: &Observation, previous: Option<RunStatus>) -> Result<(), SinkError> {
        let mut docs = self.load()?;
        match docs.get_mut(&obs.machine) {
            Some(doc) if previous == Some(obs.status) => {
                doc.pi_timestamp = obs.pi_timestamp.clone();
            }
            _ => {
                docs.insert(obs.machine.clone(), MachineDocument::from_observation(obs));
            }
        }
        self.store(&docs)
    }
}

/// What a `MemorySink` has seen.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub rows: Vec<Observation>,
    pub upserts: Vec<(Observation, Option<RunStatus>)>,
}

/// In-memory sink for tests. Clones share state; `fail(true)` makes every call error.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    state: Arc<Mutex<(Recorded, bool)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, (Recorded, bool)> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fail(&self, on: bool) {
        self.lock().1 = on;
    }

    pub fn recorded(&self) -> Recorded {
        self.lock().0.clone()
    }
}

impl TableSink for MemorySink {
    fn append(&mut self, obs: &Observation) -> Result<(), SinkError> {
        let mut st = self.lock();
        if st.1 {
            return Err(SinkError::Rejected("memory table sink set to fail".into()));
        }
        st.0.rows.push(obs.clone());
        Ok(())
    }

    fn last_row(&self) -> Result<Option<Observation>, SinkError> {
        Ok(self.lock().0.rows.last().cloned())
    }
}

impl DocumentSink for MemorySink {
    fn upsert(&mut self, obs: &Observation, previous: Option<RunStatus>) -> Result<(), SinkError> {
        let mut st = self.lock();
        if st.1 {
            return Err(SinkError::Rejected("memory document sink set to fail".into()));
        }
        st.0.upserts.push((obs.clone(), previous));
        Ok(())
    }
}

impl<T: TableSink + ?Sized> TableSink for Box<T> {
    fn append(&mut self, obs: &Observation) -> Result<(), SinkError> {
        (**self).append(obs)
    }

    fn last_row(&self) -> Result<Option<Observation>, SinkError> {
        (**self).last_row()
    }
}

impl<T: DocumentSink + ?Sized> DocumentSink for Box<T> {
    fn upsert(&mut self, obs: &Observation, previous: Option<RunStatus>) -> Result<(), SinkError> {
        (**self).upsert(obs, previous)
    }
}
