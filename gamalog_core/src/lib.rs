#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Log tailing, run-state classification and rotation for a machine log
//! living inside a FAT32 image.
//!
//! All image access goes through `gamalog_traits::ImageFs`; nothing in this
//! crate spawns processes or knows about the toolset behind the trait.
//!
//! ## Architecture
//!
//! - **Records**: `LOGGER.GAM` header and 16-field records (`record` module)
//! - **Classification**: counter of the oldest vs newest window line (`status`)
//! - **Tailer**: 3-line window, observation building, sink hand-off (`tailer`)
//! - **Rotator**: header + last 4 lines kept, the rest archived (`rotator`)
//! - **Sinks**: table and document seams with local implementations (`sink`)
//! - **Simulator**: appends synthetic records for bench testing (`simulator`)

pub mod config;
pub mod conversions;
pub mod error;
pub mod image_error;
pub mod lock;
pub mod mocks;
pub mod observation;
pub mod record;
pub mod rotator;
pub mod simulator;
pub mod sink;
pub mod status;
pub mod tailer;
pub mod util;
pub mod window;

pub use config::{RotatorSettings, SimulatorSettings, TailerSettings};
pub use error::{GamalogError, Result};
pub use lock::{LockError, LockGuard, RotationLock};
pub use observation::{MachineIdentity, Observation};
pub use record::{LogHeader, LogRecord, RecordError};
pub use rotator::{FailReason, KEEP_LINES, RotationResult, Rotator, SkipReason};
pub use simulator::Simulator;
pub use sink::{
    CsvTableSink, DocumentSink, JsonDocumentSink, MemorySink, NullSink, SinkError, TableSink,
};
pub use status::{RunStatus, classify};
pub use tailer::{CycleOutcome, Delivery, Tailer};
pub use window::SlidingWindow;
