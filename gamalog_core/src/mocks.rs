//! Test and helper mocks for gamalog_core

use std::collections::VecDeque;

use gamalog_traits::{BoxError, ImageFs};

/// An image whose every call fails with `message`; useful for driving error paths
/// without the in-memory image's per-file switches.
#[derive(Debug, Clone)]
pub struct BrokenImage {
    pub message: String,
}

impl BrokenImage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ImageFs for BrokenImage {
    fn read_file(&mut self, _name: &str) -> Result<Option<Vec<u8>>, BoxError> {
        Err(Box::new(std::io::Error::other(self.message.clone())))
    }

    fn write_file(&mut self, _name: &str, _contents: &[u8]) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other(self.message.clone())))
    }
}

/// One scripted answer to `read_file`.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Content(String),
    Missing,
    Fail(String),
}

/// Answers reads from a script, one entry per call, repeating the last entry
/// once the script runs out. Writes are accepted and dropped.
#[derive(Debug, Clone, Default)]
pub struct ScriptedImage {
    script: VecDeque<ScriptedRead>,
    last: Option<ScriptedRead>,
}

impl ScriptedImage {
    pub fn new(script: impl IntoIterator<Item = ScriptedRead>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
        }
    }
}

impl ImageFs for ScriptedImage {
    fn read_file(&mut self, _name: &str) -> Result<Option<Vec<u8>>, BoxError> {
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        match &self.last {
            Some(ScriptedRead::Content(c)) => Ok(Some(c.clone().into_bytes())),
            Some(ScriptedRead::Missing) | None => Ok(None),
            Some(ScriptedRead::Fail(msg)) => Err(Box::new(std::io::Error::other(msg.clone()))),
        }
    }

    fn write_file(&mut self, _name: &str, _contents: &[u8]) -> Result<(), BoxError> {
        Ok(())
    }
}
