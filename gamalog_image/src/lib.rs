//! Image file access for the gadget's FAT32 backing store.
//!
//! `Mtools` shells out to mtools and is what runs on the Pi. `MemoryImage` keeps
//! files in memory and can inject failures; tests use it everywhere else.
pub mod error;
pub mod mtools;
pub mod util;

pub use error::ImageError;
pub use mtools::Mtools;

use gamalog_traits::{BoxError, ImageFs};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory image. Clones share the same files, so a test can hand one clone to
/// the code under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, Vec<u8>>,
    fail_reads: HashSet<String>,
    fail_writes: HashSet<String>,
    reads: usize,
    writes: usize,
}

// FAT 8.3 names are case-insensitive.
fn key(name: &str) -> String {
    name.trim_start_matches('/').to_ascii_uppercase()
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        self.insert(name, contents);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert(&self, name: &str, contents: impl AsRef<[u8]>) {
        self.lock()
            .files
            .insert(key(name), contents.as_ref().to_vec());
    }

    pub fn remove(&self, name: &str) {
        self.lock().files.remove(&key(name));
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&key(name)).cloned()
    }

    /// File contents as UTF-8 (lossy), for assertions.
    pub fn text(&self, name: &str) -> Option<String> {
        self.contents(name)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn fail_reads_of(&self, name: &str) {
        self.lock().fail_reads.insert(key(name));
    }

    pub fn fail_writes_of(&self, name: &str) {
        self.lock().fail_writes.insert(key(name));
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        let mut st = self.lock();
        st.fail_reads.clear();
        st.fail_writes.clear();
    }

    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    pub fn writes(&self) -> usize {
        self.lock().writes
    }
}

impl ImageFs for MemoryImage {
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, BoxError> {
        let mut st = self.lock();
        st.reads += 1;
        let k = key(name);
        if st.fail_reads.contains(&k) {
            return Err(Box::new(ImageError::Simulated {
                op: "read",
                name: name.to_string(),
            }));
        }
        Ok(st.files.get(&k).cloned())
    }

    fn write_file(&mut self, name: &str, contents: &[u8]) -> Result<(), BoxError> {
        let mut st = self.lock();
        let k = key(name);
        if st.fail_writes.contains(&k) {
            return Err(Box::new(ImageError::Simulated {
                op: "write",
                name: name.to_string(),
            }));
        }
        st.writes += 1;
        st.files.insert(k, contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut img = MemoryImage::new().with_file("logger.gam", "a\n");
        let got = img.read_file("LOGGER.GAM").unwrap();
        assert_eq!(got.as_deref(), Some(&b"a\n"[..]));
    }

    #[test]
    fn absent_file_reads_as_none() {
        let mut img = MemoryImage::new();
        assert!(img.read_file("LOGS_BKP.GAM").unwrap().is_none());
        assert_eq!(img.reads(), 1);
    }

    #[test]
    fn injected_write_failure_leaves_file_untouched() {
        let mut img = MemoryImage::new().with_file("LOGGER.GAM", "old");
        img.fail_writes_of("LOGGER.GAM");
        let err = img.write_file("LOGGER.GAM", b"new").unwrap_err();
        assert!(err.to_string().contains("simulated write failure"));
        assert_eq!(img.text("LOGGER.GAM").as_deref(), Some("old"));
        assert_eq!(img.writes(), 0);

        img.heal();
        img.write_file("LOGGER.GAM", b"new").unwrap();
        assert_eq!(img.text("LOGGER.GAM").as_deref(), Some("new"));
    }
}
