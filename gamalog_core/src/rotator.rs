//! Log rotation: keep the header and the newest records, archive the rest.
//!
//! One pass:
//! 1. take the rotation lock (busy -> `Skipped(AlreadyRunning)`)
//! 2. read the log (absent -> `Skipped(NoLogFile)`); blank lines are not counted
//! 3. `L <= KEEP_LINES + 1` -> `Skipped(TooSmall)`
//! 4. append `lines[1..L-KEEP_LINES]` to the backup and write it
//! 5. only then rewrite the log as header + last `KEEP_LINES` lines
//!
//! The backup is written before the log is truncated, so a failure can never
//! drop archived lines. If the log write failed on an earlier pass the backup
//! already ends with the same lines; they are not appended a second time.
//! The lock guard is released on every return path.

use gamalog_traits::ImageFs;

use crate::config::RotatorSettings;
use crate::image_error::map_image_error;
use crate::lock::{LockError, RotationLock};
use crate::util::{data_lines, push_lines, terminate};

/// Data lines kept in the log after rotation.
pub const KEEP_LINES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRunning,
    NoLogFile,
    TooSmall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    Lock(String),
    LogReadError(String),
    BackupReadError(String),
    BackupWriteError(String),
    LogWriteError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationResult {
    /// `kept` lines (header included) stay in the log; `archived` went to the backup.
    Rotated { kept: usize, archived: usize },
    Skipped(SkipReason),
    Failed(FailReason),
}

impl RotationResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, RotationResult::Failed(_))
    }

    /// Stable short name for logs and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            RotationResult::Rotated { .. } => "Rotated",
            RotationResult::Skipped(SkipReason::AlreadyRunning) => "AlreadyRunning",
            RotationResult::Skipped(SkipReason::NoLogFile) => "NoLogFile",
            RotationResult::Skipped(SkipReason::TooSmall) => "TooSmall",
            RotationResult::Failed(FailReason::Lock(_)) => "LockError",
            RotationResult::Failed(FailReason::LogReadError(_)) => "LogReadError",
            RotationResult::Failed(FailReason::BackupReadError(_)) => "BackupReadError",
            RotationResult::Failed(FailReason::BackupWriteError(_)) => "BackupWriteError",
            RotationResult::Failed(FailReason::LogWriteError(_)) => "LogWriteError",
        }
    }
}

/// How a log splits into the part that stays and the part that is archived.
#[derive(Debug, PartialEq, Eq)]
pub struct RotationPlan<'a> {
    pub header: &'a [u8],
    pub body: Vec<&'a [u8]>,
    pub tail: Vec<&'a [u8]>,
}

/// Split `lines` for rotation; `None` when there is nothing to archive.
pub fn plan<'a>(lines: &[&'a [u8]]) -> Option<RotationPlan<'a>> {
    let total = lines.len();
    if total <= KEEP_LINES + 1 {
        return None;
    }
    let tail_start = total - KEEP_LINES;
    Some(RotationPlan {
        header: lines[0],
        body: lines[1..tail_start].to_vec(),
        tail: lines[tail_start..].to_vec(),
    })
}

// `lines` (newline-terminated) form the end of `buf`, starting on a line boundary.
fn ends_with_lines(buf: &[u8], lines: &[u8]) -> bool {
    if lines.is_empty() || !buf.ends_with(lines) {
        return false;
    }
    let start = buf.len() - lines.len();
    start == 0 || buf[start - 1] == b'\n'
}

pub struct Rotator<F> {
    fs: F,
    settings: RotatorSettings,
    lock: RotationLock,
}

impl<F: ImageFs> Rotator<F> {
    pub fn new(fs: F, settings: RotatorSettings) -> Self {
        let lock = RotationLock::new(settings.lock_path.clone());
        Self { fs, settings, lock }
    }

    pub fn settings(&self) -> &RotatorSettings {
        &self.settings
    }

    /// Run one rotation pass.
    pub fn rotate(&mut self) -> RotationResult {
        let _guard = match self.lock.try_acquire() {
            Ok(g) => g,
            Err(LockError::Busy { path }) => {
                tracing::info!(lock = %path.display(), "rotation already running; skipping");
                return RotationResult::Skipped(SkipReason::AlreadyRunning);
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot take rotation lock");
                return RotationResult::Failed(FailReason::Lock(e.to_string()));
            }
        };
        let result = self.rotate_locked();
        match &result {
            RotationResult::Rotated { kept, archived } => {
                tracing::info!(file = %self.settings.log_file, kept, archived, "rotation complete");
            }
            RotationResult::Skipped(reason) => {
                tracing::info!(file = %self.settings.log_file, ?reason, "rotation skipped");
            }
            RotationResult::Failed(reason) => {
                tracing::error!(file = %self.settings.log_file, ?reason, "rotation failed");
            }
        }
        result
    }

    fn rotate_locked(&mut self) -> RotationResult {
        let log_name = self.settings.log_file.clone();
        let backup_name = self.settings.backup_file.clone();

        let content = match self.fs.read_file(&log_name) {
            Ok(Some(c)) => c,
            Ok(None) => return RotationResult::Skipped(SkipReason::NoLogFile),
            Err(e) => {
                let err = map_image_error(e.as_ref());
                return RotationResult::Failed(FailReason::LogReadError(err.to_string()));
            }
        };

        let lines = data_lines(&content);
        let Some(split) = plan(&lines) else {
            tracing::debug!(file = %log_name, lines = lines.len(), "log within retention");
            return RotationResult::Skipped(SkipReason::TooSmall);
        };

        if !split.body.is_empty() {
            let mut backup = match self.fs.read_file(&backup_name) {
                Ok(existing) => existing.unwrap_or_default(),
                Err(e) => {
                    let err = map_image_error(e.as_ref());
                    return RotationResult::Failed(FailReason::BackupReadError(err.to_string()));
                }
            };
            let mut appended = Vec::new();
            push_lines(&mut appended, split.body.iter().copied());
            if ends_with_lines(&backup, &appended) {
                tracing::info!(
                    file = %backup_name,
                    lines = split.body.len(),
                    "backup already holds these lines; not appending again"
                );
            } else {
                let before = backup.len();
                terminate(&mut backup);
                backup.extend_from_slice(&appended);
                if let Err(e) = self.fs.write_file(&backup_name, &backup) {
                    let err = map_image_error(e.as_ref());
                    return RotationResult::Failed(FailReason::BackupWriteError(err.to_string()));
                }
                tracing::debug!(
                    file = %backup_name,
                    appended = split.body.len(),
                    bytes_before = before,
                    bytes_after = backup.len(),
                    "backup extended"
                );
            }
        }

        let mut rewritten = Vec::with_capacity(content.len());
        push_lines(
            &mut rewritten,
            std::iter::once(split.header).chain(split.tail.iter().copied()),
        );
        if let Err(e) = self.fs.write_file(&log_name, &rewritten) {
            let err = map_image_error(e.as_ref());
            return RotationResult::Failed(FailReason::LogWriteError(err.to_string()));
        }

        RotationResult::Rotated {
            kept: 1 + split.tail.len(),
            archived: split.body.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_keeps_header_and_four() {
        let lines: Vec<&[u8]> = ["h", "1", "2", "3", "4", "5", "6", "7"].iter().map(|s| s.as_bytes()).collect();
        let p = plan(&lines).unwrap();
        assert_eq!(p.header, b"h");
        assert_eq!(p.body, vec![&b"1"[..], &b"2"[..], &b"3"[..]]);
        assert_eq!(p.tail, vec![&b"4"[..], &b"5"[..], &b"6"[..], &b"7"[..]]);
    }

    #[test]
    fn ends_with_lines_needs_a_line_boundary() {
        assert!(ends_with_lines(b"a\nb\nc\n", b"b\nc\n"));
        assert!(ends_with_lines(b"b\nc\n", b"b\nc\n"));
        assert!(!ends_with_lines(b"ab\nc\n", b"b\nc\n"));
        assert!(!ends_with_lines(b"b\nc", b"b\nc\n"));
        assert!(!ends_with_lines(b"", b""));
    }

    #[test]
    fn plan_skips_small_logs() {
        let five: Vec<&[u8]> = ["h", "1", "2", "3", "4"].iter().map(|s| s.as_bytes()).collect();
        assert!(plan(&five).is_none());
        assert!(plan(&[]).is_none());
        let six: Vec<&[u8]> = ["h", "1", "2", "3", "4", "5"].iter().map(|s| s.as_bytes()).collect();
        assert_eq!(plan(&six).unwrap().body, vec![&b"1"[..]]);
    }
}
