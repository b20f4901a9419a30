//! Machine run state and the counter-based classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Run state derived from the cumulative counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Stopped,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "Running",
            RunStatus::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(RunStatus::Running),
            "Stopped" => Ok(RunStatus::Stopped),
            other => Err(format!("unknown status {other:?}")),
        }
    }
}

/// Classify from the counter of the oldest and newest line of the window.
///
/// Running iff the counter moved and the newest value is non-zero. A counter
/// reset to 0 reads as Stopped even though it changed.
#[inline]
pub fn classify(oldest_counter: i64, newest_counter: i64) -> RunStatus {
    if newest_counter != oldest_counter && newest_counter != 0 {
        RunStatus::Running
    } else {
        RunStatus::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips() {
        for s in [RunStatus::Running, RunStatus::Stopped] {
            assert_eq!(s.to_string().parse::<RunStatus>().unwrap(), s);
        }
        assert!("running".parse::<RunStatus>().is_err());
    }
}
