use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

/// Time source for the polling loops.
///
/// - wall(): current wall-clock time (stamped onto observations)
/// - sleep(): wait between cycles (implementations may simulate)
pub trait Clock {
    fn wall(&self) -> SystemTime;
    fn sleep(&self, d: Duration);
}

/// Real clock backed by `SystemTime::now` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock for tests: `sleep` advances time instead of blocking.
///
/// wall() = origin + total slept. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: SystemTime,
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: usize,
}

impl ManualClock {
    pub fn starting_at(origin: SystemTime) -> Self {
        Self {
            origin,
            state: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    /// Move time forward without counting a sleep.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut st) = self.state.lock() {
            st.offset = st.offset.saturating_add(d);
        }
    }

    /// Number of `sleep` calls observed so far.
    pub fn sleeps(&self) -> usize {
        self.state.lock().map(|st| st.sleeps).unwrap_or(0)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn wall(&self) -> SystemTime {
        let off = self.state.lock().map(|st| st.offset).unwrap_or_default();
        self.origin + off
    }

    fn sleep(&self, d: Duration) {
        if let Ok(mut st) = self.state.lock() {
            st.offset = st.offset.saturating_add(d);
            st.sleeps += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::default();
        clock.sleep(Duration::from_secs(2));
        clock.sleep(Duration::from_secs(3));
        assert_eq!(clock.sleeps(), 2);
        assert_eq!(
            clock.wall(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(5)
        );
    }

    #[test]
    fn clones_share_timeline() {
        let a = ManualClock::default();
        let b = a.clone();
        a.advance(Duration::from_millis(250));
        assert_eq!(b.wall(), SystemTime::UNIX_EPOCH + Duration::from_millis(250));
        assert_eq!(b.sleeps(), 0);
    }
}
