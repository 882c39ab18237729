use std::time::{Duration, SystemTime};

/// Source of wall-clock time and of blocking waits.
pub trait Clock {
    /// Milliseconds since the UNIX epoch
    fn unix_millis(&self) -> u64;

    fn sleep(&self, duration: Duration);

    fn unix_seconds(&self) -> u64 {
        self.unix_millis() / 1000
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_millis(&self) -> u64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
