use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z (10957 days).
pub const NETWORK_EPOCH_OFFSET: u64 = 946_684_800;

/// Source of close times.
pub trait CloseClock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn unix_now(&self) -> u64;

    /// Seconds since 2000-01-01T00:00:00Z.
    fn network_now(&self) -> u64 {
        self.unix_now().saturating_sub(NETWORK_EPOCH_OFFSET)
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCloseClock;

impl CloseClock for SystemCloseClock {
    fn unix_now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A manually driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct FixedClock {
    unix: AtomicU64,
}

impl FixedClock {
    pub fn new(unix: u64) -> Self {
        Self {
            unix: AtomicU64::new(unix),
        }
    }

    /// A clock reading `network` seconds after 2000-01-01.
    pub fn at_network_time(network: u64) -> Self {
        Self::new(network + NETWORK_EPOCH_OFFSET)
    }

    pub fn set(&self, unix: u64) {
        self.unix.store(unix, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.unix.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl CloseClock for FixedClock {
    fn unix_now(&self) -> u64 {
        self.unix.load(Ordering::SeqCst)
    }
}

/// Round a close time to the nearest multiple of `resolution`, halves up.
/// Zero stays zero.
pub fn round_close_time(close_time: u64, resolution: u32) -> u64 {
    if close_time == 0 || resolution == 0 {
        return close_time;
    }
    let resolution = u64::from(resolution);
    let shifted = close_time + resolution / 2;
    shifted - shifted % resolution
}

/// Unix seconds of a network close time.
pub fn network_to_unix(close_time: u64) -> u64 {
    close_time + NETWORK_EPOCH_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_to_resolution() {
        assert_eq!(round_close_time(0, 30), 0);
        assert_eq!(round_close_time(14, 30), 0);
        assert_eq!(round_close_time(15, 30), 30);
        assert_eq!(round_close_time(44, 30), 30);
        assert_eq!(round_close_time(45, 30), 60);
        assert_eq!(round_close_time(61, 0), 61);
    }

    #[test]
    fn network_time_is_offset_from_unix() {
        let clock = FixedClock::new(NETWORK_EPOCH_OFFSET + 100);
        assert_eq!(clock.network_now(), 100);
        clock.advance(5);
        assert_eq!(clock.network_now(), 105);
        assert_eq!(FixedClock::at_network_time(7).unix_now(), network_to_unix(7));
    }

    #[test]
    fn clock_before_epoch_saturates() {
        assert_eq!(FixedClock::new(5).network_now(), 0);
    }

    #[test]
    fn system_clock_is_after_2000() {
        assert!(SystemCloseClock.network_now() > 0);
    }
}
