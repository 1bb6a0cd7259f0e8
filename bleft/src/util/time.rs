//! Time conversion helpers
// (c) 2026 Ross Younger

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Conversions between [`SystemTime`] and the protocol's modification time representation
/// (nanoseconds since the Unix epoch)
pub(crate) trait SystemTimeExt {
    /// Converts from nanoseconds since the epoch
    fn from_unix_nanos(nanos: u64) -> Self;
    /// Converts to nanoseconds since the epoch, saturating.
    /// Times before the epoch become 0.
    fn to_unix_nanos(&self) -> u64;
}

impl SystemTimeExt for SystemTime {
    fn from_unix_nanos(nanos: u64) -> Self {
        UNIX_EPOCH + Duration::from_nanos(nanos)
    }

    fn to_unix_nanos(&self) -> u64 {
        self.duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }
}

/// The current time, in nanoseconds since the epoch
pub(crate) fn now_unix_nanos() -> u64 {
    SystemTime::now().to_unix_nanos()
}
