//! Session statistics collection

use solarman_core::SolarmanError;

/// V5 session statistics
///
/// Updated by the session on every round trip; callers can take a snapshot
/// at any time to monitor link health.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    /// Successful dials
    pub connects: u64,
    /// Failed dials
    pub connect_failures: u64,
    /// Request frames written
    pub frames_sent: u64,
    /// Reply frames read
    pub frames_received: u64,
    /// Round trips that hit a deadline
    pub timeouts: u64,
    /// Connections torn down after a transport failure
    pub teardowns: u64,
    /// Replies rejected by the envelope or payload codec
    pub frames_rejected: u64,
    /// Envelope checksum or payload CRC failures
    pub checksum_errors: u64,
}

impl SessionStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Count a reply that was received but could not be interpreted
    pub fn record_rejected(&mut self, error: &SolarmanError) {
        self.frames_rejected += 1;
        if matches!(
            error.root(),
            SolarmanError::ChecksumMismatch { .. } | SolarmanError::CrcMismatch { .. }
        ) {
            self.checksum_errors += 1;
        }
    }

    /// Get error rate as a percentage of received frames
    ///
    /// Returns 0.0 if no frames have been received.
    pub fn error_rate(&self) -> f64 {
        if self.frames_received == 0 {
            0.0
        } else {
            (self.frames_rejected as f64 / self.frames_received as f64) * 100.0
        }
    }
}
