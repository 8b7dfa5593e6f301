// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Engine and file handle statistics

use crate::file::{CloseState, ShutdownState};

/// Engine statistics snapshot
///
/// Retrieved via `Engine::stats()` for monitoring and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub(crate) ops_submitted: u64,
    pub(crate) ops_completed: u64,
    pub(crate) bytes_transferred: u64,
    pub(crate) current_in_flight: usize,
    pub(crate) peak_in_flight: usize,
    pub(crate) open_files: usize,
}

impl Stats {
    /// Requests accepted by the backend
    pub fn ops_submitted(&self) -> u64 {
        self.ops_submitted
    }

    /// Completion callbacks delivered
    pub fn ops_completed(&self) -> u64 {
        self.ops_completed
    }

    /// Total bytes transferred by successful requests (read + written)
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Requests currently in flight across all handles
    pub fn current_in_flight(&self) -> usize {
        self.current_in_flight
    }

    /// High-water mark of in-flight requests
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    /// Handles bound and not yet closed
    pub fn open_files(&self) -> usize {
        self.open_files
    }

    pub(crate) fn record_submit(&mut self, in_flight: usize) {
        self.ops_submitted += 1;
        self.current_in_flight = in_flight;
        self.peak_in_flight = self.peak_in_flight.max(in_flight);
    }

    pub(crate) fn record_completion(&mut self, transferred: isize, in_flight: usize) {
        self.ops_completed += 1;
        if transferred > 0 {
            self.bytes_transferred += transferred as u64;
        }
        self.current_in_flight = in_flight;
    }
}

/// Per-handle snapshot
///
/// Retrieved via `Engine::file_stats()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    /// Logical cursor: where the next `Current` request starts
    pub cursor: i64,
    /// In-flight requests, plus one while a shutdown is draining
    pub pending_total: u32,
    /// In-flight reads
    pub pending_reads: u32,
    /// In-flight writes
    pub pending_writes: u32,
    /// Bytes of reads the backend has not completed synchronously
    pub read_queue_bytes: u64,
    /// Bytes of writes the backend has not completed synchronously
    pub write_queue_bytes: u64,
    /// Whether the handle is bound to the backend
    pub bound: bool,
    /// Write-side drain state
    pub shutdown: ShutdownState,
    /// Teardown state
    pub close: CloseState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = Stats::default();
        assert_eq!(stats.ops_submitted(), 0);
        assert_eq!(stats.ops_completed(), 0);
        assert_eq!(stats.bytes_transferred(), 0);
        assert_eq!(stats.current_in_flight(), 0);
        assert_eq!(stats.peak_in_flight(), 0);
        assert_eq!(stats.open_files(), 0);
    }

    #[test]
    fn test_peak_tracks_high_water_mark() {
        let mut stats = Stats::default();
        stats.record_submit(1);
        stats.record_submit(2);
        stats.record_submit(3);
        stats.record_completion(100, 2);
        stats.record_completion(-1, 1);
        stats.record_submit(2);

        assert_eq!(stats.ops_submitted(), 4);
        assert_eq!(stats.ops_completed(), 2);
        assert_eq!(stats.bytes_transferred(), 100);
        assert_eq!(stats.current_in_flight(), 2);
        assert_eq!(stats.peak_in_flight(), 3);
    }

    #[test]
    fn test_stats_clone_debug() {
        let mut stats = Stats::default();
        stats.record_submit(1);
        let copy = stats.clone();
        assert_eq!(copy, stats);
        assert!(format!("{:?}", copy).contains("Stats"));
    }
}
