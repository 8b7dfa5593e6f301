// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! File handle state: cursor, pending accounting and the teardown state machine
//!
//! A handle moves along two independent axes:
//!
//! ```text
//! shutdown:  Open --shutdown()--> Shutting --writes drained--> Shut
//! close:     Open --close()-----> Closing  --nothing pending--> Closed
//! ```
//!
//! The shutdown axis releases the descriptor once every outstanding write
//! has been acknowledged. The close axis finalizes the handle once every
//! request (including a requested shutdown) has finished.

use crate::callback::{CloseCallback, ShutdownCallback};
use crate::error::{Error, Result};
use crate::request::Op;
use crate::stats::FileStats;
use std::fmt;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

/// Identifier of a file handle bound to an [`Engine`](crate::Engine)
///
/// Becomes stale once the handle reaches the closed state; stale ids are
/// rejected rather than aliasing a newer handle in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    key: u32,
    generation: u32,
}

impl FileId {
    pub(crate) fn new(key: usize, generation: u32) -> Self {
        debug_assert!(key <= u32::MAX as usize, "file arena exhausted");
        Self {
            key: key as u32,
            generation,
        }
    }

    pub(crate) fn key(self) -> usize {
        self.key as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({}:{})", self.key, self.generation)
    }
}

/// Write-side drain state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownState {
    /// No shutdown requested
    Open,
    /// Shutdown requested; waiting for outstanding writes
    Shutting,
    /// Descriptor released
    Shut,
}

/// Teardown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseState {
    /// In use
    Open,
    /// Close requested; waiting for pending requests
    Closing,
    /// Finalized; the close callback has fired
    Closed,
}

/// Work produced by the shutdown step for the engine to carry out
pub(crate) struct ShutdownStep {
    pub fd: Option<OwnedFd>,
    pub callback: Option<ShutdownCallback>,
}

pub(crate) struct FileState {
    pub generation: u32,
    native: Option<OwnedFd>,
    cursor: i64,
    pending_total: u32,
    pending_reads: u32,
    pending_writes: u32,
    read_queue_bytes: u64,
    write_queue_bytes: u64,
    bound: bool,
    shutdown: ShutdownState,
    close: CloseState,
    close_cb: Option<CloseCallback>,
    shutdown_cb: Option<ShutdownCallback>,
}

impl FileState {
    /// A fresh, unbound handle owning `fd`
    pub fn new(generation: u32, fd: OwnedFd) -> Self {
        Self {
            generation,
            native: Some(fd),
            cursor: 0,
            pending_total: 0,
            pending_reads: 0,
            pending_writes: 0,
            read_queue_bytes: 0,
            write_queue_bytes: 0,
            bound: false,
            shutdown: ShutdownState::Open,
            close: CloseState::Open,
            close_cb: None,
            shutdown_cb: None,
        }
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        self.native.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn bind(&mut self, cursor: i64) {
        self.cursor = cursor;
        self.bound = true;
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn is_closing(&self) -> bool {
        self.close != CloseState::Open
    }

    /// Whether the engine should re-run the endgame steps for this handle
    pub fn wants_endgame(&self) -> bool {
        self.shutdown == ShutdownState::Shutting || self.close == CloseState::Closing
    }

    /// Reject submissions the handle can no longer accept
    pub fn check_submit(&self, op: Op) -> Result<RawFd> {
        if !self.bound || self.is_closing() {
            return Err(Error::Closed);
        }
        if op == Op::Write && self.shutdown != ShutdownState::Open {
            return Err(Error::Closed);
        }
        self.raw_fd().ok_or(Error::Closed)
    }

    /// Reserve `len` bytes past the cursor for a request being submitted
    pub fn advance_cursor(&mut self, len: usize) -> Result<()> {
        let len = i64::try_from(len).map_err(|_| Error::InvalidArgument("buffer too large"))?;
        self.cursor = self
            .cursor
            .checked_add(len)
            .ok_or(Error::InvalidArgument("offset overflows the file cursor"))?;
        Ok(())
    }

    /// Give back a reservation whose submission failed outright
    pub fn rewind_cursor(&mut self, len: usize) {
        self.cursor -= len as i64;
    }

    pub fn on_submitted(&mut self, op: Op, queued_bytes: usize) {
        match op {
            Op::Read => {
                self.read_queue_bytes += queued_bytes as u64;
                self.pending_reads += 1;
            }
            Op::Write => {
                self.write_queue_bytes += queued_bytes as u64;
                self.pending_writes += 1;
            }
        }
        self.pending_total += 1;
    }

    /// Drop a finished request's contribution to the queue counters
    pub fn on_dequeued(&mut self, op: Op, queued_bytes: usize) {
        let counter = match op {
            Op::Read => &mut self.read_queue_bytes,
            Op::Write => &mut self.write_queue_bytes,
        };
        *counter = counter
            .checked_sub(queued_bytes as u64)
            .expect("queue byte counter underflow");
    }

    /// Retire a request after its callback returned
    pub fn on_completed(&mut self, op: Op) {
        let counter = match op {
            Op::Read => &mut self.pending_reads,
            Op::Write => &mut self.pending_writes,
        };
        *counter = counter.checked_sub(1).expect("pending request counter underflow");
        self.pending_total = self
            .pending_total
            .checked_sub(1)
            .expect("pending request counter underflow");
    }

    /// Arm the write-side drain
    ///
    /// The shutdown counts as one pending request until the descriptor is
    /// released, which keeps the handle from finalizing before the drain.
    pub fn request_shutdown(&mut self, callback: Option<ShutdownCallback>) -> Result<()> {
        if !self.bound || self.is_closing() {
            return Err(Error::Closed);
        }
        if self.shutdown != ShutdownState::Open {
            return Err(Error::InvalidArgument("shutdown already requested"));
        }
        self.shutdown = ShutdownState::Shutting;
        self.shutdown_cb = callback;
        self.pending_total += 1;
        Ok(())
    }

    /// Arm teardown. Closing twice is a caller bug.
    pub fn request_close(&mut self, callback: Option<CloseCallback>) {
        assert!(
            self.close == CloseState::Open,
            "close requested on a file handle that is already closing"
        );
        self.close = CloseState::Closing;
        self.close_cb = callback;
    }

    /// Release the descriptor once every outstanding write is acknowledged
    pub fn shutdown_step(&mut self) -> Option<ShutdownStep> {
        if self.shutdown != ShutdownState::Shutting || self.pending_writes != 0 {
            return None;
        }
        self.shutdown = ShutdownState::Shut;
        self.pending_total = self
            .pending_total
            .checked_sub(1)
            .expect("pending request counter underflow");
        Some(ShutdownStep {
            fd: self.native.take(),
            callback: self.shutdown_cb.take(),
        })
    }

    /// Whether the final teardown guard holds
    pub fn close_ready(&self) -> bool {
        self.is_closing() && self.pending_total == 0
    }

    /// Enter the terminal state; returns the descriptor (if still held) and
    /// the close callback. Reaching `Closed` twice panics.
    pub fn mark_closed(&mut self) -> (Option<OwnedFd>, Option<CloseCallback>) {
        assert!(self.close != CloseState::Closed, "file handle closed twice");
        assert!(self.close_ready(), "file handle closed with requests pending");
        self.close = CloseState::Closed;
        (self.native.take(), self.close_cb.take())
    }

    /// Check the accounting invariants, naming the first one that fails
    pub fn check_invariants(&self) -> std::result::Result<(), &'static str> {
        let shutdown_pending = u32::from(self.shutdown == ShutdownState::Shutting);
        if self.pending_total != self.pending_reads + self.pending_writes + shutdown_pending {
            return Err("pending_total does not match per-direction counters");
        }
        if self.pending_reads == 0 && self.read_queue_bytes != 0 {
            return Err("read queue bytes without pending reads");
        }
        if self.pending_writes == 0 && self.write_queue_bytes != 0 {
            return Err("write queue bytes without pending writes");
        }
        if self.close == CloseState::Closed && (!self.bound || self.pending_total != 0) {
            return Err("closed handle is unbound or has pending requests");
        }
        let released = self.shutdown == ShutdownState::Shut || self.close == CloseState::Closed;
        if released == self.native.is_some() {
            return Err("descriptor ownership does not match handle state");
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FileStats {
        FileStats {
            cursor: self.cursor,
            pending_total: self.pending_total,
            pending_reads: self.pending_reads,
            pending_writes: self.pending_writes,
            read_queue_bytes: self.read_queue_bytes,
            write_queue_bytes: self.write_queue_bytes,
            bound: self.bound,
            shutdown: self.shutdown,
            close: self.close,
        }
    }
}
