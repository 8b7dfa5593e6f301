// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Completion backends
//!
//! A backend is the OS facility that carries out submitted reads and writes
//! and later reports their results. The engine hands it one [`Submission`]
//! per request and collects [`Event`]s from [`Backend::poll`]; every
//! accepted submission produces exactly one event, even when the backend
//! finished the transfer before `submit` returned.

mod inline;
#[cfg(any(test, feature = "testing"))]
mod lab;
#[cfg(all(target_os = "linux", feature = "uring"))]
mod uring;

pub use inline::InlineBackend;
#[cfg(any(test, feature = "testing"))]
pub use lab::{LabBackend, Release};
#[cfg(all(target_os = "linux", feature = "uring"))]
pub use uring::UringBackend;

use crate::buffer::BufferRef;
use crate::error::{Error, Result};
use crate::file::FileId;
use crate::log::{log_emit, LogLevel};
use crate::options::{BackendKind, Options};
use crate::request::Op;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// One read or write handed to a backend
#[derive(Debug, Clone, Copy)]
pub struct Submission {
    /// Opaque value echoed back in the request's [`Event`]
    pub token: u64,
    /// Read or write
    pub op: Op,
    /// Target descriptor
    pub fd: RawFd,
    /// Memory to transfer; valid until the event is delivered
    pub buf: BufferRef,
    /// Absolute byte offset
    pub offset: i64,
}

/// How a backend accepted a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// The transfer finished during `submit`; its event is already queued
    Completed,
    /// The transfer is in progress
    Pending,
}

/// Result of one finished submission
#[derive(Debug)]
pub struct Event {
    /// Token of the submission
    pub token: u64,
    /// Bytes transferred, or the OS error
    pub result: io::Result<usize>,
}

/// OS completion mechanism used by the [`Engine`](crate::Engine)
///
/// Implementations are driven from a single thread. `submit` must not
/// block on the transfer itself; `poll` is the only place the engine waits.
pub trait Backend {
    /// Short backend name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Bind a descriptor to the completion mechanism
    fn register(&mut self, fd: RawFd, file: FileId) -> io::Result<()>;

    /// Forget a descriptor that is about to be closed
    ///
    /// Transfers on `fd` that have not been started yet must be started or
    /// failed here; the number may be reused right after.
    fn release(&mut self, _fd: RawFd) {}

    /// Start a transfer
    ///
    /// An `Err` is a hard failure: no event will be produced for the token.
    fn submit(&mut self, submission: Submission) -> io::Result<Submitted>;

    /// Append at most `max` finished transfers to `events`
    ///
    /// Blocks up to `timeout` (`None` = until at least one event) when no
    /// event is ready. Returns early with nothing appended if interrupted.
    /// Events beyond `max` stay queued for the next poll.
    fn poll(
        &mut self,
        events: &mut Vec<Event>,
        max: usize,
        timeout: Option<Duration>,
    ) -> io::Result<()>;
}

/// Build the backend selected by `options`
pub(crate) fn from_options(options: &Options) -> Result<Box<dyn Backend>> {
    match options.backend {
        BackendKind::Inline => Ok(Box::new(InlineBackend::new())),
        BackendKind::Uring => uring_backend(options).map_err(Error::EngineCreate),
        BackendKind::Auto => match uring_backend(options) {
            Ok(backend) => Ok(backend),
            Err(e) => {
                log_emit(
                    LogLevel::Notice,
                    &format!("io_uring unavailable ({}), using inline backend", e),
                );
                Ok(Box::new(InlineBackend::new()))
            }
        },
    }
}

#[cfg(all(target_os = "linux", feature = "uring"))]
fn uring_backend(options: &Options) -> io::Result<Box<dyn Backend>> {
    Ok(Box::new(UringBackend::new(options.queue_depth)?))
}

#[cfg(not(all(target_os = "linux", feature = "uring")))]
fn uring_backend(_options: &Options) -> io::Result<Box<dyn Backend>> {
    Err(io::Error::from_raw_os_error(libc::ENOSYS))
}

/// Perform a submission synchronously with `pread`/`pwrite`
///
/// # Safety
///
/// The submission's buffer must be valid for the transfer.
pub(crate) unsafe fn perform(sub: &Submission) -> io::Result<usize> {
    match sub.op {
        Op::Read => unsafe {
            crate::sys::pread(sub.fd, sub.buf.as_mut_ptr(), sub.buf.len(), sub.offset)
        },
        Op::Write => unsafe {
            crate::sys::pwrite(sub.fd, sub.buf.as_ptr(), sub.buf.len(), sub.offset)
        },
    }
}
