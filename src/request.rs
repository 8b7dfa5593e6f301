// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! In-flight read and write requests

use crate::buffer::BufferRef;
use crate::callback::IoCallback;
use crate::error::{Error, Result};
use crate::file::FileId;
use std::fmt;

/// Transfer size reported when the final byte count could not be obtained
pub const TRANSFER_FAILED: isize = -1;

/// Direction of an I/O request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Read from the file into the buffer
    Read,
    /// Write the buffer to the file
    Write,
}

/// Identifier of a submitted request
///
/// Valid from a successful submission until the request's completion
/// callback returns; afterwards [`Engine::is_pending`](crate::Engine::is_pending)
/// reports `false` and the slot may be reused under a new generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId {
    key: u32,
    generation: u32,
}

impl RequestId {
    pub(crate) fn new(key: usize, generation: u32) -> Self {
        debug_assert!(key <= u32::MAX as usize, "request arena exhausted");
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

    /// Pack into the 64-bit token handed to the backend
    pub(crate) fn to_token(self) -> u64 {
        (u64::from(self.key) << 32) | u64::from(self.generation)
    }

    pub(crate) fn from_token(token: u64) -> Self {
        Self {
            key: (token >> 32) as u32,
            generation: token as u32,
        }
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({}:{})", self.key, self.generation)
    }
}

/// Bookkeeping for one in-flight request
pub(crate) struct Request {
    pub generation: u32,
    pub file: FileId,
    pub op: Op,
    pub buf: BufferRef,
    pub offset: i64,
    /// 0 if the backend completed the request at submission
    pub queued_bytes: usize,
    pub callback: Option<IoCallback>,
}

/// Outcome of a finished request, handed to its callback
///
/// The caller still owns `buf`; nothing here frees or copies it.
#[derive(Debug)]
pub struct Completion {
    /// The request that finished
    pub request: RequestId,
    /// The handle that issued it
    pub file: FileId,
    /// Read or write
    pub op: Op,
    /// Absolute offset the request was issued at
    pub offset: i64,
    /// The buffer supplied at submission
    pub buf: BufferRef,
    /// OS-reported status of the transfer
    pub status: Result<()>,
    /// Bytes transferred, or [`TRANSFER_FAILED`]
    pub transferred: isize,
}

impl Completion {
    pub(crate) fn from_os_result(
        id: RequestId,
        req: &Request,
        result: std::io::Result<usize>,
    ) -> Self {
        let (status, transferred) = match result {
            Ok(n) => (Ok(()), isize::try_from(n).unwrap_or(TRANSFER_FAILED)),
            Err(e) => (Err(Error::Io(e)), TRANSFER_FAILED),
        };
        Self {
            request: id,
            file: req.file,
            op: req.op,
            offset: req.offset,
            buf: req.buf,
            status,
            transferred,
        }
    }

    /// Whether the OS reported success
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Fold status and transfer size into a single result
    pub fn result(self) -> Result<usize> {
        self.status?;
        usize::try_from(self.transferred).map_err(|_| Error::from_raw_os_error(libc::EIO))
    }
}
