// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Offset resolution for positioned reads and writes

use crate::error::{Error, Result};

/// How a requested offset is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Absolute offset from the start of the file
    Start,
    /// Relative to the handle's logical cursor
    Current,
    /// Relative to end of file (not supported: needs a size query)
    End,
}

/// Map a requested offset to an absolute byte offset.
///
/// `Start` passes the offset through unvalidated; negative values are left
/// for the OS to reject at submission. `Current` adds the offset to
/// `cursor`. `End` always fails with [`Error::Unsupported`].
pub fn resolve(offset: i64, whence: Whence, cursor: i64) -> Result<i64> {
    match whence {
        Whence::Start => Ok(offset),
        Whence::Current => cursor
            .checked_add(offset)
            .ok_or(Error::InvalidArgument("offset overflows the file cursor")),
        Whence::End => Err(Error::Unsupported("end-relative offsets")),
    }
}
