// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Synchronous backend: every transfer finishes inside `submit`

use super::{perform, Backend, Event, Submission, Submitted};
use crate::file::FileId;
use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Backend that performs `pread`/`pwrite` at submission time
///
/// Each accepted submission is reported [`Submitted::Completed`] and its
/// event waits in an internal queue until the next poll. A failing system
/// call is a hard submission failure, the same as a kernel refusing the
/// request.
#[derive(Debug, Default)]
pub struct InlineBackend {
    ready: VecDeque<Event>,
}

impl InlineBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for InlineBackend {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn register(&mut self, _fd: RawFd, _file: FileId) -> io::Result<()> {
        Ok(())
    }

    fn submit(&mut self, submission: Submission) -> io::Result<Submitted> {
        // SAFETY: the engine keeps the buffer valid until the event is delivered.
        let n = unsafe { perform(&submission) }?;
        self.ready.push_back(Event {
            token: submission.token,
            result: Ok(n),
        });
        Ok(Submitted::Completed)
    }

    fn poll(
        &mut self,
        events: &mut Vec<Event>,
        max: usize,
        _timeout: Option<Duration>,
    ) -> io::Result<()> {
        let n = max.min(self.ready.len());
        events.extend(self.ready.drain(..n));
        Ok(())
    }
}
