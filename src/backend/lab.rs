// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Scriptable backend for exercising engine state machines
//!
//! [`LabBackend`] holds transfers until the test releases them, in any
//! order and with any outcome. Clones share state, so a test keeps one
//! clone for control after boxing another into the engine:
//!
//! ```
//! use aura_file::backend::{LabBackend, Release};
//! use aura_file::{Engine, Options};
//!
//! let lab = LabBackend::new();
//! let engine = Engine::with_backend(Box::new(lab.clone()), &Options::new());
//! assert_eq!(lab.pending(), 0);
//! lab.release(Release::Lifo);
//! ```

use super::{perform, Backend, Event, Submission, Submitted};
use crate::file::FileId;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

/// Order in which held transfers are carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Oldest submission first
    Fifo,
    /// Newest submission first
    Lifo,
}

#[derive(Default)]
struct LabState {
    sync: bool,
    fail_next_submit: Option<i32>,
    fail_registration: Option<i32>,
    history: Vec<Submission>,
    held: Vec<Submission>,
    ready: VecDeque<Event>,
    registered: Vec<(RawFd, FileId)>,
    released: Vec<RawFd>,
}

/// Test backend with manual completion control
#[derive(Clone, Default)]
pub struct LabBackend {
    state: Rc<RefCell<LabState>>,
}

impl LabBackend {
    /// Create a backend that holds every transfer
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete transfers during `submit` instead of holding them
    pub fn set_sync(&self, sync: bool) {
        self.state.borrow_mut().sync = sync;
    }

    /// Reject the next submission with `errno`
    pub fn fail_next_submit(&self, errno: i32) {
        self.state.borrow_mut().fail_next_submit = Some(errno);
    }

    /// Reject every registration with `errno` until cleared with `None`
    pub fn fail_registration(&self, errno: Option<i32>) {
        self.state.borrow_mut().fail_registration = errno;
    }

    /// Every accepted submission so far, oldest first
    pub fn submissions(&self) -> Vec<Submission> {
        self.state.borrow().history.clone()
    }

    /// Transfers submitted and not yet released
    pub fn pending(&self) -> usize {
        self.state.borrow().held.len()
    }

    /// Descriptors the engine bound, in registration order
    pub fn registered_fds(&self) -> Vec<RawFd> {
        self.state.borrow().registered.iter().map(|(fd, _)| *fd).collect()
    }

    /// Descriptors the engine released before closing them
    ///
    /// Releasing a descriptor fails its held transfers with `EBADF`.
    pub fn released_fds(&self) -> Vec<RawFd> {
        self.state.borrow().released.clone()
    }

    /// Carry out every held transfer in `order`
    ///
    /// The real `pread`/`pwrite` runs now, so buffers observe the effect
    /// of the release order. Events become visible on the next poll.
    pub fn release(&self, order: Release) {
        let mut state = self.state.borrow_mut();
        let mut held = std::mem::take(&mut state.held);
        if order == Release::Lifo {
            held.reverse();
        }
        for sub in held {
            // SAFETY: the engine keeps request buffers alive until delivery.
            let result = unsafe { perform(&sub) };
            state.ready.push_back(Event {
                token: sub.token,
                result,
            });
        }
    }

    /// Fail every held transfer with `errno` without touching the file
    pub fn release_with_error(&self, errno: i32) {
        let mut state = self.state.borrow_mut();
        let held = std::mem::take(&mut state.held);
        for sub in held {
            state.ready.push_back(Event {
                token: sub.token,
                result: Err(io::Error::from_raw_os_error(errno)),
            });
        }
    }
}

impl Backend for LabBackend {
    fn name(&self) -> &'static str {
        "lab"
    }

    fn register(&mut self, fd: RawFd, file: FileId) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(errno) = state.fail_registration {
            return Err(io::Error::from_raw_os_error(errno));
        }
        state.registered.push((fd, file));
        Ok(())
    }

    fn release(&mut self, fd: RawFd) {
        let mut state = self.state.borrow_mut();
        state.released.push(fd);
        // Held transfers on a closing descriptor must not run against
        // whatever reuses its number
        let held = std::mem::take(&mut state.held);
        let (orphaned, kept): (Vec<_>, Vec<_>) = held.into_iter().partition(|sub| sub.fd == fd);
        state.held = kept;
        for sub in orphaned {
            state.ready.push_back(Event {
                token: sub.token,
                result: Err(io::Error::from_raw_os_error(libc::EBADF)),
            });
        }
    }

    fn submit(&mut self, submission: Submission) -> io::Result<Submitted> {
        let mut state = self.state.borrow_mut();
        if let Some(errno) = state.fail_next_submit.take() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        if state.sync {
            // SAFETY: the caller's buffer is valid for the transfer.
            let n = unsafe { perform(&submission) }?;
            state.history.push(submission);
            state.ready.push_back(Event {
                token: submission.token,
                result: Ok(n),
            });
            return Ok(Submitted::Completed);
        }
        state.history.push(submission);
        state.held.push(submission);
        Ok(Submitted::Pending)
    }

    fn poll(
        &mut self,
        events: &mut Vec<Event>,
        max: usize,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        let blocking = timeout.is_none();
        if blocking && self.state.borrow().ready.is_empty() {
            // A blocking wait finishes the oldest transfer, like a real device
            let mut state = self.state.borrow_mut();
            if !state.held.is_empty() {
                let sub = state.held.remove(0);
                // SAFETY: as in `release`.
                let result = unsafe { perform(&sub) };
                state.ready.push_back(Event {
                    token: sub.token,
                    result,
                });
            }
        }
        let mut state = self.state.borrow_mut();
        let n = max.min(state.ready.len());
        events.extend(state.ready.drain(..n));
        Ok(())
    }
}
