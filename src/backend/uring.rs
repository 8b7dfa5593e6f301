// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! io_uring backend

use super::{Backend, Event, Submission, Submitted};
use crate::file::FileId;
use crate::log::{log_emit, LogLevel};
use crate::request::Op;
use io_uring::{opcode, squeue, types, IoUring};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Backend that queues transfers on an io_uring instance
///
/// Every accepted submission is [`Submitted::Pending`]; results arrive
/// through the completion queue on a later poll. Descriptors need no
/// registration: each SQE names its fd directly.
pub struct UringBackend {
    ring: IoUring,
    in_flight: usize,
}

impl UringBackend {
    /// Create a ring with `queue_depth` submission entries
    pub fn new(queue_depth: u32) -> io::Result<Self> {
        let ring = IoUring::new(queue_depth.max(1))?;
        Ok(Self { ring, in_flight: 0 })
    }

    fn push(&mut self, entry: &squeue::Entry) -> io::Result<()> {
        // SAFETY: the entry's buffer stays valid until its CQE is reaped.
        if unsafe { self.ring.submission().push(entry) }.is_ok() {
            return Ok(());
        }
        // Full queue: hand the backlog to the kernel and try once more
        self.ring.submit()?;
        unsafe { self.ring.submission().push(entry) }
            .map_err(|_| io::Error::from_raw_os_error(libc::EBUSY))
    }

    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let result = match timeout {
            None => self.ring.submit_and_wait(1),
            Some(t) if t.is_zero() => self.ring.submit(),
            Some(t) if self.ring.params().is_feature_ext_arg() => {
                let ts = types::Timespec::new()
                    .sec(t.as_secs())
                    .nsec(t.subsec_nanos());
                let args = types::SubmitArgs::new().timespec(&ts);
                self.ring.submitter().submit_with_args(1, &args)
            }
            // No timed wait on this kernel; return with whatever is ready
            Some(_) => self.ring.submit(),
        };
        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.raw_os_error(), Some(libc::ETIME) | Some(libc::EINTR)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Backend for UringBackend {
    fn name(&self) -> &'static str {
        "uring"
    }

    fn register(&mut self, _fd: RawFd, _file: FileId) -> io::Result<()> {
        Ok(())
    }

    fn release(&mut self, fd: RawFd) {
        // SQEs still in the ring must take their file reference before close
        if let Err(e) = self.ring.submit() {
            log_emit(
                LogLevel::Warning,
                &format!("io_uring flush before releasing fd {} failed: {}", fd, e),
            );
        }
    }

    fn submit(&mut self, submission: Submission) -> io::Result<Submitted> {
        let len = u32::try_from(submission.buf.len())
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        let offset = u64::try_from(submission.offset)
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        let fd = types::Fd(submission.fd);

        let entry = match submission.op {
            Op::Read => opcode::Read::new(fd, submission.buf.as_mut_ptr(), len)
                .offset(offset)
                .build(),
            Op::Write => opcode::Write::new(fd, submission.buf.as_ptr(), len)
                .offset(offset)
                .build(),
        }
        .user_data(submission.token);

        self.push(&entry)?;
        self.in_flight += 1;
        // The entry is queued either way; a failed enter is retried by the next poll
        if let Err(e) = self.ring.submit() {
            log_emit(LogLevel::Debug, &format!("io_uring enter deferred: {}", e));
        }
        Ok(Submitted::Pending)
    }

    fn poll(
        &mut self,
        events: &mut Vec<Event>,
        max: usize,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        if self.ring.completion().is_empty() {
            if self.in_flight == 0 {
                return Ok(());
            }
            self.wait(timeout)?;
        }

        let before = events.len();
        // Unconsumed CQEs stay in the ring for the next poll
        for cqe in self.ring.completion().take(max) {
            let res = cqe.result();
            let result = if res < 0 {
                Err(io::Error::from_raw_os_error(-res))
            } else {
                Ok(res as usize)
            };
            events.push(Event {
                token: cqe.user_data(),
                result,
            });
        }
        self.in_flight -= events.len() - before;
        Ok(())
    }
}
