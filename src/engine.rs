// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Core Engine type for aura-file

use crate::backend::{self, Backend, Event, Submission, Submitted};
use crate::buffer::BufferRef;
use crate::callback::{CallbackScope, IoCallback};
use crate::error::{Error, Result};
use crate::file::{FileId, FileState};
use crate::log::{log_emit, LogLevel};
use crate::offset::{self, Whence};
use crate::options::Options;
use crate::request::{Completion, Op, Request, RequestId};
use crate::stats::{FileStats, Stats};
use crate::sys;

use slab::Slab;
use std::collections::VecDeque;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::time::Duration;

/// Single-threaded completion engine for file handles
///
/// Owns the completion backend, every bound file handle and every request
/// in flight. Submissions return immediately; results are delivered to
/// callbacks from [`turn`](Engine::turn) and [`run`](Engine::run).
/// Callbacks receive `&mut Engine` and may submit, shut down or close
/// handles, including the one that issued the request.
///
/// # Example
///
/// ```no_run
/// use aura_file::{Buffer, Engine};
/// use std::fs::File;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut engine = Engine::new()?;
/// let file = engine.init_file(File::open("/etc/hostname")?)?;
/// let buf = Buffer::new(4096)?;
///
/// unsafe {
///     engine.read(file, &[buf.to_ref()], |engine, done| {
///         let file = done.file;
///         match done.result() {
///             Ok(n) => println!("Read {} bytes", n),
///             Err(e) => eprintln!("Error: {}", e),
///         }
///         engine.close(file, |_, _| {}).ok();
///     })
/// }?;
///
/// engine.run()?;
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    backend: Box<dyn Backend>,
    files: Slab<FileState>,
    requests: Slab<Request>,
    /// Handles whose shutdown or teardown guard needs re-evaluation
    endgame: VecDeque<FileId>,
    events: Vec<Event>,
    /// Most completions delivered by one turn
    event_capacity: usize,
    generation: u32,
    /// Keep-alive references: one per bound, not yet closed handle
    refs: usize,
    in_callback: bool,
    stats: Stats,
}

impl Engine {
    /// Create a new engine with default options
    pub fn new() -> Result<Self> {
        Self::with_options(&Options::default())
    }

    /// Create a new engine with custom options
    pub fn with_options(options: &Options) -> Result<Self> {
        let backend = backend::from_options(options)?;
        Ok(Self::with_backend(backend, options))
    }

    /// Create an engine on top of an existing backend
    ///
    /// Only the event capacity of `options` applies; the backend choice
    /// and queue depth in it are ignored.
    pub fn with_backend(backend: Box<dyn Backend>, options: &Options) -> Self {
        log_emit(
            LogLevel::Debug,
            &format!("engine created with {} backend", backend.name()),
        );
        Self {
            backend,
            files: Slab::new(),
            requests: Slab::new(),
            endgame: VecDeque::new(),
            events: Vec::with_capacity(options.event_capacity),
            event_capacity: options.event_capacity,
            generation: 0,
            refs: 0,
            in_callback: false,
            stats: Stats::default(),
        }
    }

    /// Name of the completion backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn next_generation(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    // =========================================================================
    // File Handles
    // =========================================================================

    /// Bind an open descriptor to the engine
    ///
    /// The descriptor is registered with the backend and its current byte
    /// position becomes the handle's cursor. On failure no handle exists
    /// and the descriptor is closed.
    pub fn init_file(&mut self, fd: impl Into<OwnedFd>) -> Result<FileId> {
        let fd: OwnedFd = fd.into();
        let raw = fd.as_raw_fd();
        let generation = self.next_generation();
        let key = self.files.insert(FileState::new(generation, fd));
        let id = FileId::new(key, generation);

        if let Err(e) = self.backend.register(raw, id) {
            self.files.remove(key);
            return Err(Error::Register(e));
        }
        let cursor = match sys::current_position(raw) {
            Ok(cursor) => cursor,
            Err(e) => {
                self.backend.release(raw);
                self.files.remove(key);
                return Err(Error::Position(e));
            }
        };

        self.files[key].bind(cursor);
        self.refs += 1;
        self.stats.open_files = self.refs;
        log_emit(
            LogLevel::Debug,
            &format!("bound {:?} to fd {} at offset {}", id, raw, cursor),
        );
        Ok(id)
    }

    /// Stop accepting writes and release the descriptor once pending
    /// writes are acknowledged
    ///
    /// Reads stay allowed until the release. The callback receives the
    /// status of closing the descriptor.
    ///
    /// Reads still in flight at the release are not waited for. The backend
    /// is told about the release first: io_uring hands every queued entry
    /// to the kernel, which pins the file, while a backend that only starts
    /// transfers later must fail them rather than touch a closed or reused
    /// descriptor number.
    pub fn shutdown<F>(&mut self, file: FileId, callback: F) -> Result<()>
    where
        F: FnOnce(&mut Engine, FileId, Result<()>) + 'static,
    {
        let state = lookup(&mut self.files, file)
            .ok_or(Error::InvalidArgument("unknown file handle"))?;
        state.request_shutdown(Some(Box::new(callback)))?;
        self.endgame.push_back(file);
        Ok(())
    }

    /// Tear the handle down once nothing is pending
    ///
    /// The callback fires after the descriptor is closed; from then on
    /// `file` is stale.
    ///
    /// # Panics
    ///
    /// Panics if the handle is already closing.
    pub fn close<F>(&mut self, file: FileId, callback: F) -> Result<()>
    where
        F: FnOnce(&mut Engine, FileId) + 'static,
    {
        let state = lookup(&mut self.files, file)
            .ok_or(Error::InvalidArgument("unknown file handle"))?;
        state.request_close(Some(Box::new(callback)));
        self.endgame.push_back(file);
        Ok(())
    }

    // =========================================================================
    // Core I/O Operations
    // =========================================================================

    /// Read at the handle's cursor
    ///
    /// Same as `read_at(file, 0, Whence::Current, bufs, callback)`.
    ///
    /// # Safety
    ///
    /// The buffer must stay valid and unaliased until the callback runs.
    pub unsafe fn read<F>(
        &mut self,
        file: FileId,
        bufs: &[BufferRef],
        callback: F,
    ) -> Result<RequestId>
    where
        F: FnOnce(&mut Engine, Completion) + 'static,
    {
        unsafe { self.read_at(file, 0, Whence::Current, bufs, callback) }
    }

    /// Submit a read
    ///
    /// Exactly one buffer is accepted. A `Current` read reserves
    /// `bufs[0].len()` bytes past the cursor at submission, so back-to-back
    /// reads cover consecutive ranges whatever order they complete in.
    ///
    /// # Safety
    ///
    /// The buffer must stay valid and unaliased until the callback runs.
    pub unsafe fn read_at<F>(
        &mut self,
        file: FileId,
        offset: i64,
        whence: Whence,
        bufs: &[BufferRef],
        callback: F,
    ) -> Result<RequestId>
    where
        F: FnOnce(&mut Engine, Completion) + 'static,
    {
        self.submit(file, Op::Read, offset, whence, bufs, Box::new(callback))
    }

    /// Write at the handle's cursor
    ///
    /// Same as `write_at(file, 0, Whence::Current, bufs, callback)`.
    ///
    /// # Safety
    ///
    /// The buffer must stay valid until the callback runs.
    pub unsafe fn write<F>(
        &mut self,
        file: FileId,
        bufs: &[BufferRef],
        callback: F,
    ) -> Result<RequestId>
    where
        F: FnOnce(&mut Engine, Completion) + 'static,
    {
        unsafe { self.write_at(file, 0, Whence::Current, bufs, callback) }
    }

    /// Submit a write
    ///
    /// See [`read_at`](Engine::read_at) for buffer and cursor rules.
    ///
    /// # Safety
    ///
    /// The buffer must stay valid until the callback runs.
    pub unsafe fn write_at<F>(
        &mut self,
        file: FileId,
        offset: i64,
        whence: Whence,
        bufs: &[BufferRef],
        callback: F,
    ) -> Result<RequestId>
    where
        F: FnOnce(&mut Engine, Completion) + 'static,
    {
        self.submit(file, Op::Write, offset, whence, bufs, Box::new(callback))
    }

    fn submit(
        &mut self,
        file: FileId,
        op: Op,
        offset: i64,
        whence: Whence,
        bufs: &[BufferRef],
        callback: IoCallback,
    ) -> Result<RequestId> {
        let [buf] = bufs else {
            return Err(Error::Unsupported("exactly one buffer per request"));
        };
        let buf = *buf;
        let generation = self.next_generation();

        let state = lookup(&mut self.files, file)
            .ok_or(Error::InvalidArgument("unknown file handle"))?;
        let fd = state.check_submit(op)?;
        let offset = offset::resolve(offset, whence, state.cursor())?;
        state.advance_cursor(buf.len())?;

        let key = self.requests.insert(Request {
            generation,
            file,
            op,
            buf,
            offset,
            queued_bytes: 0,
            callback: Some(callback),
        });
        let id = RequestId::new(key, generation);

        let submitted = self.backend.submit(Submission {
            token: id.to_token(),
            op,
            fd,
            buf,
            offset,
        });
        let queued = match submitted {
            Ok(Submitted::Completed) => 0,
            Ok(Submitted::Pending) => buf.len(),
            Err(e) => {
                self.requests.remove(key);
                state.rewind_cursor(buf.len());
                log_emit(
                    LogLevel::Warning,
                    &format!("{:?} {:?} at offset {} rejected: {}", file, op, offset, e),
                );
                return Err(Error::Submission(e));
            }
        };
        state.on_submitted(op, queued);
        self.requests[key].queued_bytes = queued;
        self.stats.record_submit(self.requests.len());
        Ok(id)
    }

    // =========================================================================
    // Event Loop
    // =========================================================================

    /// Run one loop iteration
    ///
    /// Evaluates pending endgames, waits up to `timeout` (`None` = until
    /// something completes) for the backend when requests are in flight,
    /// then delivers up to the configured event capacity of completions and
    /// re-evaluates endgames. Completions past the capacity wait for the
    /// next turn.
    ///
    /// Returns the number of completion callbacks delivered.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize> {
        if self.in_callback {
            return Err(Error::InvalidArgument("loop turned from inside a callback"));
        }
        self.process_endgames();
        if self.requests.is_empty() {
            return Ok(0);
        }

        let mut events = std::mem::take(&mut self.events);
        let polled = self.backend.poll(&mut events, self.event_capacity, timeout);
        let mut delivered = 0;
        for event in events.drain(..) {
            if self.process_completion(event) {
                delivered += 1;
            }
        }
        self.events = events;
        polled?;

        self.process_endgames();
        Ok(delivered)
    }

    /// Turn the loop until no request is in flight and no teardown is due
    pub fn run(&mut self) -> Result<()> {
        while !self.requests.is_empty() || !self.endgame.is_empty() {
            self.turn(None)?;
        }
        Ok(())
    }

    /// Whether any handle, request or teardown keeps the loop alive
    pub fn is_alive(&self) -> bool {
        self.refs > 0 || !self.requests.is_empty() || !self.endgame.is_empty()
    }

    /// Whether a user callback is currently running
    pub fn in_callback(&self) -> bool {
        self.in_callback
    }

    fn process_completion(&mut self, event: Event) -> bool {
        let id = RequestId::from_token(event.token);
        let (file, op, queued, callback, completion) = match self.requests.get_mut(id.key()) {
            Some(req) if req.generation == id.generation() => {
                let queued = std::mem::take(&mut req.queued_bytes);
                let callback = req.callback.take();
                let completion = Completion::from_os_result(id, req, event.result);
                (req.file, req.op, queued, callback, completion)
            }
            _ => {
                log_emit(
                    LogLevel::Error,
                    &format!("completion for unknown request token {:#x}", event.token),
                );
                return false;
            }
        };

        lookup(&mut self.files, file)
            .expect("in-flight request outlived its file handle")
            .on_dequeued(op, queued);

        let transferred = completion.transferred;
        if let Some(callback) = callback {
            let scope = CallbackScope::enter(&mut self.in_callback);
            callback(self, completion);
            scope.exit(&mut self.in_callback);
        }

        self.requests.remove(id.key());
        let state =
            lookup(&mut self.files, file).expect("in-flight request outlived its file handle");
        state.on_completed(op);
        if state.wants_endgame() {
            self.endgame.push_back(file);
        }
        self.stats.record_completion(transferred, self.requests.len());
        true
    }

    fn process_endgames(&mut self) {
        while let Some(file) = self.endgame.pop_front() {
            self.shutdown_step(file);
            self.teardown_step(file);
        }
    }

    fn shutdown_step(&mut self, file: FileId) {
        let Some(step) = lookup(&mut self.files, file).and_then(FileState::shutdown_step) else {
            return;
        };
        let status = match step.fd {
            Some(fd) => {
                self.backend.release(fd.as_raw_fd());
                sys::close(fd).map_err(Error::Io)
            }
            None => Ok(()),
        };
        log_emit(LogLevel::Debug, &format!("{:?} shut down: {:?}", file, status));
        if let Some(callback) = step.callback {
            let scope = CallbackScope::enter(&mut self.in_callback);
            callback(self, file, status);
            scope.exit(&mut self.in_callback);
        }
    }

    fn teardown_step(&mut self, file: FileId) {
        let Some(state) = lookup(&mut self.files, file) else {
            return;
        };
        if !state.close_ready() {
            return;
        }
        let (fd, callback) = state.mark_closed();
        if let Some(fd) = fd {
            let raw = fd.as_raw_fd();
            self.backend.release(raw);
            if let Err(e) = sys::close(fd) {
                log_emit(LogLevel::Warning, &format!("closing fd {} failed: {}", raw, e));
            }
        }
        self.files.remove(file.key());
        self.refs -= 1;
        self.stats.open_files = self.refs;
        log_emit(LogLevel::Debug, &format!("{:?} closed", file));

        if let Some(callback) = callback {
            let scope = CallbackScope::enter(&mut self.in_callback);
            callback(self, file);
            scope.exit(&mut self.in_callback);
        }
    }

    // =========================================================================
    // Statistics & Diagnostics
    // =========================================================================

    /// Get an engine statistics snapshot
    pub fn stats(&self) -> Stats {
        self.stats.clone()
    }

    /// Snapshot of one handle, or `None` if the id is stale
    pub fn file_stats(&self, file: FileId) -> Option<FileStats> {
        self.files
            .get(file.key())
            .filter(|state| state.generation == file.generation())
            .map(FileState::snapshot)
    }

    /// Whether `request` is submitted and its callback has not returned
    pub fn is_pending(&self, request: RequestId) -> bool {
        self.requests
            .get(request.key())
            .is_some_and(|req| req.generation == request.generation())
    }

    /// Verify the accounting of every handle against the requests in flight
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        for (key, state) in &self.files {
            let id = FileId::new(key, state.generation);
            state
                .check_invariants()
                .map_err(|msg| format!("{:?}: {}", id, msg))?;

            let (mut reads, mut writes) = (0u64, 0u64);
            for (_, req) in self.requests.iter().filter(|(_, req)| req.file == id) {
                match req.op {
                    Op::Read => reads += req.queued_bytes as u64,
                    Op::Write => writes += req.queued_bytes as u64,
                }
            }
            let snap = state.snapshot();
            if snap.read_queue_bytes != reads || snap.write_queue_bytes != writes {
                return Err(format!("{:?}: queue bytes do not match requests in flight", id));
            }
        }
        if self.refs != self.files.len() {
            return Err(format!(
                "{} keep-alive references for {} handles",
                self.refs,
                self.files.len()
            ));
        }
        Ok(())
    }
}

fn lookup(files: &mut Slab<FileState>, id: FileId) -> Option<&mut FileState> {
    files
        .get_mut(id.key())
        .filter(|state| state.generation == id.generation())
}
