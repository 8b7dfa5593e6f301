// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Async/await support for aura-file
//!
//! Future-based wrappers around [`Engine::read_at`] and [`Engine::write_at`].
//! The engine is single-threaded, so the futures are driven by whoever
//! turns the loop: poll the future, and while it is pending call
//! [`Engine::turn`].
//!
//! # Example
//!
//! ```ignore
//! use aura_file::{async_io::AsyncEngine, Buffer, Engine, Whence};
//!
//! let buf = Buffer::new(4096)?;
//! let future = unsafe { engine.async_read_at(file, 0, Whence::Start, &buf) }?;
//! // ... poll `future`, calling engine.turn(None) while it is pending
//! ```

use crate::buffer::BufferRef;
use crate::error::Result;
use crate::file::FileId;
use crate::offset::Whence;
use crate::request::Completion;
use crate::Engine;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Shared state between the callback and the future
struct IoState {
    /// The result from the I/O operation (set by callback)
    result: Option<Result<usize>>,
    /// The waker to notify when complete (set by future poll)
    waker: Option<Waker>,
}

/// A Future that completes when a read or write finishes.
///
/// Created by [`AsyncEngine::async_read_at`] and
/// [`AsyncEngine::async_write_at`].
///
/// # Cancellation
///
/// There is none. Dropping the future leaves the request in flight; its
/// result is discarded when the engine delivers it. The buffer must stay
/// valid until then.
pub struct IoFuture {
    state: Rc<RefCell<IoState>>,
}

impl Future for IoFuture {
    type Output = Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        if let Some(result) = state.result.take() {
            return Poll::Ready(result);
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

fn create_io_callback() -> (impl FnOnce(&mut Engine, Completion) + 'static, Rc<RefCell<IoState>>) {
    let state = Rc::new(RefCell::new(IoState {
        result: None,
        waker: None,
    }));

    let callback_state = state.clone();
    let callback = move |_: &mut Engine, done: Completion| {
        let waker = {
            let mut state = callback_state.borrow_mut();
            state.result = Some(done.result());
            state.waker.take()
        };
        // Wake outside the borrow; the executor may poll synchronously
        if let Some(waker) = waker {
            waker.wake();
        }
    };

    (callback, state)
}

/// Extension trait providing async I/O methods on [`Engine`].
///
/// Implemented for `Engine` when the `async` feature is enabled.
pub trait AsyncEngine {
    /// Submit a read and return a Future for the bytes read.
    ///
    /// Offset and cursor handling match [`Engine::read_at`].
    ///
    /// # Safety
    ///
    /// The buffer must remain valid and exclusively borrowed until the
    /// engine delivers the completion, even if the Future is dropped.
    unsafe fn async_read_at(
        &mut self,
        file: FileId,
        offset: i64,
        whence: Whence,
        buf: impl Into<BufferRef>,
    ) -> Result<IoFuture>;

    /// Submit a write and return a Future for the bytes written.
    ///
    /// # Safety
    ///
    /// The buffer must remain valid until the engine delivers the
    /// completion, even if the Future is dropped.
    unsafe fn async_write_at(
        &mut self,
        file: FileId,
        offset: i64,
        whence: Whence,
        buf: impl Into<BufferRef>,
    ) -> Result<IoFuture>;
}

impl AsyncEngine for Engine {
    unsafe fn async_read_at(
        &mut self,
        file: FileId,
        offset: i64,
        whence: Whence,
        buf: impl Into<BufferRef>,
    ) -> Result<IoFuture> {
        let (callback, state) = create_io_callback();
        unsafe { self.read_at(file, offset, whence, &[buf.into()], callback) }?;
        Ok(IoFuture { state })
    }

    unsafe fn async_write_at(
        &mut self,
        file: FileId,
        offset: i64,
        whence: Whence,
        buf: impl Into<BufferRef>,
    ) -> Result<IoFuture> {
        let (callback, state) = create_io_callback();
        unsafe { self.write_at(file, offset, whence, &[buf.into()], callback) }?;
        Ok(IoFuture { state })
    }
}
