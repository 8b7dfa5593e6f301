// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Completion-based file I/O for a single-threaded event loop
//!
//! aura-file binds open file descriptors to an [`Engine`] and submits
//! positional reads and writes that finish asynchronously. Each handle keeps
//! a logical cursor: requests addressed relative to it reserve their byte
//! range at submission, so back-to-back sequential requests never overlap
//! even when the OS completes them out of order.
//!
//! # Quick Start
//!
//! ```no_run
//! use aura_file::{Buffer, Engine};
//! use std::cell::Cell;
//! use std::fs::File;
//! use std::rc::Rc;
//!
//! fn main() -> aura_file::Result<()> {
//!     let mut engine = Engine::new()?;
//!     let file = engine.init_file(File::open("/etc/hostname")?)?;
//!     let buf = Buffer::new(4096)?;
//!
//!     let done = Rc::new(Cell::new(false));
//!     let done_clone = done.clone();
//!
//!     unsafe {
//!         engine.read(file, &[buf.to_ref()], move |engine, completion| {
//!             let file = completion.file;
//!             match completion.result() {
//!                 Ok(n) => println!("Read {} bytes", n),
//!                 Err(e) => eprintln!("Error: {}", e),
//!             }
//!             engine.close(file, move |_, _| done_clone.set(true)).ok();
//!         })
//!     }?;
//!
//!     engine.run()?;
//!     assert!(done.get());
//!     Ok(())
//! }
//! ```
//!
//! # API Overview
//!
//! - [`Engine`] - Owns handles and requests, runs the completion loop
//! - [`FileId`] / [`RequestId`] - Generation-checked handle and request ids
//! - [`Whence`] - How a request's offset is interpreted
//! - [`Completion`] - Outcome handed to each read/write callback
//! - [`Buffer`] / [`BufferRef`] - Aligned I/O memory and raw references to it
//! - [`Options`] - Engine configuration
//! - [`Stats`] / [`FileStats`] - Runtime statistics
//! - [`backend`] - The completion backend trait and its implementations
//!
//! # Soundness Limitations
//!
//! - **BufferRef lifetime**: [`BufferRef`] is `Copy` and carries no lifetime
//!   parameter. The compiler cannot enforce that the memory outlives the
//!   request, which is why the submission methods are `unsafe`. Keep
//!   buffers alive until the completion callback fires.
//!
//! - **Engine drop**: dropping an engine with requests in flight closes
//!   their descriptors while the OS may still touch the buffers. Run the
//!   loop until [`Engine::is_alive`] turns false first.

pub mod backend;
mod buffer;
mod callback;
mod engine;
mod error;
mod file;
mod log;
pub mod offset;
mod options;
mod request;
mod stats;
mod sys;

#[cfg(feature = "async")]
pub mod async_io;

pub use buffer::{Buffer, BufferRef, DEFAULT_ALIGNMENT};
pub use engine::Engine;
pub use error::{Error, Result};
pub use file::{CloseState, FileId, ShutdownState};
pub use log::{clear_log_handler, log_emit, set_log_handler, LogLevel};
pub use offset::Whence;
pub use options::{BackendKind, Options};
pub use request::{Completion, Op, RequestId, TRANSFER_FAILED};
pub use stats::{FileStats, Stats};

#[cfg(feature = "async")]
pub use async_io::{AsyncEngine, IoFuture};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::fs::OpenOptions;
    use std::io::{Read as _, Seek as _, SeekFrom};
    use std::rc::Rc;

    const MIB: i64 = 1 << 20;

    // =========================================================================
    // End-to-End
    // =========================================================================

    /// Three reads and two writes spread over a sparse 1 GiB file, with the
    /// handle closed from inside whichever callback runs last.
    fn sparse_file_scenario(options: &Options) {
        let tmpfile = tempfile::NamedTempFile::new().unwrap();
        tmpfile.as_file().set_len(1 << 30).unwrap();
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .open(tmpfile.path())
            .unwrap();

        let mut engine = Engine::with_options(options).unwrap();
        let file = engine.init_file(f).unwrap();

        let reads: Vec<Buffer> = (0..3).map(|_| Buffer::new(MIB as usize).unwrap()).collect();
        let mut writes: Vec<Buffer> = (0..2).map(|_| Buffer::new(MIB as usize).unwrap()).collect();
        writes[0].as_mut_slice().fill(0xA5);
        writes[1].as_mut_slice().fill(0x5A);

        let remaining = Rc::new(Cell::new(5usize));
        let results = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(Cell::new(false));

        let on_done = |remaining: Rc<Cell<usize>>,
                       results: Rc<RefCell<Vec<(Op, i64, isize)>>>,
                       closed: Rc<Cell<bool>>| {
            move |engine: &mut Engine, done: Completion| {
                assert!(done.is_ok(), "{:?}", done.status);
                results
                    .borrow_mut()
                    .push((done.op, done.offset, done.transferred));
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    engine
                        .close(done.file, move |_, _| closed.set(true))
                        .unwrap();
                }
            }
        };

        for (buf, offset) in reads.iter().zip([0, 512 * MIB, 1023 * MIB]) {
            let cb = on_done(remaining.clone(), results.clone(), closed.clone());
            unsafe { engine.read_at(file, offset, Whence::Start, &[buf.to_ref()], cb) }.unwrap();
        }
        for (buf, offset) in writes.iter().zip([256 * MIB, 768 * MIB]) {
            let cb = on_done(remaining.clone(), results.clone(), closed.clone());
            unsafe { engine.write_at(file, offset, Whence::Start, &[buf.to_ref()], cb) }.unwrap();
        }
        engine.check_invariants().unwrap();

        engine.run().unwrap();

        assert!(closed.get());
        assert!(!engine.is_alive());
        let mut results = results.borrow().clone();
        results.sort_by_key(|(_, offset, _)| *offset);
        let expected: Vec<(Op, i64, isize)> = vec![
            (Op::Read, 0, MIB as isize),
            (Op::Write, 256 * MIB, MIB as isize),
            (Op::Read, 512 * MIB, MIB as isize),
            (Op::Write, 768 * MIB, MIB as isize),
            (Op::Read, 1023 * MIB, MIB as isize),
        ];
        assert_eq!(results, expected);
        for buf in &reads {
            assert!(buf.as_slice().iter().all(|&b| b == 0));
        }

        let stats = engine.stats();
        assert_eq!(stats.ops_submitted(), 5);
        assert_eq!(stats.ops_completed(), 5);
        assert_eq!(stats.bytes_transferred(), 5 * MIB as u64);
        assert_eq!(stats.open_files(), 0);

        let mut check = std::fs::File::open(tmpfile.path()).unwrap();
        let mut chunk = vec![0u8; 4096];
        check.seek(SeekFrom::Start(768 * MIB as u64)).unwrap();
        check.read_exact(&mut chunk).unwrap();
        assert!(chunk.iter().all(|&b| b == 0x5A));
        assert_eq!(check.metadata().unwrap().len(), 1 << 30);
    }

    #[test]
    fn test_sparse_file_inline_backend() {
        sparse_file_scenario(&Options::new().backend(BackendKind::Inline));
    }

    #[test]
    fn test_sparse_file_default_backend() {
        sparse_file_scenario(&Options::new());
    }

    #[test]
    fn test_sequential_write_then_read_round_trip() {
        let tmpfile = tempfile::NamedTempFile::new().unwrap();
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .open(tmpfile.path())
            .unwrap();
        let mut engine = Engine::new().unwrap();
        let file = engine.init_file(f).unwrap();

        let mut chunks: Vec<Buffer> = (0..4).map(|_| Buffer::new(4096).unwrap()).collect();
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.as_mut_slice().fill(b'a' + i as u8);
        }
        for chunk in &chunks {
            unsafe { engine.write(file, &[chunk.to_ref()], |_, done| assert!(done.is_ok())) }
                .unwrap();
        }
        assert_eq!(engine.file_stats(file).unwrap().cursor, 4 * 4096);
        engine.run().unwrap();

        let back = Buffer::new(4 * 4096).unwrap();
        let seen = Rc::new(Cell::new(0isize));
        let seen_clone = seen.clone();
        unsafe {
            engine.read_at(file, 0, Whence::Start, &[back.to_ref()], move |_, done| {
                seen_clone.set(done.transferred)
            })
        }
        .unwrap();
        engine.run().unwrap();

        assert_eq!(seen.get(), 4 * 4096);
        for (i, block) in back.as_slice().chunks(4096).enumerate() {
            assert!(block.iter().all(|&b| b == b'a' + i as u8));
        }

        engine.close(file, |_, _| {}).unwrap();
        engine.run().unwrap();
        assert!(!engine.is_alive());
    }

    #[test]
    fn test_absolute_write_read_back_at_same_offset() {
        const K: i64 = 12345;
        const N: usize = 3000;
        let tmpfile = tempfile::NamedTempFile::new().unwrap();
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .open(tmpfile.path())
            .unwrap();
        let mut engine = Engine::new().unwrap();
        let file = engine.init_file(f).unwrap();

        let mut out = Buffer::new(N).unwrap();
        for (i, b) in out.as_mut_slice().iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        unsafe {
            engine.write_at(file, K, Whence::Start, &[out.to_ref()], |_, done| {
                assert_eq!(done.offset, K);
                assert_eq!(done.result().unwrap(), N);
            })
        }
        .unwrap();
        assert_eq!(engine.file_stats(file).unwrap().cursor, N as i64);
        engine.run().unwrap();

        let back = Buffer::new(N).unwrap();
        let seen = Rc::new(Cell::new(0isize));
        let seen_clone = seen.clone();
        unsafe {
            engine.read_at(file, K, Whence::Start, &[back.to_ref()], move |_, done| {
                seen_clone.set(done.transferred)
            })
        }
        .unwrap();
        engine.run().unwrap();

        assert_eq!(seen.get(), N as isize);
        assert_eq!(back.as_slice(), out.as_slice());
        assert_eq!(
            std::fs::metadata(tmpfile.path()).unwrap().len(),
            (K as u64) + N as u64
        );

        engine.close(file, |_, _| {}).unwrap();
        engine.run().unwrap();
        assert!(!engine.is_alive());
    }

    // =========================================================================
    // Engine Tests
    // =========================================================================

    #[test]
    fn test_engine_create_default() {
        let engine = Engine::new();
        assert!(engine.is_ok(), "Engine::new() should succeed");
    }

    #[test]
    fn test_engine_with_inline_options() {
        let opts = Options::new().backend(BackendKind::Inline).queue_depth(16);
        let engine = Engine::with_options(&opts).unwrap();
        assert_eq!(engine.backend_name(), "inline");
        assert!(!engine.is_alive());
    }

    #[test]
    fn test_engine_drop_with_open_handle() {
        let tmpfile = tempfile::NamedTempFile::new().unwrap();
        let f = tmpfile.reopen().unwrap();
        let mut engine = Engine::new().unwrap();
        engine.init_file(f).unwrap();
        assert!(engine.is_alive());
        drop(engine);
    }

    // =========================================================================
    // Trait Tests
    // =========================================================================

    #[test]
    fn test_public_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
        assert_send_sync::<Stats>();
        assert_send_sync::<FileStats>();
        assert_send_sync::<FileId>();
        assert_send_sync::<RequestId>();
        assert_send_sync::<Options>();
    }

    #[test]
    fn test_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Buffer>();
    }
}
