// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Engine configuration options

/// Completion backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// io_uring when the kernel supports it, otherwise inline (default)
    #[default]
    Auto,
    /// io_uring only; engine creation fails without it
    Uring,
    /// Synchronous `pread`/`pwrite` at submission time
    Inline,
}

/// Engine configuration options
///
/// Use the builder pattern to customize engine behavior:
///
/// ```
/// use aura_file::{BackendKind, Options};
///
/// let opts = Options::new()
///     .backend(BackendKind::Inline)
///     .queue_depth(64)
///     .event_capacity(16);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    pub(crate) backend: BackendKind,
    pub(crate) queue_depth: u32,
    pub(crate) event_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    /// Create new options with default values
    pub fn new() -> Self {
        Self {
            backend: BackendKind::Auto,
            queue_depth: 256,
            event_capacity: 64,
        }
    }

    /// Select the completion backend (default: Auto)
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.backend = kind;
        self
    }

    /// Set the io_uring submission queue depth (default: 256)
    ///
    /// Clamped to at least 1.
    pub fn queue_depth(mut self, depth: u32) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Set the most completions one loop turn delivers (default: 64)
    ///
    /// Clamped to at least 1. Completions past the limit stay with the
    /// backend until the next turn.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
