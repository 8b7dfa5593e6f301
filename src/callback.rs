// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Callback type erasure for completions and handle teardown

use crate::engine::Engine;
use crate::error::Result;
use crate::file::FileId;
use crate::request::Completion;

/// Completion callback of a read or write request
///
/// Receives the engine so it can submit follow-up requests, shut down or
/// close handles (including the one the request belongs to).
pub(crate) type IoCallback = Box<dyn FnOnce(&mut Engine, Completion) + 'static>;

/// Invoked once when a handle reaches the closed state
pub(crate) type CloseCallback = Box<dyn FnOnce(&mut Engine, FileId) + 'static>;

/// Invoked once when the shutdown step releases a handle's descriptor
pub(crate) type ShutdownCallback = Box<dyn FnOnce(&mut Engine, FileId, Result<()>) + 'static>;

/// Marks the engine as running a user callback until `exit`
///
/// `exit` restores the previous value, so nested dispatch (a callback that
/// closes a handle whose teardown fires another callback) keeps the flag set.
pub(crate) struct CallbackScope {
    prev: bool,
}

impl CallbackScope {
    pub(crate) fn enter(flag: &mut bool) -> Self {
        let prev = *flag;
        *flag = true;
        Self { prev }
    }

    pub(crate) fn exit(self, flag: &mut bool) {
        *flag = self.prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_sets_and_restores() {
        let mut flag = false;
        let outer = CallbackScope::enter(&mut flag);
        assert!(flag);
        let inner = CallbackScope::enter(&mut flag);
        assert!(flag);
        inner.exit(&mut flag);
        assert!(flag, "inner exit keeps the outer scope active");
        outer.exit(&mut flag);
        assert!(!flag);
    }
}
