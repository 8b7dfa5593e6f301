// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Logging interface for aura-file
//!
//! The engine reports handle lifecycle events and failures through a
//! process-wide log handler. Without a handler installed, messages go to
//! [`tracing`] under the `aura_file` target, so a subscriber picks them up
//! with no extra wiring.
//!
//! # Example
//!
//! ```
//! use aura_file::{LogLevel, set_log_handler, clear_log_handler, log_emit};
//!
//! set_log_handler(|level, msg| {
//!     eprintln!("[{:?}] {}", level, msg);
//! });
//!
//! log_emit(LogLevel::Info, "engine started");
//!
//! clear_log_handler();
//! ```

use std::sync::Mutex;

/// Log severity levels (match syslog priorities 1:1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Error condition (syslog LOG_ERR = 3)
    Error = 3,
    /// Warning condition (syslog LOG_WARNING = 4)
    Warning = 4,
    /// Normal but significant (syslog LOG_NOTICE = 5)
    Notice = 5,
    /// Informational (syslog LOG_INFO = 6)
    Info = 6,
    /// Debug-level (syslog LOG_DEBUG = 7)
    Debug = 7,
}

impl LogLevel {
    /// Syslog priority value
    pub fn priority(self) -> i32 {
        self as i32
    }

    /// Short name for the log level ("ERR", "WARN", etc.)
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Error => "ERR",
            LogLevel::Warning => "WARN",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

type Handler = Box<dyn Fn(LogLevel, &str) + Send + 'static>;

/// Process-wide handler storage
static LOG_HANDLER: Mutex<Option<Handler>> = Mutex::new(None);

/// Install a process-wide log handler.
///
/// Replaces any previously installed handler and suppresses the `tracing`
/// fallback. The handler runs on whichever thread emits the message.
pub fn set_log_handler<F>(handler: F)
where
    F: Fn(LogLevel, &str) + Send + 'static,
{
    let mut guard = LOG_HANDLER.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(Box::new(handler));
}

/// Remove the current log handler, restoring the `tracing` fallback.
pub fn clear_log_handler() {
    let mut guard = LOG_HANDLER.lock().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

/// Emit a log message through the registered handler, or `tracing`.
pub fn log_emit(level: LogLevel, msg: &str) {
    let guard = LOG_HANDLER.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(handler) = guard.as_ref() {
        handler(level, msg);
        return;
    }
    drop(guard);

    match level {
        LogLevel::Error => tracing::error!(target: "aura_file", "{}", msg),
        LogLevel::Warning => tracing::warn!(target: "aura_file", "{}", msg),
        LogLevel::Notice | LogLevel::Info => tracing::info!(target: "aura_file", "{}", msg),
        LogLevel::Debug => tracing::debug!(target: "aura_file", "{}", msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serializes tests that mutate the process-wide log handler.
    /// Rust runs tests in parallel by default; without this guard,
    /// concurrent set/clear calls corrupt each other's handler state.
    static LOG_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Notice);
        assert!(LogLevel::Notice < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    fn test_log_level_name() {
        assert_eq!(LogLevel::Error.name(), "ERR");
        assert_eq!(LogLevel::Warning.name(), "WARN");
        assert_eq!(LogLevel::Notice.name(), "NOTICE");
        assert_eq!(LogLevel::Info.name(), "INFO");
        assert_eq!(LogLevel::Debug.name(), "DEBUG");
        assert_eq!(format!("{}", LogLevel::Warning), "WARN");
    }

    #[test]
    fn test_log_level_priority() {
        assert_eq!(LogLevel::Error.priority(), 3);
        assert_eq!(LogLevel::Debug.priority(), 7);
    }

    #[test]
    fn test_log_emit_no_handler() {
        let _lock = LOG_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        // Falls through to tracing; no subscriber is installed
        clear_log_handler();
        log_emit(LogLevel::Info, "test message");
    }

    #[test]
    fn test_set_and_clear_handler() {
        let _lock = LOG_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        // Engine tests log concurrently; only count our own messages
        set_log_handler(move |_level, msg| {
            if msg == "hello" {
                called_clone.store(true, Ordering::SeqCst);
            }
        });

        log_emit(LogLevel::Info, "hello");
        assert!(called.load(Ordering::SeqCst));

        clear_log_handler();
        called.store(false, Ordering::SeqCst);
        log_emit(LogLevel::Info, "hello");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_handler_receives_level_and_message() {
        let _lock = LOG_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let received_level = Arc::new(AtomicI32::new(-1));
        let received_msg = Arc::new(Mutex::new(String::new()));
        let level_clone = received_level.clone();
        let msg_clone = received_msg.clone();

        set_log_handler(move |level, msg| {
            if msg == "test warning" {
                level_clone.store(level.priority(), Ordering::SeqCst);
                *msg_clone.lock().unwrap() = msg.to_string();
            }
        });

        log_emit(LogLevel::Warning, "test warning");

        assert_eq!(received_level.load(Ordering::SeqCst), 4);
        assert_eq!(*received_msg.lock().unwrap(), "test warning");

        clear_log_handler();
    }

    #[test]
    fn test_replace_handler() {
        let _lock = LOG_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let first_count = Arc::new(AtomicUsize::new(0));
        let second_count = Arc::new(AtomicUsize::new(0));

        let first_clone = first_count.clone();
        set_log_handler(move |_level, msg| {
            if msg == "first" || msg == "second" {
                first_clone.fetch_add(1, Ordering::SeqCst);
            }
        });
        log_emit(LogLevel::Info, "first");

        let second_clone = second_count.clone();
        set_log_handler(move |_level, msg| {
            if msg == "first" || msg == "second" {
                second_clone.fetch_add(1, Ordering::SeqCst);
            }
        });
        log_emit(LogLevel::Info, "second");

        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        clear_log_handler();
    }
}
