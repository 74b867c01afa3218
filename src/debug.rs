//! Structured debug logging for lanewise.
//!
//! Output goes to stderr as `[+0000ms] [LEVEL] [component] message`.
//! Enabled via `LANEWISE_DEBUG` (see [`init_from_env`]) or the verifier's
//! `--debug` flag. Logging is off by default so kernels stay silent in
//! benchmarks.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Environment variable read by [`init_from_env`].
pub const ENV_VAR: &str = "LANEWISE_DEBUG";

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Lowest level that is still written (as `Level as u8`).
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Trace as u8);

/// Process start reference for the elapsed column.
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Debug log levels, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Tracing entry/exit of operations
    Trace = 0,
    /// Debug information
    Debug = 1,
    /// Informational messages
    Info = 2,
    /// Warnings (verifier mismatches)
    Warn = 3,
    /// Errors
    Error = 4,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn color_code(self) -> &'static str {
        match self {
            Level::Trace => "\x1b[90m", // Gray
            Level::Debug => "\x1b[36m", // Cyan
            Level::Info => "\x1b[32m",  // Green
            Level::Warn => "\x1b[33m",  // Yellow
            Level::Error => "\x1b[31m", // Red
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            _ => Level::Error,
        }
    }

    /// Parses an environment value: a level name, or `1`/`true` for `Debug`.
    /// Returns `None` for values that mean "off".
    pub fn parse_env(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "off" => None,
            "trace" => Some(Level::Trace),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => Some(Level::Debug),
        }
    }
}

/// Enables debug output at `Trace` and above.
pub fn enable() {
    enable_at(Level::Trace);
}

/// Enables debug output for messages at `min` and above.
pub fn enable_at(min: Level) {
    EPOCH.get_or_init(Instant::now);
    MIN_LEVEL.store(min as u8, Ordering::SeqCst);
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disables debug output.
pub fn disable() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

/// Enables logging if `LANEWISE_DEBUG` is set to a truthy value or a level
/// name. Returns the level that was enabled.
pub fn init_from_env() -> Option<Level> {
    let level = std::env::var(ENV_VAR).ok().as_deref().and_then(Level::parse_env)?;
    enable_at(level);
    Some(level)
}

/// Returns true if debug output is enabled.
#[inline]
pub fn is_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Returns true if a message at `level` would be written.
#[inline]
pub fn is_enabled_for(level: Level) -> bool {
    is_enabled() && level >= Level::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

fn elapsed_ms() -> u128 {
    EPOCH.get().map_or(0, |start| start.elapsed().as_millis())
}

/// Writes one log line if `level` is enabled.
pub fn log(level: Level, component: &str, message: &str) {
    if !is_enabled_for(level) {
        return;
    }

    let reset = "\x1b[0m";
    let _ = writeln!(
        io::stderr(),
        "[+{:04}ms] {}[{:5}]{} [{}] {}",
        elapsed_ms(),
        level.color_code(),
        level.as_str(),
        reset,
        component,
        message
    );
}

/// Logs with format arguments.
#[macro_export]
macro_rules! debug_log {
    ($level:expr, $component:expr, $($arg:tt)*) => {
        if $crate::debug::is_enabled_for($level) {
            $crate::debug::log($level, $component, &format!($($arg)*));
        }
    };
}

/// Convenience macro for trace level.
#[macro_export]
macro_rules! trace {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Trace, $component, $($arg)*)
    };
}

/// Convenience macro for debug level.
#[macro_export]
macro_rules! debug {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Debug, $component, $($arg)*)
    };
}

/// Convenience macro for info level.
#[macro_export]
macro_rules! info {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Info, $component, $($arg)*)
    };
}

/// Convenience macro for warn level.
#[macro_export]
macro_rules! warn {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Warn, $component, $($arg)*)
    };
}

/// Convenience macro for error level.
#[macro_export]
macro_rules! error {
    ($component:expr, $($arg:tt)*) => {
        $crate::debug_log!($crate::debug::Level::Error, $component, $($arg)*)
    };
}

/// RAII guard that traces entry and exit (with duration) of a scope.
pub struct TimingGuard {
    component: &'static str,
    operation: String,
    start: Instant,
}

impl TimingGuard {
    /// Creates a new timing guard.
    pub fn new(component: &'static str, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        if is_enabled_for(Level::Trace) {
            log(Level::Trace, component, &format!("-> {operation}"));
        }
        Self { component, operation, start: Instant::now() }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if is_enabled_for(Level::Trace) {
            let elapsed = self.start.elapsed();
            log(
                Level::Trace,
                self.component,
                &format!("<- {} ({:.2}ms)", self.operation, elapsed.as_secs_f64() * 1000.0),
            );
        }
    }
}

/// Creates a timing guard for the rest of the enclosing scope.
#[macro_export]
macro_rules! time_scope {
    ($component:expr, $operation:expr) => {
        let _guard = $crate::debug::TimingGuard::new($component, $operation);
    };
}
