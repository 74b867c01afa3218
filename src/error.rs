//! Error types for lanewise operations.

use std::io;
use thiserror::Error;

/// Result type alias using [`KernelError`].
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors that can occur while allocating buffers, running kernels or
/// loading configuration.
///
/// Every variant is a pre-flight check: kernels are pure, so a failure
/// repeats identically on retry.
#[derive(Error, Debug)]
pub enum KernelError {
    /// Inputs and output of a kernel invocation differ in length.
    #[error("length mismatch: left has {left} elements, right has {right}, result has {result}")]
    LengthMismatch {
        /// Length of the left input.
        left: usize,
        /// Length of the right input.
        right: usize,
        /// Length of the output.
        result: usize,
    },

    /// A candidate output and its reference differ in length.
    #[error("cannot compare {candidate} elements against a reference of {reference}")]
    CompareLengthMismatch {
        /// Length of the buffer under test.
        candidate: usize,
        /// Length of the reference buffer.
        reference: usize,
    },

    /// An aligned region was accessed after it was released.
    #[error("aligned region used after release")]
    UseAfterRelease,

    /// The compound kernel divisor is zero.
    #[error("compound kernel divisor must be non-zero")]
    ZeroDivisor,

    /// Requested byte alignment is not a power of two or is smaller than the
    /// element's natural alignment.
    #[error("invalid byte alignment {alignment} (must be a power of two >= {min})")]
    InvalidAlignment {
        /// Requested alignment in bytes.
        alignment: usize,
        /// Minimum alignment for the element type.
        min: usize,
    },

    /// Requested byte offset would leave elements misaligned for their type.
    #[error("invalid byte offset {offset} (must be a multiple of {element_align})")]
    InvalidOffset {
        /// Requested offset in bytes.
        offset: usize,
        /// Natural alignment of the element type.
        element_align: usize,
    },

    /// The global allocator could not satisfy the request.
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailed {
        /// Number of bytes requested.
        bytes: usize,
    },

    /// Indexed access outside the buffer.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Buffer length.
        len: usize,
    },

    /// Kernel name did not parse.
    #[error("unknown kernel '{0}' (expected sum or compound)")]
    UnknownKernel(String),

    /// Strategy name did not parse.
    #[error("unknown strategy '{0}' (expected scalar, sliced, raw-pointer or vectorized)")]
    UnknownStrategy(String),

    /// Backend name did not parse.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// The requested SIMD backend is not supported by this CPU.
    #[error("SIMD backend {0} is not available on this CPU")]
    BackendUnavailable(&'static str),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
