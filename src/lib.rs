//! # Lanewise
//!
//! Elementwise kernels over `f32` and `i32` buffers, executed four ways
//! (scalar indexing, sliced iteration, raw pointers, SIMD lanes) and
//! checked against each other bit for bit.
//!
//! Built around the [trueno](https://crates.io/crates/trueno) backend model,
//! lanewise covers the memory side of vectorization: buffers aligned to a
//! register boundary (or deliberately offset from it), lane partitioning
//! with scalar remainders, and runtime backend dispatch.
//!
//! ## Kernels
//!
//! - **Sum**: `result[i] = left[i] + right[i]`
//! - **Compound**: `result[i] = sqrt((left[i] * right[i] + k) / k)`
//!
//! ## Quick Start
//!
//! ```rust
//! use lanewise::prelude::*;
//!
//! let inputs = KernelInputs::<f32>::fixture(1003);
//! let suite = VerificationSuite::new(Executor::new(), inputs);
//!
//! for report in suite.check_kernel(Kernel::Compound)? {
//!     assert!(report.passed(), "{report}");
//! }
//! # Ok::<(), lanewise::KernelError>(())
//! ```
//!
//! ## Debug Logging
//!
//! Set `LANEWISE_DEBUG=1` (or a level name) and call
//! [`debug::init_from_env`] to get timestamped diagnostics on stderr.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Debug logging with timestamps and levels.
pub mod debug;

/// Error types for kernel, buffer and configuration operations.
pub mod error;

/// Element types the kernels operate on.
pub mod element;

/// SIMD backend detection and lane partitioning.
pub mod lanes;

/// Aligned, optionally offset buffers.
pub mod aligned;

// ============================================================================
// Kernel Modules
// ============================================================================

mod simd;

/// Kernels and access strategies.
pub mod kernel;

/// Exact comparison against the scalar reference.
pub mod verify;

/// Deterministic inputs and buffer construction.
pub mod fixtures;

/// Run configuration.
pub mod config;

pub use aligned::{AlignedBuffer, RegionHandle, ReleaseOutcome};
pub use config::RunConfig;
pub use element::{Element, ElementType};
pub use error::{KernelError, Result};
pub use kernel::{run_kernel, Divisor, Executor, Kernel, Strategy};
pub use lanes::{detected_backend, Partition, SimdBackend};
pub use verify::{verify, MatchResult, Mismatch, VerificationSuite};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use lanewise::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aligned::{AlignedBuffer, RegionHandle, ReleaseOutcome};
    pub use crate::config::RunConfig;
    pub use crate::element::{Element, ElementType};
    pub use crate::error::{KernelError, Result};
    pub use crate::fixtures::{AlignedInputs, KernelInputs};
    pub use crate::kernel::{Divisor, Executor, Kernel, Strategy};
    pub use crate::lanes::{detected_backend, Partition, SimdBackend};
    pub use crate::verify::{verify, StrategyReport, VerificationSuite};
}

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export trueno for direct access to its vector operations.
pub use trueno;

// ============================================================================
// Tests
// ============================================================================
