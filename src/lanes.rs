//! SIMD backend detection, lane widths and chunk/remainder partitioning.
//!
//! The backend is detected once per process and never changes afterwards;
//! lane widths derive from it. [`Partition`] is the single rule every
//! vectorized kernel uses to split a buffer into full lanes and a scalar
//! remainder.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::element::{Element, ElementType};
use crate::error::KernelError;

/// Backend selection for SIMD operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdBackend {
    /// Scalar fallback (no SIMD); lane width 1.
    Scalar,
    /// SSE2 (128-bit, x86_64 baseline).
    Sse2,
    /// AVX2 (256-bit, Haswell 2013+).
    Avx2,
    /// AVX-512F (512-bit, Skylake-X 2017+).
    Avx512,
    /// ARM NEON (128-bit).
    Neon,
}

impl SimdBackend {
    /// All backends, widest x86 first.
    pub const ALL: [Self; 5] = [Self::Avx512, Self::Avx2, Self::Sse2, Self::Neon, Self::Scalar];

    /// Detects the best available SIMD backend for the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self::ALL
            .into_iter()
            .find(|backend| backend.is_available())
            .unwrap_or(Self::Scalar)
    }

    /// Returns true if this CPU can execute the backend's instructions.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::Scalar => true,
            #[cfg(target_arch = "x86_64")]
            Self::Sse2 => is_x86_feature_detected!("sse2"),
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => is_x86_feature_detected!("avx2"),
            #[cfg(target_arch = "x86_64")]
            Self::Avx512 => is_x86_feature_detected!("avx512f"),
            // NEON is mandatory on AArch64
            #[cfg(target_arch = "aarch64")]
            Self::Neon => true,
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    /// Returns the register width in bits (element width for `Scalar`).
    #[must_use]
    pub const fn register_width_bits(self) -> usize {
        match self {
            Self::Scalar => 32,
            Self::Sse2 | Self::Neon => 128,
            Self::Avx2 => 256,
            Self::Avx512 => 512,
        }
    }

    /// Returns the register width in bytes; the natural buffer alignment.
    #[must_use]
    pub const fn register_width_bytes(self) -> usize {
        self.register_width_bits() / 8
    }

    /// Number of elements of `ty` processed per vector instruction.
    #[must_use]
    pub const fn lanes_for(self, ty: ElementType) -> usize {
        match self {
            Self::Scalar => 1,
            _ => self.register_width_bits() / ty.bits(),
        }
    }

    /// Returns the name used in configuration and CLI flags.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Sse2 => "sse2",
            Self::Avx2 => "avx2",
            Self::Avx512 => "avx512",
            Self::Neon => "neon",
        }
    }
}

impl fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimdBackend {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|backend| backend.name() == wanted)
            .ok_or_else(|| KernelError::UnknownBackend(s.to_string()))
    }
}

static DETECTED: OnceLock<SimdBackend> = OnceLock::new();

/// Returns the process-wide backend, detecting it on first use.
pub fn detected_backend() -> SimdBackend {
    *DETECTED.get_or_init(|| {
        let backend = SimdBackend::detect();
        crate::debug!(
            "lanes",
            "backend {} (f32 lanes {}, i32 lanes {}); trueno selects {:?}",
            backend,
            backend.lanes_for(ElementType::F32),
            backend.lanes_for(ElementType::I32),
            trueno::Backend::select_best()
        );
        backend
    })
}

/// Process-wide lane width for `T`.
#[inline]
pub fn lane_width<T: Element>() -> usize {
    detected_backend().lanes_for(T::TYPE)
}

/// Split of a buffer into full lanes plus a scalar remainder.
///
/// Derived on demand from `(len, lane_width)`; never stored alongside a
/// buffer that could later change length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    len: usize,
    lane_width: usize,
    full_lanes: usize,
    remainder_start: usize,
}

impl Partition {
    /// Partitions `len` elements into lanes of `lane_width`.
    ///
    /// A zero width is treated as 1 (scalar).
    #[must_use]
    pub const fn new(len: usize, lane_width: usize) -> Self {
        let lane_width = if lane_width == 0 { 1 } else { lane_width };
        let full_lanes = len / lane_width;
        Self { len, lane_width, full_lanes, remainder_start: full_lanes * lane_width }
    }

    /// Number of lanes fully covered by buffer elements.
    #[must_use]
    pub const fn full_lanes(&self) -> usize {
        self.full_lanes
    }

    /// Index of the first element handled by the scalar remainder path.
    #[must_use]
    pub const fn remainder_start(&self) -> usize {
        self.remainder_start
    }

    /// Number of trailing elements handled one at a time.
    #[must_use]
    pub const fn remainder_len(&self) -> usize {
        self.len - self.remainder_start
    }

    /// Lane width used for this partition.
    #[must_use]
    pub const fn lane_width(&self) -> usize {
        self.lane_width
    }

    /// Total element count.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when there are no elements at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element range covered by all full lanes together.
    #[must_use]
    pub const fn lanes_range(&self) -> Range<usize> {
        0..self.remainder_start
    }

    /// Element range of full lane `lane`, or `None` past the last full lane.
    #[must_use]
    pub fn lane_range(&self, lane: usize) -> Option<Range<usize>> {
        (lane < self.full_lanes).then(|| {
            let start = lane * self.lane_width;
            start..start + self.lane_width
        })
    }

    /// Element range handled by the scalar remainder path.
    #[must_use]
    pub const fn remainder_range(&self) -> Range<usize> {
        self.remainder_start..self.len
    }
}

/// `(full_lanes, remainder_start)` for `len` elements at `lane_width`.
#[must_use]
pub const fn partition(len: usize, lane_width: usize) -> (usize, usize) {
    let p = Partition::new(len, lane_width);
    (p.full_lanes, p.remainder_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_detection() {
        let backend = SimdBackend::detect();
        assert!(backend.is_available());
        assert!(backend.lanes_for(ElementType::F32) >= 1);
        assert_eq!(detected_backend(), detected_backend());
    }

    #[test]
    fn test_scalar_always_available_with_single_lane() {
        assert!(SimdBackend::Scalar.is_available());
        assert_eq!(SimdBackend::Scalar.lanes_for(ElementType::F32), 1);
        assert_eq!(SimdBackend::Scalar.lanes_for(ElementType::I32), 1);
    }

    #[test]
    fn test_lane_counts() {
        assert_eq!(SimdBackend::Sse2.lanes_for(ElementType::F32), 4);
        assert_eq!(SimdBackend::Neon.lanes_for(ElementType::I32), 4);
        assert_eq!(SimdBackend::Avx2.lanes_for(ElementType::F32), 8);
        assert_eq!(SimdBackend::Avx512.lanes_for(ElementType::I32), 16);
        assert_eq!(SimdBackend::Avx2.register_width_bytes(), 32);
    }

    #[test]
    fn test_lane_width_matches_backend() {
        assert_eq!(lane_width::<f32>(), detected_backend().lanes_for(ElementType::F32));
        assert_eq!(lane_width::<i32>(), lane_width::<f32>());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_x86_baseline_has_sse2() {
        assert!(SimdBackend::Sse2.is_available());
        assert!(!SimdBackend::Neon.is_available());
    }

    #[test]
    fn test_backend_name_roundtrip() {
        for backend in SimdBackend::ALL {
            assert_eq!(backend.name().parse::<SimdBackend>().unwrap(), backend);
        }
        assert_eq!(" AVX2 ".parse::<SimdBackend>().unwrap(), SimdBackend::Avx2);
        assert!(matches!(
            "mmx".parse::<SimdBackend>(),
            Err(KernelError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_partition_exact_multiple() {
        let p = Partition::new(8, 4);
        assert_eq!(p.full_lanes(), 2);
        assert_eq!(p.remainder_start(), 8);
        assert_eq!(p.remainder_len(), 0);
        assert!(p.remainder_range().is_empty());
    }

    #[test]
    fn test_partition_with_remainder() {
        let p = Partition::new(7, 4);
        assert_eq!(p.full_lanes(), 1);
        assert_eq!(p.remainder_start(), 4);
        assert_eq!(p.remainder_range(), 4..7);
        assert_eq!(p.lane_range(0), Some(0..4));
        assert_eq!(p.lane_range(1), None);
        assert_eq!(p.lanes_range(), 0..4);
    }

    #[test]
    fn test_partition_shorter_than_lane() {
        assert_eq!(partition(3, 8), (0, 0));
        assert_eq!(partition(0, 8), (0, 0));
        assert!(Partition::new(0, 8).is_empty());
    }

    #[test]
    fn test_partition_zero_width_is_scalar() {
        let p = Partition::new(5, 0);
        assert_eq!(p.lane_width(), 1);
        assert_eq!(p.full_lanes(), 5);
        assert_eq!(p.remainder_len(), 0);
    }

    #[test]
    fn test_partition_original_item_count() {
        // 100003 items at 8 lanes: 12500 lanes, 3 trailing elements.
        let p = Partition::new(100_003, 8);
        assert_eq!(p.full_lanes(), 12_500);
        assert_eq!(p.remainder_start(), 100_000);
        assert_eq!(p.remainder_len(), 3);
    }
}
