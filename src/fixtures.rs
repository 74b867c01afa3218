//! Buffer construction and deterministic input fixtures.
//!
//! Harnesses build inputs once per run and pass them explicitly to every
//! kernel invocation; nothing here is global.
//!
//! Fixture values: `left[i] = i`, `right[i] = i + pi` for `f32`;
//! `left[i] = i`, `right[i] = i / 2` for `i32`.

use crate::aligned::AlignedBuffer;
use crate::element::Element;
use crate::error::Result;

/// Item count used by the benchmarks (deliberately not a lane multiple).
pub const BENCH_ITEMS: usize = 100_003;

/// Item count used by the debug verifier.
pub const VERIFY_ITEMS: usize = 100_000;

/// Zeroed plain heap buffer.
#[must_use]
pub fn create_buffer<T: Element>(len: usize) -> Vec<T> {
    vec![T::default(); len]
}

/// Zeroed aligned buffer.
pub fn create_aligned_buffer<T: Element>(
    len: usize,
    byte_alignment: usize,
    byte_offset: usize,
) -> Result<AlignedBuffer<T>> {
    AlignedBuffer::new(len, byte_alignment, byte_offset)
}

/// The two read-only inputs of a kernel on the heap.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInputs<T: Element> {
    left: Vec<T>,
    right: Vec<T>,
}

impl<T: Element> KernelInputs<T> {
    /// Deterministic fixture inputs of length `len`.
    #[must_use]
    pub fn fixture(len: usize) -> Self {
        Self {
            left: (0..len).map(T::fixture_left).collect(),
            right: (0..len).map(T::fixture_right).collect(),
        }
    }

    /// Wraps caller-provided inputs; `None` if their lengths differ.
    #[must_use]
    pub fn from_vecs(left: Vec<T>, right: Vec<T>) -> Option<Self> {
        (left.len() == right.len()).then_some(Self { left, right })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Left input.
    #[must_use]
    pub fn left(&self) -> &[T] {
        &self.left
    }

    /// Right input.
    #[must_use]
    pub fn right(&self) -> &[T] {
        &self.right
    }

    /// Zeroed output buffer of matching length.
    #[must_use]
    pub fn output(&self) -> Vec<T> {
        create_buffer(self.len())
    }

    /// Copies both inputs into aligned buffers.
    pub fn to_aligned(&self, byte_alignment: usize, byte_offset: usize) -> Result<AlignedInputs<T>> {
        Ok(AlignedInputs {
            left: AlignedBuffer::from_fn(self.len(), byte_alignment, byte_offset, |i| self.left[i])?,
            right: AlignedBuffer::from_fn(self.len(), byte_alignment, byte_offset, |i| self.right[i])?,
        })
    }
}

/// The two read-only inputs of a kernel in aligned memory.
#[derive(Debug)]
pub struct AlignedInputs<T: Element> {
    left: AlignedBuffer<T>,
    right: AlignedBuffer<T>,
}

impl<T: Element> AlignedInputs<T> {
    /// Deterministic fixture inputs in aligned memory.
    pub fn fixture(len: usize, byte_alignment: usize, byte_offset: usize) -> Result<Self> {
        Ok(Self {
            left: AlignedBuffer::from_fn(len, byte_alignment, byte_offset, T::fixture_left)?,
            right: AlignedBuffer::from_fn(len, byte_alignment, byte_offset, T::fixture_right)?,
        })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Left input.
    #[must_use]
    pub fn left(&self) -> &[T] {
        &self.left
    }

    /// Right input.
    #[must_use]
    pub fn right(&self) -> &[T] {
        &self.right
    }

    /// Zeroed aligned output with the inputs' alignment and offset.
    pub fn output(&self) -> Result<AlignedBuffer<T>> {
        create_aligned_buffer(self.len(), self.left.byte_alignment(), self.left.byte_offset())
    }
}
