//! Owned numeric storage with a guaranteed starting byte alignment.
//!
//! [`AlignedBuffer`] over-allocates by one alignment unit, advances the raw
//! pointer to the next aligned address and then by an optional byte offset
//! (used to produce controlled misalignment in comparisons). The allocation
//! is freed exactly once, by `Drop`; [`AlignedBuffer::release`] consumes
//! the buffer so use-after-release does not compile.
//!
//! [`RegionHandle`] is the setup/teardown shape harnesses want: a slot that
//! may be released any number of times and reports
//! [`KernelError::UseAfterRelease`] afterwards.
#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::element::Element;
use crate::error::{KernelError, Result};

/// Bytes needed to advance `address` to the next multiple of `alignment`.
///
/// Zero when `address` is already aligned. `alignment` must be a power of
/// two.
#[inline]
#[must_use]
pub const fn alignment_padding(address: usize, alignment: usize) -> usize {
    (alignment - address % alignment) % alignment
}

/// Fixed-length buffer of `T` whose first element sits at
/// `aligned_address + byte_offset`.
pub struct AlignedBuffer<T: Element> {
    /// Start of the raw allocation.
    raw: NonNull<u8>,
    layout: Layout,
    /// First element.
    data: NonNull<T>,
    len: usize,
    byte_alignment: usize,
    byte_offset: usize,
    padding: usize,
    _owns: PhantomData<T>,
}

// SAFETY: the buffer exclusively owns its allocation, like Vec<T>.
unsafe impl<T: Element> Send for AlignedBuffer<T> {}
// SAFETY: shared access only hands out &[T].
unsafe impl<T: Element> Sync for AlignedBuffer<T> {}

impl<T: Element> AlignedBuffer<T> {
    /// Allocates `len` zeroed elements starting on a `byte_alignment`
    /// boundary plus `byte_offset` bytes.
    ///
    /// # Errors
    ///
    /// `InvalidAlignment` unless `byte_alignment` is a power of two no
    /// smaller than `align_of::<T>()`; `InvalidOffset` unless `byte_offset`
    /// is a multiple of `align_of::<T>()`; `AllocationFailed` if the
    /// allocator refuses.
    pub fn new(len: usize, byte_alignment: usize, byte_offset: usize) -> Result<Self> {
        let element_align = std::mem::align_of::<T>();
        if !byte_alignment.is_power_of_two() || byte_alignment < element_align {
            return Err(KernelError::InvalidAlignment { alignment: byte_alignment, min: element_align });
        }
        if byte_offset % element_align != 0 {
            return Err(KernelError::InvalidOffset { offset: byte_offset, element_align });
        }

        let data_bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(KernelError::AllocationFailed { bytes: usize::MAX })?;
        // One alignment unit of slack covers any padding; the offset is added on top.
        let bytes = data_bytes
            .checked_add(byte_alignment)
            .and_then(|b| b.checked_add(byte_offset))
            .ok_or(KernelError::AllocationFailed { bytes: usize::MAX })?;
        let layout = Layout::from_size_align(bytes, element_align)
            .map_err(|_| KernelError::AllocationFailed { bytes })?;

        // SAFETY: layout has non-zero size (byte_alignment >= 1).
        let raw = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
            .ok_or(KernelError::AllocationFailed { bytes })?;

        let padding = alignment_padding(raw.as_ptr() as usize, byte_alignment);
        // SAFETY: padding < byte_alignment, so padding + byte_offset + data_bytes <= bytes.
        // The start is a multiple of align_of::<T>() because raw is, and both
        // padding (to a multiple of byte_alignment >= element_align) and
        // byte_offset preserve that.
        let data = unsafe { NonNull::new_unchecked(raw.as_ptr().add(padding + byte_offset).cast::<T>()) };

        crate::trace!(
            "aligned",
            "allocated {len} x {} ({bytes} bytes, align {byte_alignment}, pad {padding}, offset {byte_offset})",
            T::TYPE
        );

        Ok(Self {
            raw,
            layout,
            data,
            len,
            byte_alignment,
            byte_offset,
            padding,
            _owns: PhantomData,
        })
    }

    /// Allocates and fills with `f(i)` for every index.
    pub fn from_fn(
        len: usize,
        byte_alignment: usize,
        byte_offset: usize,
        f: impl FnMut(usize) -> T,
    ) -> Result<Self> {
        let mut buffer = Self::new(len, byte_alignment, byte_offset)?;
        buffer.fill_with(f);
        Ok(buffer)
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the buffer holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Requested byte alignment.
    #[must_use]
    pub const fn byte_alignment(&self) -> usize {
        self.byte_alignment
    }

    /// Requested byte offset past the aligned address.
    #[must_use]
    pub const fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Bytes skipped at the start of the allocation to reach alignment.
    #[must_use]
    pub const fn padding(&self) -> usize {
        self.padding
    }

    /// Address of the first element.
    #[must_use]
    pub fn start_address(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// True if the first element sits on an `alignment`-byte boundary.
    #[must_use]
    pub fn is_aligned_to(&self, alignment: usize) -> bool {
        alignment != 0 && self.start_address() % alignment == 0
    }

    /// Bounds-checked read.
    pub fn get(&self, index: usize) -> Result<T> {
        self.as_slice()
            .get(index)
            .copied()
            .ok_or(KernelError::IndexOutOfBounds { index, len: self.len })
    }

    /// Bounds-checked write.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.len;
        let slot = self
            .as_mut_slice()
            .get_mut(index)
            .ok_or(KernelError::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Writes `f(i)` to every index.
    pub fn fill_with(&mut self, mut f: impl FnMut(usize) -> T) {
        for (i, slot) in self.as_mut_slice().iter_mut().enumerate() {
            *slot = f(i);
        }
    }

    /// View over exactly `len` elements.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: data points to len initialised (zeroed or written) elements
        // inside the allocation, properly aligned for T.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    /// Mutable view over exactly `len` elements.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in as_slice; &mut self guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }

    /// Frees the region now. Equivalent to dropping the buffer.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: Element> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        crate::trace!("aligned", "released {} bytes at {:#x}", self.layout.size(), self.raw.as_ptr() as usize);
        // SAFETY: raw was returned by alloc_zeroed with exactly this layout and
        // Drop runs once.
        unsafe { alloc::dealloc(self.raw.as_ptr(), self.layout) };
    }
}

impl<T: Element> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("type", &T::TYPE)
            .field("len", &self.len)
            .field("byte_alignment", &self.byte_alignment)
            .field("byte_offset", &self.byte_offset)
            .field("start", &format_args!("{:#x}", self.start_address()))
            .finish()
    }
}

/// Result of [`RegionHandle::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The region was freed by this call.
    Released,
    /// The region had already been freed; nothing happened.
    AlreadyReleased,
}

/// A releasable slot holding at most one [`AlignedBuffer`].
///
/// The `Option` is the only state: once taken, the memory is gone and every
/// accessor reports `UseAfterRelease`.
#[derive(Debug)]
pub struct RegionHandle<T: Element> {
    buffer: Option<AlignedBuffer<T>>,
}

impl<T: Element> RegionHandle<T> {
    /// Allocates a new region.
    pub fn allocate(len: usize, byte_alignment: usize, byte_offset: usize) -> Result<Self> {
        AlignedBuffer::new(len, byte_alignment, byte_offset).map(Self::from)
    }

    /// True until the region is released.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.buffer.is_some()
    }

    /// Borrows the buffer.
    pub fn buffer(&self) -> Result<&AlignedBuffer<T>> {
        self.buffer.as_ref().ok_or(KernelError::UseAfterRelease)
    }

    /// Mutably borrows the buffer.
    pub fn buffer_mut(&mut self) -> Result<&mut AlignedBuffer<T>> {
        self.buffer.as_mut().ok_or(KernelError::UseAfterRelease)
    }

    /// Bounds-checked read.
    pub fn get(&self, index: usize) -> Result<T> {
        self.buffer()?.get(index)
    }

    /// Bounds-checked write.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.buffer_mut()?.set(index, value)
    }

    /// Frees the region; later calls are no-ops.
    pub fn release(&mut self) -> ReleaseOutcome {
        match self.buffer.take() {
            Some(buffer) => {
                buffer.release();
                ReleaseOutcome::Released
            }
            None => {
                crate::debug!("aligned", "release on an already released {} region ignored", T::TYPE);
                ReleaseOutcome::AlreadyReleased
            }
        }
    }
}

impl<T: Element> From<AlignedBuffer<T>> for RegionHandle<T> {
    fn from(buffer: AlignedBuffer<T>) -> Self {
        Self { buffer: Some(buffer) }
    }
}
