//! Numeric element types the kernels operate on.
//!
//! Only `f32` and `i32` implement [`Element`]; the trait is sealed. Each
//! element type carries its scalar arithmetic, which is the ground truth
//! every other access strategy has to reproduce bit for bit.

use std::fmt;

use crate::lanes::SimdBackend;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for i32 {}
}

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 32-bit IEEE-754 float.
    F32,
    /// 32-bit signed integer.
    I32,
}

impl ElementType {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        4
    }

    /// Size of one element in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        self.size_bytes() * 8
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => f.write_str("f32"),
            Self::I32 => f.write_str("i32"),
        }
    }
}

/// A fixed-width numeric element usable by every kernel.
///
/// The all-zero bit pattern must be a valid value (aligned buffers are
/// zero-initialised), which holds for both implementors.
pub trait Element:
    sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Runtime tag.
    const TYPE: ElementType;

    /// Default compound divisor (`pi` for `f32`, `-43` for `i32`).
    const DEFAULT_DIVISOR: Self;

    /// True for the additive identity.
    fn is_zero(self) -> bool;

    /// Exact equality on the bit pattern.
    fn same_bits(self, other: Self) -> bool;

    /// `l + r`.
    fn sum(l: Self, r: Self) -> Self;

    /// `sqrt((l * r + k) / k)`, in exactly this grouping.
    fn compound(l: Self, r: Self, k: Self) -> Self;

    /// Fixture value for `left[i]`.
    fn fixture_left(i: usize) -> Self;

    /// Fixture value for `right[i]`.
    fn fixture_right(i: usize) -> Self;

    /// Runs the sum kernel over `full_lanes` full lanes of `width` elements.
    ///
    /// Only the first `full_lanes * width` elements are touched.
    fn sum_lanes(
        backend: SimdBackend,
        left: &[Self],
        right: &[Self],
        result: &mut [Self],
        full_lanes: usize,
    );

    /// Runs the compound kernel over `full_lanes` full lanes.
    fn compound_lanes(
        backend: SimdBackend,
        k: Self,
        left: &[Self],
        right: &[Self],
        result: &mut [Self],
        full_lanes: usize,
    );
}

impl Element for f32 {
    const TYPE: ElementType = ElementType::F32;
    const DEFAULT_DIVISOR: Self = std::f32::consts::PI;

    #[inline]
    fn is_zero(self) -> bool {
        self == 0.0
    }

    #[inline]
    fn same_bits(self, other: Self) -> bool {
        self.to_bits() == other.to_bits()
    }

    #[inline]
    fn sum(l: Self, r: Self) -> Self {
        l + r
    }

    #[inline]
    fn compound(l: Self, r: Self, k: Self) -> Self {
        ((l * r + k) / k).sqrt()
    }

    fn fixture_left(i: usize) -> Self {
        i as f32
    }

    fn fixture_right(i: usize) -> Self {
        i as f32 + std::f32::consts::PI
    }

    fn sum_lanes(
        backend: SimdBackend,
        left: &[Self],
        right: &[Self],
        result: &mut [Self],
        full_lanes: usize,
    ) {
        crate::simd::sum_f32(backend, left, right, result, full_lanes);
    }

    fn compound_lanes(
        backend: SimdBackend,
        k: Self,
        left: &[Self],
        right: &[Self],
        result: &mut [Self],
        full_lanes: usize,
    ) {
        crate::simd::compound_f32(backend, k, left, right, result, full_lanes);
    }
}

impl Element for i32 {
    const TYPE: ElementType = ElementType::I32;
    const DEFAULT_DIVISOR: Self = -43;

    #[inline]
    fn is_zero(self) -> bool {
        self == 0
    }

    #[inline]
    fn same_bits(self, other: Self) -> bool {
        self == other
    }

    #[inline]
    fn sum(l: Self, r: Self) -> Self {
        l.wrapping_add(r)
    }

    #[inline]
    fn compound(l: Self, r: Self, k: Self) -> Self {
        isqrt_or_zero(l.wrapping_mul(r).wrapping_add(k).wrapping_div(k))
    }

    fn fixture_left(i: usize) -> Self {
        i as i32
    }

    fn fixture_right(i: usize) -> Self {
        (i / 2) as i32
    }

    fn sum_lanes(
        backend: SimdBackend,
        left: &[Self],
        right: &[Self],
        result: &mut [Self],
        full_lanes: usize,
    ) {
        crate::simd::sum_i32(backend, left, right, result, full_lanes);
    }

    fn compound_lanes(
        backend: SimdBackend,
        k: Self,
        left: &[Self],
        right: &[Self],
        result: &mut [Self],
        full_lanes: usize,
    ) {
        crate::simd::compound_i32(backend, k, left, right, result, full_lanes);
    }
}

/// Integer square root truncated toward zero; negative radicands map to 0.
///
/// 0 is what `(x as f64).sqrt() as i32` yields for negative `x` (NaN
/// saturates to 0), so the integer kernel never faults on its domain edge.
#[inline]
pub fn isqrt_or_zero(x: i32) -> i32 {
    if x < 0 {
        0
    } else {
        x.isqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_sizes() {
        assert_eq!(ElementType::F32.size_bytes(), std::mem::size_of::<f32>());
        assert_eq!(ElementType::I32.bits(), 32);
        assert_eq!(<f32 as Element>::TYPE.to_string(), "f32");
        assert_eq!(<i32 as Element>::TYPE.to_string(), "i32");
    }

    #[test]
    fn test_float_compound_grouping() {
        let k = std::f32::consts::PI;
        let l = 2.0f32;
        let r = 2.0f32 + k;
        let expected = ((l * r + k) / k).sqrt();
        assert!(f32::compound(l, r, k).same_bits(expected));
    }

    #[test]
    fn test_float_same_bits_distinguishes_signed_zero() {
        assert!(!0.0f32.same_bits(-0.0));
        assert!(f32::NAN.same_bits(f32::NAN));
    }

    #[test]
    fn test_isqrt_truncates() {
        assert_eq!(isqrt_or_zero(0), 0);
        assert_eq!(isqrt_or_zero(1), 1);
        assert_eq!(isqrt_or_zero(15), 3);
        assert_eq!(isqrt_or_zero(16), 4);
        assert_eq!(isqrt_or_zero(i32::MAX), 46340);
    }

    #[test]
    fn test_isqrt_negative_radicand_is_zero() {
        assert_eq!(isqrt_or_zero(-1), 0);
        assert_eq!(isqrt_or_zero(i32::MIN), 0);
        // Matches the float-cast definition.
        assert_eq!(f64::from(-5).sqrt() as i32, 0);
    }

    #[test]
    fn test_int_compound_truncating_division() {
        // (3 * 5 - 43) / -43 = -28 / -43 = 0 (truncated) -> sqrt 0
        assert_eq!(i32::compound(3, 5, -43), 0);
        // (0 * 0 - 43) / -43 = 1 -> sqrt 1
        assert_eq!(i32::compound(0, 0, -43), 1);
        // (10 * 10 - 43) / -43 = 57 / -43 = -1 -> negative radicand
        assert_eq!(i32::compound(10, 10, -43), 0);
        // Positive divisor: (10 * 10 + 7) / 7 = 15 -> 3
        assert_eq!(i32::compound(10, 10, 7), 3);
    }

    #[test]
    fn test_int_compound_wraps_on_overflow() {
        let l: i32 = 100_000;
        let r: i32 = 50_000;
        let expected = isqrt_or_zero(l.wrapping_mul(r).wrapping_add(-43) / -43);
        assert_eq!(i32::compound(l, r, -43), expected);
    }

    #[test]
    fn test_fixtures() {
        assert_eq!(f32::fixture_left(7), 7.0);
        assert!(f32::fixture_right(0).same_bits(std::f32::consts::PI));
        assert_eq!(i32::fixture_left(9), 9);
        assert_eq!(i32::fixture_right(9), 4);
    }
}
