//! Lane dispatch for the vectorized strategy.
//!
//! Each entry point processes exactly `full_lanes` full lanes of the
//! backend's width starting at index 0 and never touches the remainder.
//! Inputs are truncated to `full_lanes * width` before any intrinsic runs,
//! so a short slice panics in safe code instead of reading out of bounds.
//! When the backend's feature is missing at runtime the lanes run through
//! the scalar form instead.
#![allow(unsafe_code)]

#[cfg(target_arch = "x86_64")]
mod x86;

#[cfg(target_arch = "aarch64")]
mod neon;

use crate::element::{Element, ElementType};
use crate::lanes::SimdBackend;

/// True if all three base pointers sit on a register-width boundary, so
/// every lane (stride = register width) can use aligned loads and stores.
#[cfg(target_arch = "x86_64")]
fn lanes_aligned<T>(backend: SimdBackend, left: &[T], right: &[T], result: &[T]) -> bool {
    let bytes = backend.register_width_bytes();
    [left.as_ptr(), right.as_ptr(), result.as_ptr()]
        .iter()
        .all(|p| (*p as usize) % bytes == 0)
}

fn scalar_lanes<T: Element>(left: &[T], right: &[T], result: &mut [T], f: impl Fn(T, T) -> T) {
    for ((o, &l), &r) in result.iter_mut().zip(left).zip(right) {
        *o = f(l, r);
    }
}

#[cfg(target_arch = "x86_64")]
macro_rules! call_aligned {
    ($aligned:expr, $f:ident($($arg:expr),* $(,)?)) => {
        // SAFETY: feature checked by the caller's match guard; slices are
        // truncated to full_lanes * width; the aligned variant is chosen only
        // when `lanes_aligned` holds.
        unsafe {
            if $aligned {
                x86::$f::<true>($($arg),*)
            } else {
                x86::$f::<false>($($arg),*)
            }
        }
    };
}

pub(crate) fn sum_f32(
    backend: SimdBackend,
    left: &[f32],
    right: &[f32],
    result: &mut [f32],
    full_lanes: usize,
) {
    let n = full_lanes * backend.lanes_for(ElementType::F32);
    let (left, right, result) = (&left[..n], &right[..n], &mut result[..n]);
    #[cfg(target_arch = "x86_64")]
    let aligned = lanes_aligned(backend, left, right, result);

    match backend {
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx512 if is_x86_feature_detected!("avx512f") => {
            call_aligned!(aligned, sum_f32_avx512(left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx2 if is_x86_feature_detected!("avx2") => {
            call_aligned!(aligned, sum_f32_avx2(left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Sse2 if is_x86_feature_detected!("sse2") => {
            call_aligned!(aligned, sum_f32_sse2(left, right, result, full_lanes));
        }
        #[cfg(target_arch = "aarch64")]
        SimdBackend::Neon => {
            // SAFETY: NEON is mandatory on aarch64; slices truncated above.
            unsafe { neon::sum_f32(left, right, result, full_lanes) }
        }
        _ => scalar_lanes(left, right, result, <f32 as Element>::sum),
    }
}

pub(crate) fn compound_f32(
    backend: SimdBackend,
    k: f32,
    left: &[f32],
    right: &[f32],
    result: &mut [f32],
    full_lanes: usize,
) {
    let n = full_lanes * backend.lanes_for(ElementType::F32);
    let (left, right, result) = (&left[..n], &right[..n], &mut result[..n]);
    #[cfg(target_arch = "x86_64")]
    let aligned = lanes_aligned(backend, left, right, result);

    match backend {
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx512 if is_x86_feature_detected!("avx512f") => {
            call_aligned!(aligned, compound_f32_avx512(k, left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx2 if is_x86_feature_detected!("avx2") => {
            call_aligned!(aligned, compound_f32_avx2(k, left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Sse2 if is_x86_feature_detected!("sse2") => {
            call_aligned!(aligned, compound_f32_sse2(k, left, right, result, full_lanes));
        }
        #[cfg(target_arch = "aarch64")]
        SimdBackend::Neon => {
            // SAFETY: NEON is mandatory on aarch64; slices truncated above.
            unsafe { neon::compound_f32(k, left, right, result, full_lanes) }
        }
        _ => scalar_lanes(left, right, result, |l, r| f32::compound(l, r, k)),
    }
}

pub(crate) fn sum_i32(
    backend: SimdBackend,
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let n = full_lanes * backend.lanes_for(ElementType::I32);
    let (left, right, result) = (&left[..n], &right[..n], &mut result[..n]);
    #[cfg(target_arch = "x86_64")]
    let aligned = lanes_aligned(backend, left, right, result);

    match backend {
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx512 if is_x86_feature_detected!("avx512f") => {
            call_aligned!(aligned, sum_i32_avx512(left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx2 if is_x86_feature_detected!("avx2") => {
            call_aligned!(aligned, sum_i32_avx2(left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Sse2 if is_x86_feature_detected!("sse2") => {
            call_aligned!(aligned, sum_i32_sse2(left, right, result, full_lanes));
        }
        #[cfg(target_arch = "aarch64")]
        SimdBackend::Neon => {
            // SAFETY: NEON is mandatory on aarch64; slices truncated above.
            unsafe { neon::sum_i32(left, right, result, full_lanes) }
        }
        _ => scalar_lanes(left, right, result, <i32 as Element>::sum),
    }
}

pub(crate) fn compound_i32(
    backend: SimdBackend,
    k: i32,
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let n = full_lanes * backend.lanes_for(ElementType::I32);
    let (left, right, result) = (&left[..n], &right[..n], &mut result[..n]);
    #[cfg(target_arch = "x86_64")]
    let aligned = lanes_aligned(backend, left, right, result);

    match backend {
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx512 if is_x86_feature_detected!("avx512f") => {
            call_aligned!(aligned, compound_i32_avx512(k, left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Avx2 if is_x86_feature_detected!("avx2") => {
            call_aligned!(aligned, compound_i32_avx2(k, left, right, result, full_lanes));
        }
        #[cfg(target_arch = "x86_64")]
        SimdBackend::Sse2 if is_x86_feature_detected!("sse2") => {
            // SAFETY: SSE2 detected; slices truncated above.
            unsafe { x86::compound_i32_sse2(k, left, right, result, full_lanes) }
        }
        #[cfg(target_arch = "aarch64")]
        SimdBackend::Neon => {
            // SAFETY: NEON is mandatory on aarch64; slices truncated above.
            unsafe { neon::compound_i32(k, left, right, result, full_lanes) }
        }
        _ => scalar_lanes(left, right, result, |l, r| i32::compound(l, r, k)),
    }
}
