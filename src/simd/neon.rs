//! AArch64 NEON lane bodies (128-bit, 4 x 32-bit lanes).
//!
//! NEON loads and stores have no alignment requirement, so there is no
//! aligned variant.
#![allow(unsafe_code)]

use std::arch::aarch64::*;

use crate::element::isqrt_or_zero;

const WIDTH: usize = 4;

#[target_feature(enable = "neon")]
pub(super) unsafe fn sum_f32(left: &[f32], right: &[f32], result: &mut [f32], full_lanes: usize) {
    let l = left.as_ptr();
    let r = right.as_ptr();
    let o = result.as_mut_ptr();
    for lane in 0..full_lanes {
        let i = lane * WIDTH;
        unsafe {
            let v = vaddq_f32(vld1q_f32(l.add(i)), vld1q_f32(r.add(i)));
            vst1q_f32(o.add(i), v);
        }
    }
}

#[target_feature(enable = "neon")]
pub(super) unsafe fn compound_f32(
    k: f32,
    left: &[f32],
    right: &[f32],
    result: &mut [f32],
    full_lanes: usize,
) {
    let l = left.as_ptr();
    let r = right.as_ptr();
    let o = result.as_mut_ptr();
    unsafe {
        let kv = vdupq_n_f32(k);
        for lane in 0..full_lanes {
            let i = lane * WIDTH;
            let a = vld1q_f32(l.add(i));
            let b = vld1q_f32(r.add(i));
            // vmul then vadd, never vfma: keeps the scalar rounding
            let v = vsqrtq_f32(vdivq_f32(vaddq_f32(vmulq_f32(a, b), kv), kv));
            vst1q_f32(o.add(i), v);
        }
    }
}

#[target_feature(enable = "neon")]
pub(super) unsafe fn sum_i32(left: &[i32], right: &[i32], result: &mut [i32], full_lanes: usize) {
    let l = left.as_ptr();
    let r = right.as_ptr();
    let o = result.as_mut_ptr();
    for lane in 0..full_lanes {
        let i = lane * WIDTH;
        unsafe {
            let v = vaddq_s32(vld1q_s32(l.add(i)), vld1q_s32(r.add(i)));
            vst1q_s32(o.add(i), v);
        }
    }
}

#[target_feature(enable = "neon")]
pub(super) unsafe fn compound_i32(
    k: i32,
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    for lane in 0..full_lanes {
        let i = lane * WIDTH;
        unsafe {
            let kv = vdupq_n_s32(k);
            let a = vld1q_s32(left.as_ptr().add(i));
            let b = vld1q_s32(right.as_ptr().add(i));
            vst1q_s32(result.as_mut_ptr().add(i), vaddq_s32(vmulq_s32(a, b), kv));
        }
        for v in &mut result[i..i + WIDTH] {
            *v = isqrt_or_zero(v.wrapping_div(k));
        }
    }
}
