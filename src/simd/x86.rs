//! x86_64 lane bodies (SSE2, AVX2, AVX-512F).
//!
//! # Safety
//!
//! Every function requires its target feature to be present and every
//! slice to hold at least `full_lanes * WIDTH` elements. With
//! `ALIGNED = true` the three base pointers must also be aligned to the
//! register width. The dispatcher in `simd/mod.rs` establishes all three.
#![allow(unsafe_code)]

use std::arch::x86_64::*;

use crate::element::isqrt_or_zero;

macro_rules! f32_kernels {
    (
        $feature:literal, $width:literal, $sum:ident, $compound:ident,
        $load:ident, $loadu:ident, $store:ident, $storeu:ident,
        $set1:ident, $add:ident, $mul:ident, $div:ident, $sqrt:ident
    ) => {
        #[target_feature(enable = $feature)]
        pub(super) unsafe fn $sum<const ALIGNED: bool>(
            left: &[f32],
            right: &[f32],
            result: &mut [f32],
            full_lanes: usize,
        ) {
            let l = left.as_ptr();
            let r = right.as_ptr();
            let o = result.as_mut_ptr();
            for lane in 0..full_lanes {
                let i = lane * $width;
                unsafe {
                    let (a, b) = if ALIGNED {
                        ($load(l.add(i)), $load(r.add(i)))
                    } else {
                        ($loadu(l.add(i)), $loadu(r.add(i)))
                    };
                    let v = $add(a, b);
                    if ALIGNED {
                        $store(o.add(i), v);
                    } else {
                        $storeu(o.add(i), v);
                    }
                }
            }
        }

        #[target_feature(enable = $feature)]
        pub(super) unsafe fn $compound<const ALIGNED: bool>(
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
                let kv = $set1(k);
                for lane in 0..full_lanes {
                    let i = lane * $width;
                    let (a, b) = if ALIGNED {
                        ($load(l.add(i)), $load(r.add(i)))
                    } else {
                        ($loadu(l.add(i)), $loadu(r.add(i)))
                    };
                    // sqrt((a * b + k) / k), same grouping as the scalar form
                    let v = $sqrt($div($add($mul(a, b), kv), kv));
                    if ALIGNED {
                        $store(o.add(i), v);
                    } else {
                        $storeu(o.add(i), v);
                    }
                }
            }
        }
    };
}

f32_kernels!(
    "sse2", 4, sum_f32_sse2, compound_f32_sse2,
    _mm_load_ps, _mm_loadu_ps, _mm_store_ps, _mm_storeu_ps,
    _mm_set1_ps, _mm_add_ps, _mm_mul_ps, _mm_div_ps, _mm_sqrt_ps
);

f32_kernels!(
    "avx2", 8, sum_f32_avx2, compound_f32_avx2,
    _mm256_load_ps, _mm256_loadu_ps, _mm256_store_ps, _mm256_storeu_ps,
    _mm256_set1_ps, _mm256_add_ps, _mm256_mul_ps, _mm256_div_ps, _mm256_sqrt_ps
);

f32_kernels!(
    "avx512f", 16, sum_f32_avx512, compound_f32_avx512,
    _mm512_load_ps, _mm512_loadu_ps, _mm512_store_ps, _mm512_storeu_ps,
    _mm512_set1_ps, _mm512_add_ps, _mm512_mul_ps, _mm512_div_ps, _mm512_sqrt_ps
);

#[target_feature(enable = "sse2")]
pub(super) unsafe fn sum_i32_sse2<const ALIGNED: bool>(
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let l = left.as_ptr().cast::<__m128i>();
    let r = right.as_ptr().cast::<__m128i>();
    let o = result.as_mut_ptr().cast::<__m128i>();
    for lane in 0..full_lanes {
        unsafe {
            let (a, b) = if ALIGNED {
                (_mm_load_si128(l.add(lane)), _mm_load_si128(r.add(lane)))
            } else {
                (_mm_loadu_si128(l.add(lane)), _mm_loadu_si128(r.add(lane)))
            };
            let v = _mm_add_epi32(a, b);
            if ALIGNED {
                _mm_store_si128(o.add(lane), v);
            } else {
                _mm_storeu_si128(o.add(lane), v);
            }
        }
    }
}

#[target_feature(enable = "avx2")]
pub(super) unsafe fn sum_i32_avx2<const ALIGNED: bool>(
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let l = left.as_ptr().cast::<__m256i>();
    let r = right.as_ptr().cast::<__m256i>();
    let o = result.as_mut_ptr().cast::<__m256i>();
    for lane in 0..full_lanes {
        unsafe {
            let (a, b) = if ALIGNED {
                (_mm256_load_si256(l.add(lane)), _mm256_load_si256(r.add(lane)))
            } else {
                (_mm256_loadu_si256(l.add(lane)), _mm256_loadu_si256(r.add(lane)))
            };
            let v = _mm256_add_epi32(a, b);
            if ALIGNED {
                _mm256_store_si256(o.add(lane), v);
            } else {
                _mm256_storeu_si256(o.add(lane), v);
            }
        }
    }
}

#[target_feature(enable = "avx512f")]
pub(super) unsafe fn sum_i32_avx512<const ALIGNED: bool>(
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let l = left.as_ptr();
    let r = right.as_ptr();
    let o = result.as_mut_ptr();
    for lane in 0..full_lanes {
        let i = lane * 16;
        unsafe {
            let (a, b) = if ALIGNED {
                (_mm512_load_epi32(l.add(i)), _mm512_load_epi32(r.add(i)))
            } else {
                (_mm512_loadu_epi32(l.add(i)), _mm512_loadu_epi32(r.add(i)))
            };
            let v = _mm512_add_epi32(a, b);
            if ALIGNED {
                _mm512_store_epi32(o.add(i), v);
            } else {
                _mm512_storeu_epi32(o.add(i), v);
            }
        }
    }
}

/// Finishes an integer compound lane in place: `result` holds `l * r + k`.
///
/// There is no vector integer division or square root, so each lane ends
/// with per-element truncating division and `isqrt_or_zero`.
#[inline(always)]
fn finish_i32_lane(k: i32, lane: &mut [i32]) {
    for v in lane {
        *v = isqrt_or_zero(v.wrapping_div(k));
    }
}

/// SSE2 has no 32-bit low multiply (that is SSE4.1), so every step of the
/// lane is element-wise; lanes still follow the 4-wide partition.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn compound_i32_sse2(
    k: i32,
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let n = full_lanes * 4;
    for ((l, r), o) in left[..n]
        .chunks_exact(4)
        .zip(right[..n].chunks_exact(4))
        .zip(result[..n].chunks_exact_mut(4))
    {
        for j in 0..4 {
            o[j] = l[j].wrapping_mul(r[j]).wrapping_add(k);
        }
        finish_i32_lane(k, o);
    }
}

#[target_feature(enable = "avx2")]
pub(super) unsafe fn compound_i32_avx2<const ALIGNED: bool>(
    k: i32,
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let kv = _mm256_set1_epi32(k);
    for lane in 0..full_lanes {
        let i = lane * 8;
        unsafe {
            let l = left.as_ptr().add(i).cast::<__m256i>();
            let r = right.as_ptr().add(i).cast::<__m256i>();
            let o = result.as_mut_ptr().add(i).cast::<__m256i>();
            let (a, b) = if ALIGNED {
                (_mm256_load_si256(l), _mm256_load_si256(r))
            } else {
                (_mm256_loadu_si256(l), _mm256_loadu_si256(r))
            };
            let v = _mm256_add_epi32(_mm256_mullo_epi32(a, b), kv);
            if ALIGNED {
                _mm256_store_si256(o, v);
            } else {
                _mm256_storeu_si256(o, v);
            }
        }
        finish_i32_lane(k, &mut result[i..i + 8]);
    }
}

#[target_feature(enable = "avx512f")]
pub(super) unsafe fn compound_i32_avx512<const ALIGNED: bool>(
    k: i32,
    left: &[i32],
    right: &[i32],
    result: &mut [i32],
    full_lanes: usize,
) {
    let kv = _mm512_set1_epi32(k);
    for lane in 0..full_lanes {
        let i = lane * 16;
        unsafe {
            let l = left.as_ptr().add(i);
            let r = right.as_ptr().add(i);
            let o = result.as_mut_ptr().add(i);
            let (a, b) = if ALIGNED {
                (_mm512_load_epi32(l), _mm512_load_epi32(r))
            } else {
                (_mm512_loadu_epi32(l), _mm512_loadu_epi32(r))
            };
            let v = _mm512_add_epi32(_mm512_mullo_epi32(a, b), kv);
            if ALIGNED {
                _mm512_store_epi32(o, v);
            } else {
                _mm512_storeu_epi32(o, v);
            }
        }
        finish_i32_lane(k, &mut result[i..i + 16]);
    }
}
