//! Elementwise kernels and the access strategies that execute them.
//!
//! A run is one `(Kernel, Strategy)` pair dispatched through a single
//! [`Executor`]. All strategies compute `result[i] = f(left[i], right[i])`
//! and must agree bit for bit with [`Strategy::Scalar`].
//!
//! ```
//! use lanewise::kernel::{run_kernel, Kernel, Strategy};
//!
//! let left = [0.0f32, 1.0, 2.0];
//! let right = [3.0f32, 4.0, 5.0];
//! let mut result = [0.0f32; 3];
//! run_kernel(Kernel::Sum, Strategy::Vectorized, &left, &right, &mut result).unwrap();
//! assert_eq!(result, [3.0, 5.0, 7.0]);
//! ```
#![allow(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use crate::element::Element;
use crate::error::{KernelError, Result};
use crate::lanes::{detected_backend, Partition, SimdBackend};

/// The elementwise transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// `left + right`.
    Sum,
    /// `sqrt((left * right + k) / k)`.
    Compound,
}

impl Kernel {
    /// Every kernel.
    pub const ALL: [Self; 2] = [Self::Sum, Self::Compound];

    /// Name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Compound => "compound",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = KernelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "compound" => Ok(Self::Compound),
            _ => Err(KernelError::UnknownKernel(s.to_string())),
        }
    }
}

/// How the kernel walks memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Indexed, bounds-checked loop. The reference.
    Scalar,
    /// Iteration over length-equalised slice views.
    Sliced,
    /// Pointer increments inside an `unsafe` block.
    RawPointer,
    /// Full SIMD lanes, then a scalar remainder.
    Vectorized,
}

impl Strategy {
    /// Every strategy, reference first.
    pub const ALL: [Self; 4] = [Self::Scalar, Self::Sliced, Self::RawPointer, Self::Vectorized];

    /// Name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Sliced => "sliced",
            Self::RawPointer => "raw-pointer",
            Self::Vectorized => "vectorized",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = KernelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "scalar" => Ok(Self::Scalar),
            "sliced" | "slice" => Ok(Self::Sliced),
            "raw-pointer" | "raw" | "pointer" => Ok(Self::RawPointer),
            "vectorized" | "simd" => Ok(Self::Vectorized),
            _ => Err(KernelError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Non-zero divisor of the compound kernel, validated once at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divisor<T: Element>(T);

impl<T: Element> Divisor<T> {
    /// Validates `k`.
    ///
    /// # Errors
    ///
    /// `ZeroDivisor` if `k` is zero.
    pub fn new(k: T) -> Result<Self> {
        if k.is_zero() {
            return Err(KernelError::ZeroDivisor);
        }
        Ok(Self(k))
    }

    /// The divisor value.
    #[must_use]
    pub fn get(self) -> T {
        self.0
    }
}

impl<T: Element> Default for Divisor<T> {
    fn default() -> Self {
        Self(T::DEFAULT_DIVISOR)
    }
}

/// Runs any kernel with any strategy for one element type.
#[derive(Debug, Clone, Copy)]
pub struct Executor<T: Element> {
    backend: SimdBackend,
    lane_width: usize,
    divisor: Divisor<T>,
}

impl<T: Element> Default for Executor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Executor<T> {
    /// Executor on the detected backend with the default divisor.
    #[must_use]
    pub fn new() -> Self {
        let backend = detected_backend();
        Self { backend, lane_width: backend.lanes_for(T::TYPE), divisor: Divisor::default() }
    }

    /// Selects a specific backend.
    ///
    /// # Errors
    ///
    /// `BackendUnavailable` if the CPU lacks the backend's instructions.
    pub fn with_backend(mut self, backend: SimdBackend) -> Result<Self> {
        if !backend.is_available() {
            return Err(KernelError::BackendUnavailable(backend.name()));
        }
        self.backend = backend;
        self.lane_width = backend.lanes_for(T::TYPE);
        Ok(self)
    }

    /// Replaces the compound divisor.
    #[must_use]
    pub fn with_divisor(mut self, divisor: Divisor<T>) -> Self {
        self.divisor = divisor;
        self
    }

    /// Backend used by the vectorized strategy.
    #[must_use]
    pub const fn backend(&self) -> SimdBackend {
        self.backend
    }

    /// Elements per lane for the vectorized strategy.
    #[must_use]
    pub const fn lane_width(&self) -> usize {
        self.lane_width
    }

    /// Compound divisor.
    #[must_use]
    pub fn divisor(&self) -> T {
        self.divisor.get()
    }

    /// Partition the vectorized strategy uses for `len` elements.
    #[must_use]
    pub const fn partition(&self, len: usize) -> Partition {
        Partition::new(len, self.lane_width)
    }

    /// Computes `result[i] = kernel(left[i], right[i])` for every index.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the three buffers differ in length; nothing is
    /// written in that case.
    pub fn run(
        &self,
        kernel: Kernel,
        strategy: Strategy,
        left: &[T],
        right: &[T],
        result: &mut [T],
    ) -> Result<()> {
        check_lengths(left, right, result)?;
        let k = self.divisor.get();
        match (kernel, strategy) {
            (Kernel::Sum, Strategy::Scalar) => scalar(left, right, result, T::sum),
            (Kernel::Compound, Strategy::Scalar) => {
                scalar(left, right, result, |l, r| T::compound(l, r, k));
            }
            (Kernel::Sum, Strategy::Sliced) => sliced(left, right, result, T::sum),
            (Kernel::Compound, Strategy::Sliced) => {
                sliced(left, right, result, |l, r| T::compound(l, r, k));
            }
            (Kernel::Sum, Strategy::RawPointer) => raw_pointer(left, right, result, T::sum),
            (Kernel::Compound, Strategy::RawPointer) => {
                raw_pointer(left, right, result, |l, r| T::compound(l, r, k));
            }
            (Kernel::Sum, Strategy::Vectorized) => {
                let p = self.partition(left.len());
                let lanes = p.lanes_range();
                T::sum_lanes(
                    self.backend,
                    &left[lanes.clone()],
                    &right[lanes.clone()],
                    &mut result[lanes],
                    p.full_lanes(),
                );
                remainder(p, left, right, result, T::sum);
            }
            (Kernel::Compound, Strategy::Vectorized) => {
                let p = self.partition(left.len());
                let lanes = p.lanes_range();
                T::compound_lanes(
                    self.backend,
                    k,
                    &left[lanes.clone()],
                    &right[lanes.clone()],
                    &mut result[lanes],
                    p.full_lanes(),
                );
                remainder(p, left, right, result, |l, r| T::compound(l, r, k));
            }
        }
        Ok(())
    }
}

/// Runs one kernel with the process-wide backend and default divisor.
pub fn run_kernel<T: Element>(
    kernel: Kernel,
    strategy: Strategy,
    left: &[T],
    right: &[T],
    result: &mut [T],
) -> Result<()> {
    Executor::<T>::new().run(kernel, strategy, left, right, result)
}

fn check_lengths<T>(left: &[T], right: &[T], result: &[T]) -> Result<()> {
    if left.len() == right.len() && right.len() == result.len() {
        Ok(())
    } else {
        Err(KernelError::LengthMismatch {
            left: left.len(),
            right: right.len(),
            result: result.len(),
        })
    }
}

#[allow(clippy::needless_range_loop)]
#[inline]
fn scalar<T: Element>(left: &[T], right: &[T], result: &mut [T], f: impl Fn(T, T) -> T) {
    for i in 0..left.len() {
        result[i] = f(left[i], right[i]);
    }
}

#[inline]
fn sliced<T: Element>(left: &[T], right: &[T], result: &mut [T], f: impl Fn(T, T) -> T) {
    let n = result.len();
    let (left, right) = (&left[..n], &right[..n]);
    for (o, (&l, &r)) in result.iter_mut().zip(left.iter().zip(right)) {
        *o = f(l, r);
    }
}

#[inline]
fn raw_pointer<T: Element>(left: &[T], right: &[T], result: &mut [T], f: impl Fn(T, T) -> T) {
    let n = result.len();
    assert!(left.len() >= n && right.len() >= n);
    let mut l = left.as_ptr();
    let mut r = right.as_ptr();
    let mut o = result.as_mut_ptr();
    // SAFETY: all three slices hold at least n elements (asserted above); each
    // pointer advances n times and is dereferenced only before reaching one
    // past the end.
    unsafe {
        for _ in 0..n {
            *o = f(*l, *r);
            l = l.add(1);
            r = r.add(1);
            o = o.add(1);
        }
    }
}

#[inline]
fn remainder<T: Element>(p: Partition, left: &[T], right: &[T], result: &mut [T], f: impl Fn(T, T) -> T) {
    for i in p.remainder_range() {
        result[i] = f(left[i], right[i]);
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use super::Strategy;
    use proptest::prelude::*;
    use proptest::strategy::Strategy as _;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Every strategy reproduces the scalar reference on arbitrary floats.
        #[test]
        fn prop_float_strategies_match_scalar(
            pairs in prop::collection::vec((-1.0e6f32..1.0e6, -1.0e6f32..1.0e6), 0..300),
            kernel_idx in 0usize..2,
        ) {
            let kernel = Kernel::ALL[kernel_idx];
            let (left, right): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();
            let executor = Executor::<f32>::new();
            let mut reference = vec![0.0; left.len()];
            executor.run(kernel, Strategy::Scalar, &left, &right, &mut reference).unwrap();

            for strategy in Strategy::ALL {
                let mut result = vec![0.0; left.len()];
                executor.run(kernel, strategy, &left, &right, &mut result).unwrap();
                for i in 0..left.len() {
                    prop_assert!(result[i].same_bits(reference[i]),
                        "{} {} index {}: {} vs {}", kernel, strategy, i, result[i], reference[i]);
                }
            }
        }

        /// Integer kernels wrap, truncate and clamp negative radicands the same way everywhere.
        #[test]
        fn prop_int_strategies_match_scalar(
            pairs in prop::collection::vec((any::<i32>(), any::<i32>()), 0..300),
            k in any::<i32>().prop_filter("non-zero", |k| *k != 0),
        ) {
            let (left, right): (Vec<i32>, Vec<i32>) = pairs.into_iter().unzip();
            let executor = Executor::<i32>::new().with_divisor(Divisor::new(k).unwrap());
            for kernel in Kernel::ALL {
                let mut reference = vec![0; left.len()];
                executor.run(kernel, Strategy::Scalar, &left, &right, &mut reference).unwrap();
                for strategy in Strategy::ALL {
                    let mut result = vec![0; left.len()];
                    executor.run(kernel, strategy, &left, &right, &mut result).unwrap();
                    prop_assert_eq!(&result, &reference, "{} {}", kernel, strategy);
                }
            }
        }
    }
}
