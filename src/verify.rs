//! Exact comparison of kernel outputs against the scalar reference.
//!
//! Comparison is bitwise, never tolerance-based: every strategy performs
//! the same IEEE-754 operations in the same order, so any difference is a
//! bug in an access strategy (remainder handling, lane boundaries, a stale
//! buffer) rather than rounding noise.

use std::fmt;

use crate::element::Element;
use crate::error::{KernelError, Result};
use crate::fixtures::KernelInputs;
use crate::kernel::{Executor, Kernel, Strategy};

/// First index at which a candidate differs from the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch<T: Element> {
    /// Index of the first differing element.
    pub index: usize,
    /// Reference value.
    pub expected: T,
    /// Candidate value.
    pub actual: T,
}

impl<T: Element> fmt::Display for Mismatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "result does not match starting at {}: {} vs {}",
            self.index, self.expected, self.actual
        )
    }
}

/// Outcome of [`verify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<T: Element> {
    /// Elements compared before stopping.
    pub checked: usize,
    /// First mismatch, if any.
    pub first_mismatch: Option<Mismatch<T>>,
}

impl<T: Element> MatchResult<T> {
    /// True if every element matched.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.first_mismatch.is_none()
    }

    /// Index of the first mismatch.
    #[must_use]
    pub fn first_mismatch_index(&self) -> Option<usize> {
        self.first_mismatch.map(|m| m.index)
    }
}

/// Compares `candidate` to `reference` element by element, stopping at the
/// first difference.
///
/// # Errors
///
/// `CompareLengthMismatch` if the buffers differ in length.
pub fn verify<T: Element>(candidate: &[T], reference: &[T]) -> Result<MatchResult<T>> {
    if candidate.len() != reference.len() {
        return Err(KernelError::CompareLengthMismatch {
            candidate: candidate.len(),
            reference: reference.len(),
        });
    }

    let first_mismatch = candidate
        .iter()
        .zip(reference)
        .position(|(a, b)| !a.same_bits(*b))
        .map(|index| Mismatch { index, expected: reference[index], actual: candidate[index] });

    if let Some(mismatch) = &first_mismatch {
        crate::warn!("verify", "{mismatch}");
    }

    Ok(MatchResult {
        checked: first_mismatch.map_or(candidate.len(), |m| m.index + 1),
        first_mismatch,
    })
}

/// Where a checked run read and wrote its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    /// Ordinary `Vec` buffers.
    Heap,
    /// [`AlignedBuffer`](crate::aligned::AlignedBuffer)s with the given byte offset.
    Aligned {
        /// Byte offset past the aligned address.
        byte_offset: usize,
    },
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heap => f.write_str("heap"),
            Self::Aligned { byte_offset: 0 } => f.write_str("aligned"),
            Self::Aligned { byte_offset } => write!(f, "aligned+{byte_offset}"),
        }
    }
}

/// One verified run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyReport<T: Element> {
    /// Kernel that ran.
    pub kernel: Kernel,
    /// Strategy that ran.
    pub strategy: Strategy,
    /// Memory the run used.
    pub memory: Memory,
    /// Comparison with the scalar reference.
    pub outcome: MatchResult<T>,
}

impl<T: Element> StrategyReport<T> {
    /// True if the run matched the reference.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.matches()
    }
}

impl<T: Element> fmt::Display for StrategyReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", T::TYPE, self.kernel, self.strategy, self.memory)?;
        match &self.outcome.first_mismatch {
            None => write!(f, ": ok ({} elements)", self.outcome.checked),
            Some(mismatch) => write!(f, ": MISMATCH, {mismatch}"),
        }
    }
}

/// Runs every strategy of a kernel against the scalar reference.
#[derive(Debug)]
pub struct VerificationSuite<T: Element> {
    executor: Executor<T>,
    inputs: KernelInputs<T>,
}

impl<T: Element> VerificationSuite<T> {
    /// Suite over `inputs`.
    pub fn new(executor: Executor<T>, inputs: KernelInputs<T>) -> Self {
        Self { executor, inputs }
    }

    /// Executor in use.
    pub fn executor(&self) -> &Executor<T> {
        &self.executor
    }

    /// Scalar reference output for `kernel`.
    pub fn reference(&self, kernel: Kernel) -> Result<Vec<T>> {
        let mut reference = vec![T::default(); self.inputs.len()];
        self.executor.run(kernel, Strategy::Scalar, self.inputs.left(), self.inputs.right(), &mut reference)?;
        Ok(reference)
    }

    /// Runs every non-reference strategy on heap buffers, each into a
    /// freshly zeroed output.
    pub fn check_kernel(&self, kernel: Kernel) -> Result<Vec<StrategyReport<T>>> {
        crate::time_scope!("verify", format!("{} {kernel}", T::TYPE));
        let reference = self.reference(kernel)?;
        let mut reports = Vec::with_capacity(Strategy::ALL.len() - 1);
        for strategy in Strategy::ALL.into_iter().filter(|s| *s != Strategy::Scalar) {
            let mut result = vec![T::default(); self.inputs.len()];
            self.executor.run(kernel, strategy, self.inputs.left(), self.inputs.right(), &mut result)?;
            reports.push(self.report(kernel, strategy, Memory::Heap, &result, &reference)?);
        }
        Ok(reports)
    }

    /// Runs the vectorized strategy over aligned copies of the inputs.
    pub fn check_aligned(
        &self,
        kernel: Kernel,
        byte_alignment: usize,
        byte_offset: usize,
    ) -> Result<StrategyReport<T>> {
        let reference = self.reference(kernel)?;
        let aligned = self.inputs.to_aligned(byte_alignment, byte_offset)?;
        let mut result = aligned.output()?;
        self.executor.run(kernel, Strategy::Vectorized, aligned.left(), aligned.right(), &mut result)?;
        self.report(kernel, Strategy::Vectorized, Memory::Aligned { byte_offset }, &result, &reference)
    }

    /// Every kernel, every strategy, plus the aligned vectorized path.
    pub fn run_all(&self, byte_alignment: usize, byte_offset: usize) -> Result<Vec<StrategyReport<T>>> {
        let mut reports = Vec::new();
        for kernel in Kernel::ALL {
            reports.extend(self.check_kernel(kernel)?);
            reports.push(self.check_aligned(kernel, byte_alignment, 0)?);
            if byte_offset != 0 {
                reports.push(self.check_aligned(kernel, byte_alignment, byte_offset)?);
            }
        }

        let failed = reports.iter().filter(|r| !r.passed()).count();
        if failed == 0 {
            crate::info!("verify", "{}: all {} checks passed", T::TYPE, reports.len());
        } else {
            crate::error!("verify", "{}: {failed} of {} checks failed", T::TYPE, reports.len());
        }
        Ok(reports)
    }

    fn report(
        &self,
        kernel: Kernel,
        strategy: Strategy,
        memory: Memory,
        result: &[T],
        reference: &[T],
    ) -> Result<StrategyReport<T>> {
        let report = StrategyReport { kernel, strategy, memory, outcome: verify(result, reference)? };
        crate::debug!("verify", "{report}");
        Ok(report)
    }
}
