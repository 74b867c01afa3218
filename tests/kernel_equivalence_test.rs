//! Kernel equivalence tests across strategies, backends and memory layouts.
//!
//! Every strategy must reproduce the scalar reference bit for bit, including
//! the scalar remainder past the last full lane.
//!
//! Run: cargo test --test kernel_equivalence_test

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use lanewise::prelude::*;
use lanewise::Strategy;
use proptest::prelude::*;
use proptest::strategy::Strategy as _;

/// A 4-wide f32 backend that every CPU of the architecture has.
fn four_wide<T: Element>() -> Option<Executor<T>> {
    #[cfg(target_arch = "x86_64")]
    let backend = Some(SimdBackend::Sse2);
    #[cfg(target_arch = "aarch64")]
    let backend = Some(SimdBackend::Neon);
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    let backend: Option<SimdBackend> = None;

    backend.map(|b| Executor::new().with_backend(b).unwrap())
}

fn available_backends() -> impl Iterator<Item = SimdBackend> {
    SimdBackend::ALL.into_iter().filter(|b| b.is_available())
}

fn run_all_strategies<T: Element>(
    executor: &Executor<T>,
    kernel: Kernel,
    left: &[T],
    right: &[T],
) -> Vec<(Strategy, Vec<T>)> {
    Strategy::ALL
        .into_iter()
        .map(|strategy| {
            let mut result = vec![T::default(); left.len()];
            executor.run(kernel, strategy, left, right, &mut result).unwrap();
            (strategy, result)
        })
        .collect()
}

// ============================================================================
// Lane boundaries and remainders
// ============================================================================

#[test]
fn sum_of_eight_fills_two_full_lanes() {
    let Some(executor) = four_wide::<f32>() else { return };
    let left = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let right = [10.0f32; 8];

    assert_eq!(executor.partition(8).full_lanes(), 2);
    assert_eq!(executor.partition(8).remainder_len(), 0);

    for (strategy, result) in run_all_strategies(&executor, Kernel::Sum, &left, &right) {
        assert_eq!(result, [11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0], "{strategy}");
    }
}

#[test]
fn sum_of_seven_finishes_remainder_in_scalar() {
    let Some(executor) = four_wide::<f32>() else { return };
    let left = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
    let right = [0.5f32; 7];

    let p = executor.partition(7);
    assert_eq!((p.full_lanes(), p.remainder_start(), p.remainder_len()), (1, 4, 3));

    let mut result = vec![0.0f32; 7];
    executor.run(Kernel::Sum, Strategy::Vectorized, &left, &right, &mut result).unwrap();

    // last lane element, first and last remainder elements
    assert_eq!(result[3], 4.5);
    assert_eq!(result[4], 5.5);
    assert_eq!(result[6], 7.5);
}

#[test]
fn shorter_than_one_lane_is_all_remainder() {
    let Some(executor) = four_wide::<i32>() else { return };
    let mut result = vec![0; 3];
    executor.run(Kernel::Sum, Strategy::Vectorized, &[1, 2, 3], &[4, 5, 6], &mut result).unwrap();
    assert_eq!(result, [5, 7, 9]);
    assert_eq!(executor.partition(3).full_lanes(), 0);
}

#[test]
fn empty_buffers_are_a_no_op() {
    for strategy in Strategy::ALL {
        let mut result: Vec<f32> = Vec::new();
        Executor::<f32>::new().run(Kernel::Compound, strategy, &[], &[], &mut result).unwrap();
        assert!(result.is_empty());
    }
}

// ============================================================================
// Compound kernel values
// ============================================================================

#[test]
fn float_compound_matches_mathematical_value() {
    let inputs = KernelInputs::<f32>::fixture(8);
    let mut result = inputs.output();
    Executor::<f32>::new()
        .run(Kernel::Compound, Strategy::Vectorized, inputs.left(), inputs.right(), &mut result)
        .unwrap();

    let k = std::f64::consts::PI;
    let (l, r) = (2.0f64, 2.0 + k);
    let expected = ((l * r + k) / k).sqrt();
    assert_relative_eq!(f64::from(result[2]), expected, max_relative = 1e-6);
}

#[test]
fn int_compound_truncates_and_clamps_negative_radicands() {
    let executor = Executor::<i32>::new();
    assert_eq!(executor.divisor(), -43);

    let left = [-10, -100, 10, 100, 0, 1];
    let right = [10, 100, 5, 50, 0, 0];
    // (-100-43)/-43 = 3 -> 1; (-10000-43)/-43 = 233 -> 15
    // (50-43)/-43 = 0; (5000-43)/-43 = -115 -> 0; (0-43)/-43 = 1 -> 1
    let expected = [1, 15, 0, 0, 1, 1];

    for (strategy, result) in run_all_strategies(&executor, Kernel::Compound, &left, &right) {
        assert_eq!(result, expected, "{strategy}");
    }
}

#[test]
fn custom_divisor_changes_compound() {
    let executor = Executor::<f32>::new().with_divisor(Divisor::new(1.0).unwrap());
    let mut result = vec![0.0f32; 1];
    executor.run(Kernel::Compound, Strategy::Sliced, &[3.0], &[5.0], &mut result).unwrap();
    assert_eq!(result[0], 16.0f32.sqrt());
}

#[test]
fn zero_divisor_is_rejected_up_front() {
    assert!(matches!(Divisor::new(0i32), Err(KernelError::ZeroDivisor)));
    assert!(matches!(Divisor::new(0.0f32), Err(KernelError::ZeroDivisor)));
}

// ============================================================================
// Strategy equivalence on fixtures
// ============================================================================

#[test]
fn every_backend_matches_scalar_on_bench_sized_fixtures() {
    let float_inputs = KernelInputs::<f32>::fixture(lanewise::fixtures::BENCH_ITEMS);
    let int_inputs = KernelInputs::<i32>::fixture(lanewise::fixtures::BENCH_ITEMS);

    for backend in available_backends() {
        let floats = VerificationSuite::new(
            Executor::<f32>::new().with_backend(backend).unwrap(),
            float_inputs.clone(),
        );
        let ints = VerificationSuite::new(
            Executor::<i32>::new().with_backend(backend).unwrap(),
            int_inputs.clone(),
        );

        for kernel in Kernel::ALL {
            for report in floats.check_kernel(kernel).unwrap() {
                assert!(report.passed(), "{backend}: {report}");
            }
            for report in ints.check_kernel(kernel).unwrap() {
                assert!(report.passed(), "{backend}: {report}");
            }
        }
    }
}

#[test]
fn length_mismatch_writes_nothing() {
    let mut result = vec![7.0f32; 3];
    let err = Executor::<f32>::new()
        .run(Kernel::Sum, Strategy::Vectorized, &[1.0; 4], &[1.0; 4], &mut result)
        .unwrap_err();

    assert!(matches!(err, KernelError::LengthMismatch { left: 4, right: 4, result: 3 }));
    assert_eq!(result, [7.0; 3]);
}

#[test]
fn rerun_into_dirty_output_overwrites_every_element() {
    let inputs = KernelInputs::<i32>::fixture(1001);
    let executor = Executor::<i32>::new();
    let mut reference = inputs.output();
    executor.run(Kernel::Sum, Strategy::Scalar, inputs.left(), inputs.right(), &mut reference).unwrap();

    let mut result = vec![i32::MIN; 1001];
    executor.run(Kernel::Sum, Strategy::Vectorized, inputs.left(), inputs.right(), &mut result).unwrap();
    assert!(verify(&result, &reference).unwrap().matches());
}

// ============================================================================
// Aligned memory
// ============================================================================

#[test]
fn aligned_buffers_start_on_boundary_plus_offset() {
    for alignment in [16, 32, 64] {
        let aligned = AlignedBuffer::<f32>::new(100, alignment, 0).unwrap();
        assert_eq!(aligned.start_address() % alignment, 0);

        let offset = AlignedBuffer::<f32>::new(100, alignment, 4).unwrap();
        assert_eq!(offset.start_address() % alignment, 4);
        assert!(offset.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn vectorized_matches_reference_aligned_and_misaligned() {
    let executor = Executor::<f32>::new();
    let alignment = executor.backend().register_width_bytes().max(4);
    let suite = VerificationSuite::new(executor, KernelInputs::fixture(4099));

    for kernel in Kernel::ALL {
        for offset in [0, 4, 8] {
            let report = suite.check_aligned(kernel, alignment, offset).unwrap();
            assert!(report.passed(), "{report}");
        }
    }
}

#[test]
fn aligned_inputs_feed_kernels_directly() {
    let inputs = lanewise::fixtures::AlignedInputs::<i32>::fixture(515, 64, 0).unwrap();
    let mut result = inputs.output().unwrap();
    Executor::<i32>::new()
        .run(Kernel::Compound, Strategy::Vectorized, inputs.left(), inputs.right(), &mut result)
        .unwrap();

    let mut reference = vec![0; 515];
    Executor::<i32>::new()
        .run(Kernel::Compound, Strategy::Scalar, inputs.left(), inputs.right(), &mut reference)
        .unwrap();
    assert_eq!(&result[..], &reference[..]);
}

// ============================================================================
// Region release
// ============================================================================

#[test]
fn release_is_idempotent_and_blocks_access() {
    let mut region = RegionHandle::<i32>::allocate(16, 32, 0).unwrap();
    region.set(3, 42).unwrap();
    assert_eq!(region.get(3).unwrap(), 42);

    assert_eq!(region.release(), ReleaseOutcome::Released);
    assert_eq!(region.release(), ReleaseOutcome::AlreadyReleased);
    assert!(!region.is_live());
    assert!(matches!(region.get(3), Err(KernelError::UseAfterRelease)));
    assert!(matches!(region.set(3, 1), Err(KernelError::UseAfterRelease)));
}

#[test]
fn releasing_one_region_leaves_others_intact() {
    let mut first = RegionHandle::<f32>::allocate(64, 64, 0).unwrap();
    let mut second = RegionHandle::<f32>::allocate(64, 64, 4).unwrap();
    second.buffer_mut().unwrap().fill_with(|i| i as f32);

    first.release();

    let buffer = second.buffer().unwrap();
    assert_eq!(buffer[63], 63.0);
    assert_eq!(buffer.start_address() % 64, 4);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_vectorized_float_matches_scalar(
        pairs in prop::collection::vec((0.0f32..1.0e4, 0.0f32..1.0e4), 0..300),
        offset in prop::sample::select(vec![0usize, 4, 8, 12]),
    ) {
        let (left, right): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();
        let inputs = KernelInputs::from_vecs(left, right).unwrap();
        let suite = VerificationSuite::new(Executor::<f32>::new(), inputs);

        for kernel in Kernel::ALL {
            for report in suite.check_kernel(kernel).unwrap() {
                prop_assert!(report.passed(), "{}", report);
            }
            let report = suite.check_aligned(kernel, 64, offset).unwrap();
            prop_assert!(report.passed(), "{}", report);
        }
    }

    #[test]
    fn prop_vectorized_int_matches_scalar(
        pairs in prop::collection::vec((any::<i32>(), any::<i32>()), 0..300),
        k in any::<i32>().prop_filter("non-zero", |k| *k != 0),
    ) {
        let (left, right): (Vec<i32>, Vec<i32>) = pairs.into_iter().unzip();
        let inputs = KernelInputs::from_vecs(left, right).unwrap();
        let executor = Executor::<i32>::new().with_divisor(Divisor::new(k).unwrap());
        let suite = VerificationSuite::new(executor, inputs);

        for kernel in Kernel::ALL {
            for report in suite.check_kernel(kernel).unwrap() {
                prop_assert!(report.passed(), "{}", report);
            }
        }
    }
}
