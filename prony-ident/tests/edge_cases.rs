//! Edge case and numerical stability tests.

use approx::assert_abs_diff_eq;
use faer::Mat;
use prony_ident::*;

const DT: f64 = 0.05;

fn make_signal(n_time: usize, n_sig: usize) -> Mat<f64> {
    Mat::from_fn(n_time, n_sig, |k, j| {
        let t = k as f64 * DT;
        (1.0 + j as f64) * (-0.5 * t).exp() * (2.0 * std::f64::consts::PI * t).cos()
    })
}

fn control(modes: f64) -> Vec<f64> {
    let mut c = vec![0.0; CONTROL_LEN];
    c[0] = modes;
    c
}

fn argument_error(inputs: &ProblemInputs) -> Option<ArgumentError> {
    identify(inputs).err().and_then(|e| e.argument())
}

// ============================================================================
// Edge cases: signal matrix limits
// ============================================================================

#[test]
fn too_many_signal_columns() {
    let inputs = ProblemInputs::free_response(make_signal(50, 21), DT, control(2.0));
    assert_eq!(argument_error(&inputs), Some(ArgumentError::TooManySignals));
    assert_eq!(ArgumentError::TooManySignals.code(), 5);
}

#[test]
fn twenty_signal_columns_accepted() {
    let inputs = ProblemInputs::free_response(make_signal(50, 20), DT, control(2.0));
    assert!(identify(&inputs).is_ok());
}

#[test]
fn too_many_samples() {
    let inputs = ProblemInputs::free_response(make_signal(8193, 1), DT, control(2.0));
    assert_eq!(argument_error(&inputs), Some(ArgumentError::TooManySamples));
}

#[test]
fn non_finite_samples() {
    let mut data = make_signal(50, 1);
    data[(10, 0)] = f64::NAN;
    let inputs = ProblemInputs::free_response(data, DT, control(2.0));
    assert_eq!(argument_error(&inputs), Some(ArgumentError::NonFiniteInput));
}

// ============================================================================
// Edge cases: known modes and mode counts
// ============================================================================

#[test]
fn known_mode_rows_over_limit() {
    let mut inputs = ProblemInputs::free_response(make_signal(400, 1), DT, control(0.0));
    inputs.known_modes = Mat::from_fn(129, 2, |i, j| if j == 0 { -1.0 } else { i as f64 });
    assert_eq!(
        argument_error(&inputs),
        Some(ArgumentError::TooManyKnownModes)
    );
}

#[test]
fn additional_plus_known_over_limit() {
    let mut inputs = ProblemInputs::free_response(make_signal(400, 1), DT, control(127.0));
    inputs.known_modes = Mat::from_fn(2, 2, |i, j| if j == 0 { -1.0 } else { i as f64 });
    assert_eq!(argument_error(&inputs), Some(ArgumentError::TooManyModes));
}

#[test]
fn known_mode_matrix_needs_two_columns() {
    let mut inputs = ProblemInputs::free_response(make_signal(100, 1), DT, control(2.0));
    inputs.known_modes = Mat::zeros(1, 3);
    assert_eq!(
        argument_error(&inputs),
        Some(ArgumentError::KnownModeColumns)
    );
}

// ============================================================================
// Edge cases: windows
// ============================================================================

#[test]
fn fit_length_below_minimum() {
    let mut inputs = ProblemInputs::free_response(make_signal(100, 1), DT, control(2.0));
    inputs.windows[(1, 0)] = 2.0;
    assert_eq!(argument_error(&inputs), Some(ArgumentError::FitTooShort));
}

#[test]
fn window_overrun() {
    let mut inputs = ProblemInputs::free_response(make_signal(100, 1), DT, control(2.0));
    inputs.windows[(0, 0)] = 50.0;
    inputs.windows[(1, 0)] = 60.0;
    assert_eq!(argument_error(&inputs), Some(ArgumentError::WindowOverrun));
}

#[test]
fn negative_shift_clamps_to_zero() {
    let mut a = ProblemInputs::free_response(make_signal(100, 1), DT, control(2.0));
    a.windows[(0, 0)] = -7.0;
    let b = ProblemInputs::free_response(make_signal(100, 1), DT, control(2.0));
    let (ta, tb) = (identify(&a).unwrap().table(), identify(&b).unwrap().table());
    for i in 0..ta.nrows() {
        for j in 0..ta.ncols() {
            assert_abs_diff_eq!(ta[(i, j)], tb[(i, j)], epsilon = 1e-12);
        }
    }
}

#[test]
fn minimum_fit_length_single_mode() {
    // three samples of a pure exponential fit exactly by one real mode
    let data = Mat::from_fn(3, 1, |k, _| (-0.2 * k as f64).exp());
    let id = identify(&ProblemInputs::free_response(data, 1.0, control(1.0))).unwrap();
    let m = id.model().unwrap().modes(0)[0];
    assert_abs_diff_eq!(m.damping, -0.2, epsilon = 1e-9);
    assert_abs_diff_eq!(m.frequency, 0.0, epsilon = 1e-9);
}

#[test]
fn huge_fit_length_is_window_overrun() {
    let mut inputs = ProblemInputs::free_response(make_signal(100, 1), DT, control(2.0));
    inputs.windows[(0, 0)] = 5.0;
    inputs.windows[(1, 0)] = 1e30;
    assert_eq!(argument_error(&inputs), Some(ArgumentError::WindowOverrun));
}

#[test]
fn huge_mode_count_is_too_many_modes() {
    let mut inputs = ProblemInputs::free_response(make_signal(100, 1), DT, control(1e30));
    inputs.known_modes = Mat::from_fn(1, 2, |_, j| if j == 0 { -0.5 } else { 0.0 });
    assert_eq!(argument_error(&inputs), Some(ArgumentError::TooManyModes));
}

#[test]
fn huge_prediction_order_is_rejected() {
    for method in [1.0, 2.0] {
        let mut c = control(2.0);
        c[2] = 1e30;
        c[4] = method;
        let inputs = ProblemInputs::free_response(make_signal(100, 1), DT, c);
        assert_eq!(argument_error(&inputs), Some(ArgumentError::InvalidSelector));
    }
}

#[test]
fn prediction_order_within_limit_but_beyond_signal_is_fatal() {
    let mut c = control(2.0);
    c[2] = 8192.0;
    c[4] = 2.0;
    let id = identify(&ProblemInputs::free_response(make_signal(100, 1), DT, c)).unwrap();
    assert_eq!(id.fatal().map(|d| d.code), Some(1));
}

// ============================================================================
// Edge cases: scaling
// ============================================================================

#[test]
fn zero_signal_with_scaling_is_not_divided() {
    let mut c = control(2.0);
    c[1] = 1.0;
    let mut data = make_signal(100, 2);
    for k in 0..100 {
        data[(k, 1)] = 0.0;
    }
    let id = identify(&ProblemInputs::free_response(data, DT, c)).unwrap();
    let model = id.model().unwrap();
    assert_eq!(model.signals[1].scale, 1.0);
    assert!(model.modes(1).iter().all(|m| m.amplitude.is_finite()));
}

#[test]
fn scaled_and_unscaled_fits_agree() {
    let data = Mat::from_fn(150, 1, |k, _| {
        let t = k as f64 * DT;
        250.0 * (-0.3 * t).exp() * (4.0 * t + 0.4).cos()
    });
    let plain = identify(&ProblemInputs::free_response(data.clone(), DT, control(2.0))).unwrap();
    let mut c = control(2.0);
    c[1] = 1.0;
    let scaled = identify(&ProblemInputs::free_response(data, DT, c)).unwrap();

    let (a, b) = (plain.model().unwrap(), scaled.model().unwrap());
    for (x, y) in a.modes(0).iter().zip(b.modes(0)) {
        assert_abs_diff_eq!(x.amplitude, y.amplitude, epsilon = 1e-6);
        assert_abs_diff_eq!(x.damping, y.damping, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(a.modes(0)[0].amplitude, 250.0, epsilon = 1e-6);
}

// ============================================================================
// Numerical stability: order and trimming
// ============================================================================

#[test]
fn prediction_order_too_large_is_fatal() {
    let mut c = control(2.0);
    c[2] = 60.0;
    let id = identify(&ProblemInputs::free_response(make_signal(40, 1), DT, c)).unwrap();
    assert_eq!(id.fatal().map(|d| d.code), Some(1));
    assert!(id.model().is_none());
    assert_eq!(id.control().achieved_modes, 0);
}

#[test]
fn damping_cutoff_removing_everything_is_fatal() {
    let mut c = control(2.0);
    c[11] = 0.1;
    let id = identify(&ProblemInputs::free_response(make_signal(100, 1), DT, c)).unwrap();
    let fatal = id.fatal().unwrap();
    assert_eq!(fatal.code, 6);
    assert_eq!(fatal.kind, DiagnosticKind::Fatal);
}

#[test]
fn surplus_prediction_order_keeps_requested_count() {
    let mut c = control(2.0);
    c[2] = 8.0;
    let id = identify(&ProblemInputs::free_response(make_signal(200, 1), DT, c)).unwrap();
    let model = id.model().unwrap();
    assert_eq!(model.modes(0).len(), 2);
    assert_eq!(id.control().to_vector()[2], 8.0);
    for m in model.modes(0) {
        assert_abs_diff_eq!(m.damping, -0.5, epsilon = 1e-6);
    }
}
