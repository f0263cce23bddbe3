//! Adaptive Dormand-Prince 5(4) integration.
//!
//! Agents integrate their dynamics over one control interval at a time, with
//! the control input held constant across the interval. Only the state at the
//! interval's end is reported; step-size selection inside the interval uses
//! the embedded 4th-order error estimate.

use nalgebra::DVector;
use thiserror::Error;

/// Non-convergence of the adaptive solver. Never retried; the caller decides
/// what to do with the partial trajectory.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// The step budget ran out before the target time was reached.
    #[error("step budget of {max_steps} exhausted at t={reached:.6} (target t={target:.6})")]
    MaxStepsExceeded {
        max_steps: usize,
        reached: f64,
        target: f64,
    },

    /// Error control drove the step size below the minimum, typically because
    /// the dynamics are too stiff or produce non-finite derivatives.
    #[error("step size underflow at t={reached:.6} (h={step:.3e})")]
    StepSizeUnderflow { reached: f64, step: f64 },
}

/// Tolerances and step bounds for the adaptive solver.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Relative tolerance
    pub rtol: f64,

    /// Absolute tolerance
    pub atol: f64,

    /// Smallest step the controller may take
    pub min_step: f64,

    /// Budget of internal steps (accepted and rejected) per interval
    pub max_steps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-12,
            min_step: 1e-12,
            max_steps: 500,
        }
    }
}

/// Integrates `dx/dt = f(t, x)` from `(t0, x0)` to `t1 > t0` and returns the
/// state at `t1`, exact to the configured tolerance.
pub fn integrate<F>(
    f: F,
    t0: f64,
    x0: &DVector<f64>,
    t1: f64,
    config: &SolverConfig,
) -> Result<DVector<f64>, SolverError>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    debug_assert!(t1 > t0, "integration interval must be forward in time");

    let mut t = t0;
    let mut x = x0.clone();
    let mut h = ((t1 - t0) / 100.0).max(config.min_step);
    let mut k1 = f(t, &x);
    let mut steps = 0;

    while t < t1 {
        if steps >= config.max_steps {
            return Err(SolverError::MaxStepsExceeded {
                max_steps: config.max_steps,
                reached: t,
                target: t1,
            });
        }
        steps += 1;

        // Clamp to land on t1 exactly; a clamped final step may legitimately
        // be smaller than min_step.
        let step = h.min(t1 - t);
        if step < config.min_step && h < t1 - t {
            return Err(SolverError::StepSizeUnderflow { reached: t, step });
        }

        let (x_new, x_err, k7) = rk_step(&f, t, &x, &k1, step);
        let err = error_norm(&x_err, &x, &x_new, config);

        if err.is_finite() && err <= 1.0 {
            t += step;
            x = x_new;
            k1 = k7; // FSAL: the last stage is the next step's first stage
        }

        h = next_step(step, err);
    }

    Ok(x)
}

/// One Dormand-Prince step: returns the 5th-order solution, the embedded
/// error estimate, and the final stage for FSAL reuse.
fn rk_step<F>(
    f: &F,
    t: f64,
    x: &DVector<f64>,
    k1: &DVector<f64>,
    h: f64,
) -> (DVector<f64>, DVector<f64>, DVector<f64>)
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    const C2: f64 = 1.0 / 5.0;
    const C3: f64 = 3.0 / 10.0;
    const C4: f64 = 4.0 / 5.0;
    const C5: f64 = 8.0 / 9.0;

    const A21: f64 = 1.0 / 5.0;
    const A31: f64 = 3.0 / 40.0;
    const A32: f64 = 9.0 / 40.0;
    const A41: f64 = 44.0 / 45.0;
    const A42: f64 = -56.0 / 15.0;
    const A43: f64 = 32.0 / 9.0;
    const A51: f64 = 19372.0 / 6561.0;
    const A52: f64 = -25360.0 / 2187.0;
    const A53: f64 = 64448.0 / 6561.0;
    const A54: f64 = -212.0 / 729.0;
    const A61: f64 = 9017.0 / 3168.0;
    const A62: f64 = -355.0 / 33.0;
    const A63: f64 = 46732.0 / 5247.0;
    const A64: f64 = 49.0 / 176.0;
    const A65: f64 = -5103.0 / 18656.0;

    // 5th order weights
    const B1: f64 = 35.0 / 384.0;
    const B3: f64 = 500.0 / 1113.0;
    const B4: f64 = 125.0 / 192.0;
    const B5: f64 = -2187.0 / 6784.0;
    const B6: f64 = 11.0 / 84.0;

    // Difference against the embedded 4th order weights
    const E1: f64 = 71.0 / 57600.0;
    const E3: f64 = -71.0 / 16695.0;
    const E4: f64 = 71.0 / 1920.0;
    const E5: f64 = -17253.0 / 339200.0;
    const E6: f64 = 22.0 / 525.0;
    const E7: f64 = -1.0 / 40.0;

    let x2 = x + k1 * (h * A21);
    let k2 = f(t + C2 * h, &x2);

    let x3 = x + k1 * (h * A31) + &k2 * (h * A32);
    let k3 = f(t + C3 * h, &x3);

    let x4 = x + k1 * (h * A41) + &k2 * (h * A42) + &k3 * (h * A43);
    let k4 = f(t + C4 * h, &x4);

    let x5 = x + k1 * (h * A51) + &k2 * (h * A52) + &k3 * (h * A53) + &k4 * (h * A54);
    let k5 = f(t + C5 * h, &x5);

    let x6 = x
        + k1 * (h * A61)
        + &k2 * (h * A62)
        + &k3 * (h * A63)
        + &k4 * (h * A64)
        + &k5 * (h * A65);
    let k6 = f(t + h, &x6);

    let x_new = x + k1 * (h * B1) + &k3 * (h * B3) + &k4 * (h * B4) + &k5 * (h * B5) + &k6 * (h * B6);

    let k7 = f(t + h, &x_new);

    let x_err = k1 * (h * E1)
        + &k3 * (h * E3)
        + &k4 * (h * E4)
        + &k5 * (h * E5)
        + &k6 * (h * E6)
        + &k7 * (h * E7);

    (x_new, x_err, k7)
}

/// Scaled RMS error norm; a value <= 1 means the step is within tolerance.
fn error_norm(x_err: &DVector<f64>, x: &DVector<f64>, x_new: &DVector<f64>, config: &SolverConfig) -> f64 {
    let n = x_err.len();
    if n == 0 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 0..n {
        let scale = config.atol + config.rtol * x[i].abs().max(x_new[i].abs());
        sum += (x_err[i] / scale).powi(2);
    }

    (sum / n as f64).sqrt()
}

/// Step size for the next attempt, grown or shrunk by the local error.
fn next_step(h: f64, err: f64) -> f64 {
    const SAFETY: f64 = 0.9;
    const MIN_FACTOR: f64 = 0.2;
    const MAX_FACTOR: f64 = 10.0;

    if !err.is_finite() {
        return h * MIN_FACTOR;
    }
    if err == 0.0 {
        return h * MAX_FACTOR;
    }

    let factor = (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR);
    h * factor
}
