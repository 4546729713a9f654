//! Embedded Runge-Kutta-Fehlberg 4(5) stepper for autonomous planar systems.
//!
//! One step evaluates six stages and compares the fourth- and fifth-order
//! solutions. The step is accepted when
//!
//! ```text
//! |y5 - y4| <= tolerance * max(|y|_inf, 1)
//! ```
//!
//! and the solution advances with the fifth-order estimate. The next step is
//! `h * safety * ratio^(-1/5)`, clamped to `[min_factor, max_factor]`, and is
//! never allowed to grow right after a rejection.
use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const A: [[f64; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 4.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 32.0, 9.0 / 32.0, 0.0, 0.0, 0.0],
    [1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0, 0.0, 0.0],
    [439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0, 0.0],
    [-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
];

const B5: [f64; 6] = [
    16.0 / 135.0,
    0.0,
    6656.0 / 12825.0,
    28561.0 / 56430.0,
    -9.0 / 50.0,
    2.0 / 55.0,
];

/// `B5 - B4`.
const E: [f64; 6] = [
    1.0 / 360.0,
    0.0,
    -128.0 / 4275.0,
    -2197.0 / 75240.0,
    1.0 / 50.0,
    2.0 / 55.0,
];

/// Step-size control of the adaptive stepper.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepControl {
    /// Damping applied to the optimal step estimate.
    pub safety: f64,
    /// Smallest factor a step may shrink by.
    pub min_factor: f64,
    /// Largest factor a step may grow by.
    pub max_factor: f64,
    /// Smallest step, relative to the output step, before integration gives up.
    pub min_step: f64,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
            min_step: 1e-10,
        }
    }
}

impl StepControl {
    pub fn validate(&self) -> Result<()> {
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "step safety must be in (0, 1], got {}",
                self.safety
            )));
        }
        if !(self.min_factor > 0.0 && self.min_factor < 1.0 && self.max_factor > 1.0) {
            return Err(Error::InvalidArgument(format!(
                "step factors must satisfy 0 < min < 1 < max, got {} and {}",
                self.min_factor, self.max_factor
            )));
        }
        if !(self.min_step > 0.0 && self.min_step < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "relative minimum step must be in (0, 1), got {}",
                self.min_step
            )));
        }
        Ok(())
    }

    fn factor(&self, ratio: f64, after_reject: bool) -> f64 {
        let factor = if ratio == 0.0 {
            self.max_factor
        } else {
            (self.safety * ratio.powf(-0.2)).clamp(self.min_factor, self.max_factor)
        };
        if after_reject {
            factor.min(1.0)
        } else {
            factor
        }
    }
}

/// Right-hand side evaluated at one stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Slope {
    Value(DVec2),
    /// The stage left the domain or hit an unknown value.
    Outside,
    /// The derivative is undefined (non-finite, or no direction to follow).
    Stalled,
}

/// Result of one attempted step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Step {
    Accepted { y: DVec2, next_h: f64 },
    Rejected { next_h: f64 },
    Outside,
    Stalled,
}

/// Attempts one step of size `h` from `y`.
pub(crate) fn step(
    f: impl Fn(DVec2) -> Slope,
    y: DVec2,
    h: f64,
    tolerance: f64,
    control: &StepControl,
    after_reject: bool,
) -> Step {
    let mut k = [DVec2::ZERO; 6];
    for i in 0..6 {
        let mut yi = y;
        for (j, kj) in k.iter().enumerate().take(i) {
            yi += h * A[i][j] * *kj;
        }
        k[i] = match f(yi) {
            Slope::Value(v) => v,
            Slope::Outside => return Step::Outside,
            Slope::Stalled => return Step::Stalled,
        };
    }

    let mut y5 = y;
    let mut err = DVec2::ZERO;
    for i in 0..6 {
        y5 += h * B5[i] * k[i];
        err += h * E[i] * k[i];
    }
    if !y5.is_finite() || !err.is_finite() {
        return Step::Stalled;
    }

    let scale = tolerance * y.abs().max_element().max(y5.abs().max_element()).max(1.0);
    let ratio = err.length() / scale;
    let next_h = h * control.factor(ratio, after_reject);
    if ratio <= 1.0 {
        Step::Accepted { y: y5, next_h }
    } else {
        Step::Rejected { next_h }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: [f64; 6] = [0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0];

    fn rotation(y: DVec2) -> Slope {
        Slope::Value(DVec2::new(-y.y, y.x))
    }

    #[test]
    fn tableau_rows_sum_to_nodes() {
        for i in 0..6 {
            let sum: f64 = A[i].iter().sum();
            assert!((sum - C[i]).abs() < 1e-12, "row {i}");
        }
        assert!((B5.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(E.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn constant_field_is_integrated_exactly() {
        let control = StepControl::default();
        let f = |_: DVec2| Slope::Value(DVec2::new(2.0, -1.0));
        match step(f, DVec2::ZERO, 0.5, 1e-9, &control, false) {
            Step::Accepted { y, next_h } => {
                assert!((y - DVec2::new(1.0, -0.5)).length() < 1e-14);
                assert_eq!(next_h, 0.5 * control.max_factor);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn large_steps_are_rejected_and_shrunk() {
        let control = StepControl::default();
        match step(rotation, DVec2::X, 2.0, 1e-10, &control, false) {
            Step::Rejected { next_h } => {
                assert!(next_h < 2.0);
                assert!(next_h >= 2.0 * control.min_factor);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quarter_turn_of_a_rotation_is_accurate() {
        let control = StepControl::default();
        let mut y = DVec2::X;
        let mut t = 0.0;
        let mut h: f64 = 0.1;
        let mut rejected = false;
        let end = std::f64::consts::FRAC_PI_2;
        while t < end - 1e-15 {
            let h_try = h.min(end - t);
            match step(rotation, y, h_try, 1e-10, &control, rejected) {
                Step::Accepted { y: next, next_h } => {
                    y = next;
                    t += h_try;
                    h = next_h;
                    rejected = false;
                }
                Step::Rejected { next_h } => {
                    h = next_h;
                    rejected = true;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!((y - DVec2::Y).length() < 1e-8);
    }

    #[test]
    fn no_growth_after_rejection() {
        let control = StepControl::default();
        assert_eq!(control.factor(0.0, true), 1.0);
        assert_eq!(control.factor(1e6, false), control.min_factor);
    }

    #[test]
    fn outside_and_stalled_stages_abort_the_step() {
        let control = StepControl::default();
        let outside = |y: DVec2| {
            if y.x > 0.3 {
                Slope::Outside
            } else {
                Slope::Value(DVec2::X)
            }
        };
        assert_eq!(step(outside, DVec2::ZERO, 1.0, 1e-6, &control, false), Step::Outside);
        let stalled = |_: DVec2| Slope::Stalled;
        assert_eq!(step(stalled, DVec2::ZERO, 1.0, 1e-6, &control, false), Step::Stalled);
        assert!(StepControl {
            safety: 1.5,
            ..control
        }
        .validate()
        .is_err());
    }
}
