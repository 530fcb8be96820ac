/*
    Kalman tuner, linear state estimation for motion control
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::dynamics::DynamicsError;
use crate::linalg::DVector;
use snafu::prelude::*;

/// The linear Kalman filter.
pub mod kalman;
pub use kalman::KalmanFilter;

/// A fixed gain observer, useful as a baseline against the Kalman filter.
pub mod luenberger;
pub use luenberger::LuenbergerObserver;

mod residual;
pub use residual::Residual;

/// The outcome of one estimator step: elapsed time, state estimate, and true state of the plant.
pub type StepSnapshot = (f64, DVector<f64>, DVector<f64>);

/// The capability shared by all state estimators.
///
/// Callers only depend on this trait, so estimators can be swapped behind a `Box<dyn Observer>`.
pub trait Observer {
    /// Advances the estimator by one sample and returns a snapshot of the result.
    fn step(&mut self) -> Result<StepSnapshot, FilterError>;

    /// Returns a copy of the current state estimate.
    fn state_estimate(&self) -> DVector<f64>;

    /// Restores the estimator to its initial conditions.
    fn reset(&mut self);
}

#[allow(unused_imports)]
pub mod prelude {
    pub use super::kalman::*;
    pub use super::{FilterError, LuenbergerObserver, Observer, Residual, StepSnapshot};
    pub use crate::dynamics::{zero_order_hold, DiscreteModel, LinearDynamics, NoiseInjection};
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FilterError {
    /// A matrix or vector passed to the filter does not match its fixed dimensions.
    #[snafu(display("{what} has shape {got:?} but {expected:?} was expected"))]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// H * P' * H' + R has no inverse, and no pseudo-inverse fallback is configured.
    #[snafu(display("innovation covariance H*P*H' + R is singular, the Kalman gain cannot be computed"))]
    SingularInnovationCovariance,
    /// The plant rejected a step or an update of its state or model.
    #[snafu(display("plant model failed: {source}"))]
    FilterDynamics { source: DynamicsError },
}

pub(crate) fn check_shape(
    what: &'static str,
    got: (usize, usize),
    expected: (usize, usize),
) -> Result<(), FilterError> {
    ensure!(
        got == expected,
        DimensionMismatchSnafu {
            what,
            expected,
            got
        }
    );
    Ok(())
}

#[cfg(test)]
mod ut_filter_error {
    use super::*;

    #[test]
    fn plant_errors_are_wrapped() {
        let err = FilterError::FilterDynamics {
            source: DynamicsError::DimensionMismatch {
                what: "x",
                expected: (2, 1),
                got: (3, 1),
            },
        };
        assert_eq!(
            err.to_string(),
            "plant model failed: x has shape (3, 1) but (2, 1) was expected"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
