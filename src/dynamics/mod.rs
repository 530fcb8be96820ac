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

use snafu::Snafu;

/// Zero-order hold discretization of continuous-time linear models.
pub mod discrete;
pub use self::discrete::{zero_order_hold, DiscreteModel};

/// The discrete-time plant: holds the model, the true state and the latest measurement.
pub mod linear;
pub use self::linear::{LinearDynamics, NoiseInjection};

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// A matrix or vector does not have the shape implied by the model dimensions.
    #[snafu(display("{what} has shape {got:?} but {expected:?} was expected"))]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// A scalar parameter or a matrix structure is not acceptable.
    #[snafu(display("invalid {param}: {reason}"))]
    InvalidParameter { param: &'static str, reason: String },
}

/// Fails with `DimensionMismatch` unless `got` equals `expected`.
pub(crate) fn check_shape(
    what: &'static str,
    got: (usize, usize),
    expected: (usize, usize),
) -> Result<(), DynamicsError> {
    snafu::ensure!(
        got == expected,
        DimensionMismatchSnafu {
            what,
            expected,
            got
        }
    );
    Ok(())
}
