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

/*! # kalman-tuner

A discrete-time linear Kalman filter for motion-control state estimation.

The continuous-time model (A, B, H, D) is discretized with a zero-order hold, then the filter
predicts and corrects its estimate of the plant state at every sample. The gains and covariances
are exposed so that the filter can be tuned, either programmatically or from YAML scenarios with
the `kftune` binary.
*/

/// Discretization of continuous-time models and the discrete-time plant.
pub mod dynamics;

/// The Kalman filter, and the observer interface it shares with other estimators.
pub mod filter;

/// Scenario configuration files.
pub mod io;

/// Matrix helpers shared by different modules.
pub mod utils;

pub use self::filter::{FilterError, KalmanFilter, Observer};

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}
