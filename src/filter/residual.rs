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

use crate::linalg::DVector;
use serde_derive::Serialize;
use std::fmt;

/// Residuals of a measurement update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Residual {
    /// Filter time of this residual
    pub time: f64,
    /// The prefit residual z - H * x_hat, computed with the a priori estimate
    pub prefit: DVector<f64>,
    /// The postfit residual z - H * x_hat, computed with the a posteriori estimate
    pub postfit: DVector<f64>,
    /// Mahalanobis distance of the prefit residual, i.e. `sqrt(y' * S^-1 * y)` where `S` is the
    /// innovation covariance. Compare against a Chi distribution with as many degrees of freedom
    /// as there are outputs.
    pub ratio: f64,
}

impl Residual {
    pub fn new(time: f64, prefit: DVector<f64>, postfit: DVector<f64>, ratio: f64) -> Self {
        Self {
            time,
            prefit,
            postfit,
            ratio,
        }
    }
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "t = {:.6}\tprefit: {:?}\tpostfit: {:?}\tratio: {:.3}",
            self.time,
            self.prefit.as_slice(),
            self.postfit.as_slice(),
            self.ratio
        )
    }
}
