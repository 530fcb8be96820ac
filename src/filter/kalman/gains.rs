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

use crate::filter::{check_shape, FilterError, SingularInnovationCovarianceSnafu};
use super::InnovationInverse;
use crate::linalg::DMatrix;
use serde_derive::Serialize;
use snafu::OptionExt;
use std::fmt;

/// Covariances and gain of the Kalman filter, owned exclusively by it.
#[derive(Clone, Debug, PartialEq)]
pub struct GainState {
    /// State covariance (n x n)
    pub(crate) p: DMatrix<f64>,
    /// Process noise covariance (n x n)
    pub(crate) q: DMatrix<f64>,
    /// Observation noise covariance (o x o)
    pub(crate) r: DMatrix<f64>,
    /// Kalman gain (n x o)
    pub(crate) k: DMatrix<f64>,
    /// Observation matrix used for the residuals and the gain (o x n)
    pub(crate) h: DMatrix<f64>,
}

impl GainState {
    /// Initializes the gain state with a zero Kalman gain.
    pub fn new(
        h: DMatrix<f64>,
        p: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
    ) -> Result<Self, FilterError> {
        let (o, n) = h.shape();
        check_shape("P", p.shape(), (n, n))?;
        check_shape("Q", q.shape(), (n, n))?;
        check_shape("R", r.shape(), (o, o))?;
        Ok(Self {
            k: DMatrix::zeros(n, o),
            p,
            q,
            r,
            h,
        })
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.q
    }

    pub fn measurement_noise(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn kalman_gain(&self) -> &DMatrix<f64> {
        &self.k
    }

    pub fn observation(&self) -> &DMatrix<f64> {
        &self.h
    }

    /// Recomputes the Kalman gain from the current (a priori) covariance:
    /// K = P * H' * (H * P * H' + R)^-1
    ///
    /// Returns the inverse of the innovation covariance. The gain is left untouched on error.
    pub(crate) fn update_k(
        &mut self,
        inverse: InnovationInverse,
    ) -> Result<DMatrix<f64>, FilterError> {
        let h_t = self.h.transpose();
        let s_k = &self.h * &self.p * &h_t + &self.r;

        let s_k_inv = match inverse {
            InnovationInverse::Strict => s_k
                .try_inverse()
                .context(SingularInnovationCovarianceSnafu)?,
            InnovationInverse::PseudoInverse { epsilon } => match s_k.clone().try_inverse() {
                Some(s_k_inv) => s_k_inv,
                None => {
                    warn!("innovation covariance is singular, using its pseudo-inverse");
                    s_k.pseudo_inverse(epsilon)
                        .ok()
                        .context(SingularInnovationCovarianceSnafu)?
                }
            },
        };

        self.k = &self.p * h_t * &s_k_inv;
        Ok(s_k_inv)
    }
}

/// A read-only copy of all the numeric state of a Kalman filter at a given time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GainsSnapshot {
    pub dt: f64,
    /// Filter time when this snapshot was taken
    pub t: f64,
    pub p_k: DMatrix<f64>,
    pub a_k: DMatrix<f64>,
    pub b_k: DMatrix<f64>,
    pub h_k: DMatrix<f64>,
    pub d_k: DMatrix<f64>,
    pub k_k: DMatrix<f64>,
    pub q_k: DMatrix<f64>,
    pub r_k: DMatrix<f64>,
}

impl fmt::Display for GainsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "gains at t = {:.6} (dt = {})", self.t, self.dt)?;
        for (name, mat) in [
            ("P", &self.p_k),
            ("K", &self.k_k),
            ("Q", &self.q_k),
            ("R", &self.r_k),
            ("A_k", &self.a_k),
            ("B_k", &self.b_k),
            ("H_k", &self.h_k),
            ("D_k", &self.d_k),
        ] {
            write!(f, "{name} ={mat}")?;
        }
        Ok(())
    }
}
