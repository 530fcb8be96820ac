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

use super::{check_shape, DiscreteModel, DynamicsError, InvalidParameterSnafu};
use crate::linalg::{DMatrix, DVector};
use approx::relative_eq;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

/// Whether the plant samples process and measurement noise when stepping.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseInjection {
    /// Deterministic propagation: the noise covariances passed to `step` are accepted but unused.
    #[default]
    Disabled,
    /// Adds w ~ N(0, Q) to the state and v ~ N(0, R) to the measurement, drawn from a PCG
    /// generator seeded with this value.
    Seeded(u64),
}

/// The discrete-time plant.
///
/// Holds the discrete model, the true (simulated) state and the latest measurement. In a real
/// motion-control loop the measurement would come from the sensors instead.
#[derive(Clone, Debug)]
pub struct LinearDynamics {
    model: DiscreteModel,
    state: DVector<f64>,
    measurement: DVector<f64>,
    rng: Option<Pcg64Mcg>,
}

impl LinearDynamics {
    /// Initializes the plant at `x_init`, with the matching noise-free measurement.
    pub fn new(model: DiscreteModel, x_init: DVector<f64>) -> Result<Self, DynamicsError> {
        check_shape("x_init", x_init.shape(), (model.num_states(), 1))?;
        let measurement = model.h_k() * &x_init;
        Ok(Self {
            model,
            state: x_init,
            measurement,
            rng: None,
        })
    }

    /// Builder-style setter for the noise injection.
    pub fn with_noise(mut self, noise: NoiseInjection) -> Self {
        self.set_noise(noise);
        self
    }

    pub fn set_noise(&mut self, noise: NoiseInjection) {
        self.rng = match noise {
            NoiseInjection::Disabled => None,
            NoiseInjection::Seeded(seed) => Some(Pcg64Mcg::seed_from_u64(seed)),
        };
    }

    /// Propagates `x` by one sample with the input `u` and stores the result as the new state,
    /// then recomputes the measurement:
    ///
    /// ```text
    /// x' = A_k x + B_k u (+ w)
    ///  z = H_k x' + D_k u (+ v)
    /// ```
    ///
    /// `q` and `r` are only sampled when noise injection is enabled.
    ///
    /// # Errors
    /// + `InvalidParameter` if `dt` is not the interval the model was discretized for;
    /// + `DimensionMismatch` if any of the vectors or covariances has the wrong shape.
    pub fn step(
        &mut self,
        dt: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        q: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<(), DynamicsError> {
        ensure!(
            dt > 0.0 && relative_eq!(dt, self.model.dt(), max_relative = 1e-9),
            InvalidParameterSnafu {
                param: "dt",
                reason: format!(
                    "model was discretized for dt = {} but stepped with {dt}",
                    self.model.dt()
                ),
            }
        );

        let n = self.model.num_states();
        let o = self.model.num_outputs();
        check_shape("x", x.shape(), (n, 1))?;
        check_shape("u", u.shape(), (self.model.num_inputs(), 1))?;
        check_shape("Q", q.shape(), (n, n))?;
        check_shape("R", r.shape(), (o, o))?;

        let mut next = self.model.a_k() * x + self.model.b_k() * u;
        if let Some(rng) = self.rng.as_mut() {
            next += gaussian_sample(q, rng);
        }

        let mut measurement = self.model.h_k() * &next + self.model.d_k() * u;
        if let Some(rng) = self.rng.as_mut() {
            measurement += gaussian_sample(r, rng);
        }

        self.state = next;
        self.measurement = measurement;
        Ok(())
    }

    /// Returns a copy of the current true state.
    pub fn state(&self) -> DVector<f64> {
        self.state.clone()
    }

    /// Returns a copy of the latest measurement.
    pub fn measurements(&self) -> DVector<f64> {
        self.measurement.clone()
    }

    /// Overrides the true state, e.g. to pin the plant at a known value, and recomputes the
    /// noise-free measurement from it.
    pub fn set_state(&mut self, x: DVector<f64>) -> Result<(), DynamicsError> {
        check_shape("x", x.shape(), (self.model.num_states(), 1))?;
        self.measurement = self.model.h_k() * &x;
        self.state = x;
        Ok(())
    }

    /// Replaces the discrete model matrices wholesale. These must already be discretized for the
    /// same `dt`. On a shape mismatch, the model is left untouched.
    pub fn set_gains(
        &mut self,
        a_k: DMatrix<f64>,
        b_k: DMatrix<f64>,
        h_k: DMatrix<f64>,
        d_k: DMatrix<f64>,
    ) -> Result<(), DynamicsError> {
        self.model.replace(a_k, b_k, h_k, d_k)
    }

    pub fn model(&self) -> &DiscreteModel {
        &self.model
    }
}

/// Draws a sample of N(0, cov).
///
/// The square root of the covariance comes from its symmetric eigendecomposition, so positive
/// semi-definite covariances (e.g. a zero process noise) are supported.
fn gaussian_sample<R: Rng>(cov: &DMatrix<f64>, rng: &mut R) -> DVector<f64> {
    let eigen = cov.clone().symmetric_eigen();
    let sqrt_vals = eigen.eigenvalues.map(|lambda| lambda.max(0.0).sqrt());
    let sqrt_cov = &eigen.eigenvectors * DMatrix::from_diagonal(&sqrt_vals);
    let white = DVector::from_fn(cov.nrows(), |_, _| rng.sample::<f64, _>(StandardNormal));
    sqrt_cov * white
}
