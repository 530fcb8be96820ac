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

use super::{check_shape, FilterDynamicsSnafu, FilterError, Observer, StepSnapshot};
use crate::dynamics::{DiscreteModel, LinearDynamics};
use crate::linalg::{DMatrix, DVector};
use snafu::ResultExt;

/// A Luenberger observer: a state estimator with a fixed, hand-tuned gain L.
///
/// x_hat' = A_k * x_hat + B_k * u + L * (z - H_k * x_hat - D_k * u)
///
/// The estimation error decays as (A_k - L * H_k)^k, so L must place the eigenvalues of that
/// matrix inside the unit circle.
#[derive(Clone, Debug)]
pub struct LuenbergerObserver {
    dynamics: LinearDynamics,
    gain: DMatrix<f64>,
    x_hat: DVector<f64>,
    x_hat_init: DVector<f64>,
    t: f64,
}

impl LuenbergerObserver {
    /// Initializes the observer and its plant at `x_hat_init`, with an observer gain L (n x o).
    pub fn new(
        model: DiscreteModel,
        x_hat_init: DVector<f64>,
        gain: DMatrix<f64>,
    ) -> Result<Self, FilterError> {
        check_shape(
            "L",
            gain.shape(),
            (model.num_states(), model.num_outputs()),
        )?;
        let dynamics =
            LinearDynamics::new(model, x_hat_init.clone()).context(FilterDynamicsSnafu)?;
        Ok(Self {
            dynamics,
            gain,
            x_hat: x_hat_init.clone(),
            x_hat_init,
            t: 0.0,
        })
    }

    /// Pins the true state of the plant, which also resets its measurement.
    pub fn set_true_state(&mut self, x: DVector<f64>) -> Result<(), FilterError> {
        self.dynamics.set_state(x).context(FilterDynamicsSnafu)
    }

    pub fn time(&self) -> f64 {
        self.t
    }
}

impl Observer for LuenbergerObserver {
    fn step(&mut self) -> Result<StepSnapshot, FilterError> {
        let model = self.dynamics.model();
        let (n, o) = (model.num_states(), model.num_outputs());
        let u = DVector::zeros(model.num_inputs());

        // Correct with the measurement of the current sample, then propagate
        let z = self.dynamics.measurements();
        let innovation = z - model.h_k() * &self.x_hat - model.d_k() * &u;
        let x_hat = model.a_k() * &self.x_hat + model.b_k() * &u + &self.gain * innovation;

        let x_true = self.dynamics.state();
        let dt = model.dt();
        self.dynamics
            .step(dt, &x_true, &u, &DMatrix::zeros(n, n), &DMatrix::zeros(o, o))
            .context(FilterDynamicsSnafu)?;

        self.x_hat = x_hat;
        self.t += dt;
        Ok((self.t, self.x_hat.clone(), self.dynamics.state()))
    }

    fn state_estimate(&self) -> DVector<f64> {
        self.x_hat.clone()
    }

    fn reset(&mut self) {
        self.t = 0.0;
        self.x_hat = self.x_hat_init.clone();
    }
}
