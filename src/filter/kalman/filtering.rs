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

use super::{CovarianceUpdate, KalmanFilter, PredictionMode};
use crate::filter::{check_shape, FilterDynamicsSnafu, FilterError, Observer, Residual, StepSnapshot};
use crate::linalg::{DMatrix, DVector};
use crate::utils::symmetrize;
use snafu::ResultExt;

impl KalmanFilter {
    /// Time update: advances the clock and the plant, then computes the a priori estimate and
    /// covariance, P' = A_k * P * A_k' + Q.
    pub fn predict(&mut self) -> Result<(), FilterError> {
        let u = self.control_input();

        // The plant always moves from its own state, so the truth evolves independently of the estimate.
        let x_true = self.dynamics.state();
        self.dynamics
            .step(self.dt, &x_true, &u, &self.gains.q, &self.gains.r)
            .context(FilterDynamicsSnafu)?;
        self.t += self.dt;

        let model = self.dynamics.model();
        self.x_hat = match self.config.prediction {
            PredictionMode::TruthCopy => self.dynamics.state(),
            PredictionMode::ModelPropagation => model.a_k() * &self.x_hat + model.b_k() * &u,
        };

        let a_k = model.a_k();
        self.gains.p = a_k * &self.gains.p * a_k.transpose() + &self.gains.q;

        debug!(
            "t = {:.6}: a priori x_hat = {:?}",
            self.t,
            self.x_hat.as_slice()
        );
        Ok(())
    }

    /// Measurement update against the latest measurement of the plant.
    ///
    /// Recomputes the Kalman gain, then the a posteriori estimate and covariance. Returns the
    /// prefit and postfit residuals.
    ///
    /// # Errors
    /// `SingularInnovationCovariance` if H * P' * H' + R cannot be inverted (and no pseudo-inverse
    /// was configured). The estimate, covariance and gain are then left as they were.
    pub fn update(&mut self) -> Result<Residual, FilterError> {
        let z = self.dynamics.measurements();

        // Prefit, y = z - H * x_hat
        let prefit = &z - &self.gains.h * &self.x_hat;

        let s_k_inv = self.gains.update_k(self.config.innovation_inverse)?;
        let ratio = prefit.dot(&(&s_k_inv * &prefit)).abs().sqrt();

        // A posteriori state estimate
        self.x_hat += &self.gains.k * &prefit;

        // A posteriori covariance
        let n = self.x_hat.nrows();
        let i_kh = DMatrix::<f64>::identity(n, n) - &self.gains.k * self.dynamics.model().h_k();
        self.gains.p = match self.config.covariance_update {
            CovarianceUpdate::Standard => &i_kh * &self.gains.p,
            CovarianceUpdate::Joseph => symmetrize(
                &(&i_kh * &self.gains.p * i_kh.transpose()
                    + &self.gains.k * &self.gains.r * self.gains.k.transpose()),
            ),
        };

        // Postfit, only kept for diagnostics
        let postfit = &z - &self.gains.h * &self.x_hat;

        let residual = Residual::new(self.t, prefit, postfit, ratio);
        debug!("{residual}");
        self.last_residual = Some(residual.clone());
        Ok(residual)
    }

    /// Predicts then updates. Returns the elapsed time, the state estimate and the true state.
    pub fn step(&mut self) -> Result<StepSnapshot, FilterError> {
        self.predict()?;
        self.update()?;
        Ok((self.t, self.state_estimate(), self.true_state()))
    }

    /// Replaces the plant model and the gain state wholesale, e.g. from an outer tuning loop.
    ///
    /// The model matrices must already be discrete. Every shape is checked against the fixed
    /// dimensions before anything is replaced, so a failed call leaves the filter untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn set_gains(
        &mut self,
        p: DMatrix<f64>,
        a_k: DMatrix<f64>,
        b_k: DMatrix<f64>,
        h_k: DMatrix<f64>,
        d_k: DMatrix<f64>,
        k: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
    ) -> Result<(), FilterError> {
        let model = self.dynamics.model();
        let (n, m, o) = (
            model.num_states(),
            model.num_inputs(),
            model.num_outputs(),
        );

        check_shape("P", p.shape(), (n, n))?;
        check_shape("A_k", a_k.shape(), (n, n))?;
        check_shape("B_k", b_k.shape(), (n, m))?;
        check_shape("H_k", h_k.shape(), (o, n))?;
        check_shape("D_k", d_k.shape(), (o, m))?;
        check_shape("K", k.shape(), (n, o))?;
        check_shape("Q", q.shape(), (n, n))?;
        check_shape("R", r.shape(), (o, o))?;

        self.dynamics
            .set_gains(a_k, b_k, h_k.clone(), d_k)
            .context(FilterDynamicsSnafu)?;
        self.gains.h = h_k;
        self.gains.p = p;
        self.gains.k = k;
        self.gains.q = q;
        self.gains.r = r;

        info!("gains replaced at t = {:.6}", self.t);
        Ok(())
    }

    /// Restores the time, the state estimate and its covariance to their initial values.
    /// The noise covariances, the model and the plant state are left untouched.
    pub fn reset(&mut self) {
        self.t = 0.0;
        self.x_hat = self.x_hat_init.clone();
        self.gains.p = self.p_init.clone();
        self.last_residual = None;
        info!("Kalman filter reset");
    }
}

impl Observer for KalmanFilter {
    fn step(&mut self) -> Result<StepSnapshot, FilterError> {
        KalmanFilter::step(self)
    }

    fn state_estimate(&self) -> DVector<f64> {
        KalmanFilter::state_estimate(self)
    }

    fn reset(&mut self) {
        KalmanFilter::reset(self)
    }
}
