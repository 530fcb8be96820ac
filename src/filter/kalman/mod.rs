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

use super::{check_shape, FilterDynamicsSnafu, FilterError, Residual};
use crate::dynamics::{zero_order_hold, DiscreteModel, LinearDynamics, NoiseInjection};
use crate::linalg::{DMatrix, DVector};
use serde_derive::{Deserialize, Serialize};
use snafu::ResultExt;
use typed_builder::TypedBuilder;

pub mod filtering;

mod gains;
pub use gains::{GainState, GainsSnapshot};

/// Sample interval used when none is specified.
pub const DEFAULT_DT: f64 = 0.01;

/// How the a priori state estimate is obtained during `predict`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionMode {
    /// The plant is stepped and its new (true) state is copied into the estimate. The estimate
    /// therefore cannot drift from the truth during the prediction, which is only meaningful for
    /// tuning the gains against a simulated plant.
    #[default]
    TruthCopy,
    /// The estimate is propagated on its own, x_hat = A_k * x_hat + B_k * u, and only the
    /// measurement ties it back to the plant. This is the estimator one would fly.
    ModelPropagation,
}

/// Form of the a posteriori covariance update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceUpdate {
    /// P = (I - K * H) * P'
    #[default]
    Standard,
    /// Joseph form, P = (I - K * H) * P' * (I - K * H)' + K * R * K', then symmetrized.
    /// Keeps P symmetric positive semi-definite despite round-off, at the cost of a few products.
    Joseph,
}

/// How the innovation covariance is inverted when computing the gain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum InnovationInverse {
    /// A singular innovation covariance is reported as an error.
    #[default]
    Strict,
    /// Falls back to the pseudo-inverse, zeroing singular values smaller than `epsilon`.
    PseudoInverse { epsilon: f64 },
}

/// Options of the Kalman filter. The defaults reproduce the textbook recursion with the
/// truth-copy prediction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct KalmanConfig {
    #[builder(default)]
    pub prediction: PredictionMode,
    #[builder(default)]
    pub covariance_update: CovarianceUpdate,
    #[builder(default)]
    pub innovation_inverse: InnovationInverse,
    #[builder(default)]
    pub noise: NoiseInjection,
}

/// A discrete linear Kalman filter, tracking the plant it owns.
///
/// Let n be the number of states, m the number of inputs, and o the number of outputs. These are
/// fixed at construction from the shapes of the model.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    dynamics: LinearDynamics,
    gains: GainState,
    x_hat: DVector<f64>,
    x_hat_init: DVector<f64>,
    p_init: DMatrix<f64>,
    t: f64,
    dt: f64,
    config: KalmanConfig,
    last_residual: Option<Residual>,
}

impl KalmanFilter {
    /// Initializes a Kalman filter from a continuous-time model, discretized with a zero-order
    /// hold at `dt`.
    ///
    /// # Arguments
    /// * `x_hat_init` (n x 1): initial state estimate, also the initial state of the plant
    /// * `a` (n x n): continuous-time state transition matrix
    /// * `b` (n x m): continuous-time control matrix
    /// * `h` (o x n): observation matrix
    /// * `d` (o x m): feed-forward matrix
    /// * `p` (n x n): initial state covariance
    /// * `q` (n x n): process noise covariance
    /// * `r` (o x o): observation noise covariance
    /// * `dt`: sample interval, see `DEFAULT_DT`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x_hat_init: DVector<f64>,
        a: &DMatrix<f64>,
        b: &DMatrix<f64>,
        h: &DMatrix<f64>,
        d: &DMatrix<f64>,
        p: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        dt: f64,
    ) -> Result<Self, FilterError> {
        let model = zero_order_hold(a, b, h, d, dt).context(FilterDynamicsSnafu)?;
        Self::from_discrete(model, x_hat_init, p, q, r)
    }

    /// Initializes a Kalman filter from an already discrete model.
    pub fn from_discrete(
        model: DiscreteModel,
        x_hat_init: DVector<f64>,
        p: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
    ) -> Result<Self, FilterError> {
        check_shape("x_hat_init", x_hat_init.shape(), (model.num_states(), 1))?;
        let dt = model.dt();
        let gains = GainState::new(model.h_k().clone(), p, q, r)?;
        let dynamics =
            LinearDynamics::new(model, x_hat_init.clone()).context(FilterDynamicsSnafu)?;

        info!(
            "Kalman filter with {} states, {} inputs and {} outputs at dt = {dt}",
            dynamics.model().num_states(),
            dynamics.model().num_inputs(),
            dynamics.model().num_outputs()
        );

        Ok(Self {
            p_init: gains.p.clone(),
            x_hat: x_hat_init.clone(),
            x_hat_init,
            dynamics,
            gains,
            t: 0.0,
            dt,
            config: KalmanConfig::default(),
            last_residual: None,
        })
    }

    /// Builder-style setter of the filter options.
    pub fn with_config(mut self, config: KalmanConfig) -> Self {
        debug!("configuring Kalman filter with {config:?}");
        self.dynamics.set_noise(config.noise);
        self.config = config;
        self
    }

    pub fn config(&self) -> KalmanConfig {
        self.config
    }

    /// Time elapsed since construction or the last reset.
    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns a copy of the current state estimate.
    pub fn state_estimate(&self) -> DVector<f64> {
        self.x_hat.clone()
    }

    /// Returns a copy of the true state of the plant.
    pub fn true_state(&self) -> DVector<f64> {
        self.dynamics.state()
    }

    /// Residuals of the latest successful measurement update, if any since the last reset.
    pub fn last_residual(&self) -> Option<&Residual> {
        self.last_residual.as_ref()
    }

    pub fn gain_state(&self) -> &GainState {
        &self.gains
    }

    pub fn dynamics(&self) -> &LinearDynamics {
        &self.dynamics
    }

    /// Pins the true state of the plant, which also resets its measurement to H_k * x.
    /// The model and noise parameters can only be changed through `set_gains`.
    pub fn set_true_state(&mut self, x: DVector<f64>) -> Result<(), FilterError> {
        self.dynamics.set_state(x).context(FilterDynamicsSnafu)
    }

    /// Returns a copy of every gain and model matrix, for logging and tuning tools.
    pub fn gains(&self) -> GainsSnapshot {
        let model = self.dynamics.model();
        GainsSnapshot {
            dt: self.dt,
            t: self.t,
            p_k: self.gains.p.clone(),
            a_k: model.a_k().clone(),
            b_k: model.b_k().clone(),
            h_k: model.h_k().clone(),
            d_k: model.d_k().clone(),
            k_k: self.gains.k.clone(),
            q_k: self.gains.q.clone(),
            r_k: self.gains.r.clone(),
        }
    }

    /// Control input applied at each prediction. The filter is open-loop for now, so this is
    /// always zero.
    fn control_input(&self) -> DVector<f64> {
        DVector::zeros(self.dynamics.model().num_inputs())
    }
}
