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

use super::{ConfigError, ConfigRepr, MatrixSerde};
use crate::filter::kalman::{KalmanConfig, KalmanFilter, DEFAULT_DT};
use crate::linalg::DVector;
use serde_derive::{Deserialize, Serialize};

/// A Kalman filter tuning scenario, as written in YAML.
///
/// ```yaml
/// dt: 0.01
/// steps: 500
/// x_init: [0.0, 0.0]
/// a:
///   - [0.0, 1.0]
///   - [0.0, -2.0]
/// b:
///   - [0.0]
///   - [2.0]
/// h:
///   - [0.0, 1.0]
/// d: [0.0]
/// p: [1.0, 1.0]
/// q: [1.0e-5, 1.0e-5]
/// r: [1.0e-2]
/// true_state: [0.0, 1.0]
/// config:
///   prediction: ModelPropagation
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterScenario {
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Number of filter steps to run
    #[serde(default = "default_steps")]
    pub steps: usize,
    pub x_init: Vec<f64>,
    pub a: MatrixSerde,
    pub b: MatrixSerde,
    pub h: MatrixSerde,
    pub d: MatrixSerde,
    pub p: MatrixSerde,
    pub q: MatrixSerde,
    pub r: MatrixSerde,
    /// Pins the true state of the plant, which otherwise starts at `x_init`
    #[serde(default)]
    pub true_state: Option<Vec<f64>>,
    #[serde(default)]
    pub config: KalmanConfig,
}

fn default_dt() -> f64 {
    DEFAULT_DT
}

fn default_steps() -> usize {
    500
}

impl ConfigRepr for FilterScenario {}

impl FilterScenario {
    /// Discretizes the model and builds the filter described by this scenario.
    pub fn build(&self) -> Result<KalmanFilter, ConfigError> {
        let mut filter = KalmanFilter::new(
            DVector::from_vec(self.x_init.clone()),
            &self.a.to_matrix()?,
            &self.b.to_matrix()?,
            &self.h.to_matrix()?,
            &self.d.to_matrix()?,
            self.p.to_matrix()?,
            self.q.to_matrix()?,
            self.r.to_matrix()?,
            self.dt,
        )
        .map_err(|e| ConfigError::InvalidConfig { msg: e.to_string() })?
        .with_config(self.config);

        if let Some(true_state) = &self.true_state {
            filter
                .set_true_state(DVector::from_vec(true_state.clone()))
                .map_err(|e| ConfigError::InvalidConfig {
                    msg: format!("true_state: {e}"),
                })?;
        }

        Ok(filter)
    }
}
