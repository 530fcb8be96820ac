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

use super::{check_shape, DynamicsError, InvalidParameterSnafu};
use crate::linalg::DMatrix;
use serde_derive::Serialize;
use snafu::ensure;

/// A discrete-time linear model, only valid for the sample interval `dt` it was built for.
///
/// ```text
/// x_{k+1} = A_k x_k + B_k u_k
///     z_k = H_k x_k + D_k u_k
/// ```
///
/// The number of states (n), inputs (m) and outputs (o) are fixed from the matrix shapes at
/// construction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscreteModel {
    a_k: DMatrix<f64>,
    b_k: DMatrix<f64>,
    h_k: DMatrix<f64>,
    d_k: DMatrix<f64>,
    dt: f64,
}

impl DiscreteModel {
    /// Builds a model from matrices which are already discrete, e.g. identified on the hardware.
    pub fn new(
        a_k: DMatrix<f64>,
        b_k: DMatrix<f64>,
        h_k: DMatrix<f64>,
        d_k: DMatrix<f64>,
        dt: f64,
    ) -> Result<Self, DynamicsError> {
        check_dt(dt)?;
        check_model(&a_k, &b_k, &h_k, &d_k)?;
        Ok(Self {
            a_k,
            b_k,
            h_k,
            d_k,
            dt,
        })
    }

    pub fn a_k(&self) -> &DMatrix<f64> {
        &self.a_k
    }

    pub fn b_k(&self) -> &DMatrix<f64> {
        &self.b_k
    }

    pub fn h_k(&self) -> &DMatrix<f64> {
        &self.h_k
    }

    pub fn d_k(&self) -> &DMatrix<f64> {
        &self.d_k
    }

    /// Sample interval this model was discretized for.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of states (n)
    pub fn num_states(&self) -> usize {
        self.a_k.nrows()
    }

    /// Number of inputs (m)
    pub fn num_inputs(&self) -> usize {
        self.b_k.ncols()
    }

    /// Number of outputs (o)
    pub fn num_outputs(&self) -> usize {
        self.h_k.nrows()
    }

    /// Replaces all four matrices at once. Nothing is replaced if any shape differs from the current one.
    pub(crate) fn replace(
        &mut self,
        a_k: DMatrix<f64>,
        b_k: DMatrix<f64>,
        h_k: DMatrix<f64>,
        d_k: DMatrix<f64>,
    ) -> Result<(), DynamicsError> {
        check_shape("A_k", a_k.shape(), self.a_k.shape())?;
        check_shape("B_k", b_k.shape(), self.b_k.shape())?;
        check_shape("H_k", h_k.shape(), self.h_k.shape())?;
        check_shape("D_k", d_k.shape(), self.d_k.shape())?;
        self.a_k = a_k;
        self.b_k = b_k;
        self.h_k = h_k;
        self.d_k = d_k;
        Ok(())
    }
}

/// Converts the continuous-time model (A, B, H, D) into its zero-order hold equivalent for a
/// sample interval `dt`.
///
/// The augmented matrix `[[A, B], [0, 0]] * dt` is exponentiated: its top-left block is A_k and
/// its top-right block is B_k. The observation and feed-forward matrices are unchanged by a zero
/// order hold, so H_k = H and D_k = D.
///
/// # Errors
/// + `DimensionMismatch` if A is not square or if B, H or D disagree with the state dimension of A;
/// + `InvalidParameter` if `dt` is not strictly positive or if A is empty.
pub fn zero_order_hold(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    h: &DMatrix<f64>,
    d: &DMatrix<f64>,
    dt: f64,
) -> Result<DiscreteModel, DynamicsError> {
    check_dt(dt)?;
    let (n, m, o) = check_model(a, b, h, d)?;

    let mut augmented = DMatrix::<f64>::zeros(n + m, n + m);
    augmented.view_mut((0, 0), (n, n)).copy_from(&(a * dt));
    augmented.view_mut((0, n), (n, m)).copy_from(&(b * dt));

    let phi = augmented.exp();

    debug!("discretized model with {n} states, {m} inputs, {o} outputs at dt = {dt}");

    Ok(DiscreteModel {
        a_k: phi.view((0, 0), (n, n)).into_owned(),
        b_k: phi.view((0, n), (n, m)).into_owned(),
        h_k: h.clone(),
        d_k: d.clone(),
        dt,
    })
}

fn check_dt(dt: f64) -> Result<(), DynamicsError> {
    ensure!(
        dt.is_finite() && dt > 0.0,
        InvalidParameterSnafu {
            param: "dt",
            reason: format!("sample interval must be strictly positive, got {dt}"),
        }
    );
    Ok(())
}

/// Returns the (n, m, o) dimensions of a consistent model.
fn check_model(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    h: &DMatrix<f64>,
    d: &DMatrix<f64>,
) -> Result<(usize, usize, usize), DynamicsError> {
    let n = a.nrows();
    ensure!(
        n > 0,
        InvalidParameterSnafu {
            param: "A",
            reason: "state matrix is empty",
        }
    );
    check_shape("A", a.shape(), (n, n))?;

    let m = b.ncols();
    check_shape("B", b.shape(), (n, m))?;

    let o = h.nrows();
    check_shape("H", h.shape(), (o, n))?;
    check_shape("D", d.shape(), (o, m))?;

    Ok((n, m, o))
}

#[cfg(test)]
mod ut_zoh {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn scalar_integrator() {
        // x' = u: A_k = 1 and B_k = dt exactly
        let model = zero_order_hold(
            &DMatrix::zeros(1, 1),
            &DMatrix::from_element(1, 1, 1.0),
            &DMatrix::from_element(1, 1, 1.0),
            &DMatrix::zeros(1, 1),
            0.01,
        )
        .unwrap();

        assert_abs_diff_eq!(model.a_k()[(0, 0)], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(model.b_k()[(0, 0)], 0.01, epsilon = 1e-15);
        assert_eq!(model.num_states(), 1);
        assert_eq!(model.num_inputs(), 1);
        assert_eq!(model.num_outputs(), 1);
    }

    #[test]
    fn first_order_lag() {
        // x' = -x/tau + u/tau
        let tau = 0.5;
        let dt = 0.1;
        let model = zero_order_hold(
            &DMatrix::from_element(1, 1, -1.0 / tau),
            &DMatrix::from_element(1, 1, 1.0 / tau),
            &DMatrix::from_element(1, 1, 1.0),
            &DMatrix::zeros(1, 1),
            dt,
        )
        .unwrap();

        let decay = (-dt / tau).exp();
        assert_abs_diff_eq!(model.a_k()[(0, 0)], decay, epsilon = 1e-12);
        assert_abs_diff_eq!(model.b_k()[(0, 0)], 1.0 - decay, epsilon = 1e-12);
    }

    #[test]
    fn no_inputs() {
        let model = zero_order_hold(
            &DMatrix::from_element(1, 1, -2.0),
            &DMatrix::zeros(1, 0),
            &DMatrix::from_element(1, 1, 1.0),
            &DMatrix::zeros(1, 0),
            0.25,
        )
        .unwrap();
        assert_eq!(model.b_k().shape(), (1, 0));
        assert_abs_diff_eq!(model.a_k()[(0, 0)], (-0.5_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn replace_keeps_shapes() {
        let mut model = DiscreteModel::new(
            DMatrix::identity(2, 2),
            DMatrix::zeros(2, 1),
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
            DMatrix::zeros(1, 1),
            0.01,
        )
        .unwrap();
        let before = model.clone();

        let err = model
            .replace(
                DMatrix::identity(2, 2) * 2.0,
                DMatrix::zeros(2, 1),
                DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
                DMatrix::zeros(2, 1),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DynamicsError::DimensionMismatch { what: "D_k", .. }
        ));
        assert_eq!(model, before);
    }
}
