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

use crate::linalg::DMatrix;

/// Returns whether the provided square matrix is diagonal
pub fn is_diagonal(m: &DMatrix<f64>) -> bool {
    if !m.is_square() {
        return false;
    }
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            if i != j && m[(i, j)].abs() > f64::EPSILON {
                return false;
            }
        }
    }
    true
}

/// Returns whether the matrix is symmetric, within an absolute tolerance `tol`.
pub fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    m.is_square() && (m - m.transpose()).amax() <= tol
}

/// Returns the symmetric part of a square matrix, (M + M') / 2.
pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

/// Returns the largest modulus of the eigenvalues of a square matrix.
pub fn spectral_radius(m: &DMatrix<f64>) -> f64 {
    m.complex_eigenvalues()
        .iter()
        .map(|lambda| lambda.norm())
        .fold(0.0, f64::max)
}
