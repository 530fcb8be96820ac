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

use super::{ConfigError, InvalidConfigSnafu};
use crate::linalg::{DMatrix, DVector};
use crate::utils::is_diagonal;
use either::Either;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

/// A matrix as written in a configuration file.
///
/// A flat list is read as the diagonal of a square matrix, e.g. `[1e-5, 1e-5]`, and a list of
/// lists is read row by row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixSerde {
    #[serde(with = "either::serde_untagged")]
    inner: Either<Vec<f64>, Vec<Vec<f64>>>,
}

impl MatrixSerde {
    pub fn from_diagonal(diag: Vec<f64>) -> Self {
        Self {
            inner: Either::Left(diag),
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self {
            inner: Either::Right(rows),
        }
    }

    /// Uses the compact diagonal representation whenever the matrix is diagonal.
    pub fn from_matrix(mat: &DMatrix<f64>) -> Self {
        if is_diagonal(mat) && mat.nrows() > 0 {
            Self::from_diagonal(mat.diagonal().iter().copied().collect())
        } else {
            Self::from_rows(
                mat.row_iter()
                    .map(|row| row.iter().copied().collect())
                    .collect(),
            )
        }
    }

    pub fn to_matrix(&self) -> Result<DMatrix<f64>, ConfigError> {
        match &self.inner {
            Either::Left(diag) => {
                ensure!(
                    !diag.is_empty(),
                    InvalidConfigSnafu {
                        msg: "empty diagonal"
                    }
                );
                Ok(DMatrix::from_diagonal(&DVector::from_column_slice(diag)))
            }
            Either::Right(rows) => {
                let nrows = rows.len();
                let ncols = rows.first().map_or(0, |row| row.len());
                // A matrix with rows but no columns is valid, e.g. a control matrix without inputs
                ensure!(
                    nrows > 0,
                    InvalidConfigSnafu {
                        msg: "matrix without any row"
                    }
                );
                for (i, row) in rows.iter().enumerate() {
                    ensure!(
                        row.len() == ncols,
                        InvalidConfigSnafu {
                            msg: format!("row {i} has {} columns instead of {ncols}", row.len())
                        }
                    );
                }
                Ok(DMatrix::from_fn(nrows, ncols, |i, j| rows[i][j]))
            }
        }
    }
}

#[cfg(test)]
mod ut_matrix_serde {
    use super::*;

    #[test]
    fn diagonal() {
        let m_diag = MatrixSerde::from_diagonal(vec![1.0, 2.0]);

        println!("Diag -- \n{}", serde_yaml::to_string(&m_diag).unwrap());
        // Load from one line list
        let diag_loaded: MatrixSerde = serde_yaml::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(diag_loaded, m_diag);
        assert_eq!(
            diag_loaded.to_matrix().unwrap(),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0])
        );
    }

    #[test]
    fn full() {
        let m_full = MatrixSerde::from_rows(vec![vec![1.0, 2.0]; 2]);

        // Serialization will print this as an exhaustive list of lists.
        println!("Full -- \n{}", serde_yaml::to_string(&m_full).unwrap());
        let full_mat = r#"
- [1.0, 2.0] # Row 1
- [1.0, 2.0] # Row 2
    "#;

        let full_loaded: MatrixSerde = serde_yaml::from_str(full_mat).unwrap();
        assert_eq!(full_loaded, m_full);
        assert_eq!(
            full_loaded.to_matrix().unwrap(),
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 1.0, 2.0])
        );
    }

    #[test]
    fn column() {
        let col: MatrixSerde = serde_yaml::from_str("[[0.0], [1.0]]").unwrap();
        assert_eq!(col.to_matrix().unwrap().shape(), (2, 1));
    }

    #[test]
    fn ragged_rows() {
        let ragged: MatrixSerde = serde_yaml::from_str("[[1.0, 2.0], [3.0]]").unwrap();
        assert!(matches!(
            ragged.to_matrix(),
            Err(ConfigError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn compact_representation() {
        let diag = DMatrix::from_diagonal_element(3, 3, 1e-2);
        assert_eq!(
            MatrixSerde::from_matrix(&diag),
            MatrixSerde::from_diagonal(vec![1e-2; 3])
        );
        let full = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        assert_eq!(
            MatrixSerde::from_matrix(&full),
            MatrixSerde::from_rows(vec![vec![1.0, 0.0]])
        );
        assert_eq!(MatrixSerde::from_matrix(&full).to_matrix().unwrap(), full);
    }
}
