extern crate kalman_tuner as kt;

use approx::assert_abs_diff_eq;
use kt::filter::prelude::*;
use kt::linalg::{DMatrix, DVector};

fn scalar(val: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, val)
}

/// Discrete integrator x_{k+1} = x_k + 0.01 u_k, directly measured.
fn integrator() -> DiscreteModel {
    DiscreteModel::new(scalar(1.0), scalar(0.01), scalar(1.0), scalar(0.0), 0.01).unwrap()
}

#[test]
fn luenberger_error_decay() {
    let _ = pretty_env_logger::try_init();

    let mut observer = LuenbergerObserver::new(integrator(), DVector::zeros(1), scalar(0.5)).unwrap();
    observer
        .set_true_state(DVector::from_element(1, 2.0))
        .unwrap();

    // The error is halved at every step since A_k - L H_k = 0.5
    let mut expected_err = 2.0;
    for _ in 0..40 {
        let (_, x_hat, x_true) = observer.step().unwrap();
        expected_err *= 0.5;
        assert_abs_diff_eq!((x_true[0] - x_hat[0]).abs(), expected_err, epsilon = 1e-12);
    }
    assert_abs_diff_eq!(observer.time(), 0.4, epsilon = 1e-12);

    observer.reset();
    assert_eq!(observer.state_estimate(), DVector::zeros(1));
    assert_eq!(observer.time(), 0.0);
}

#[test]
fn luenberger_gain_shape() {
    let err = LuenbergerObserver::new(integrator(), DVector::zeros(1), DMatrix::zeros(2, 1))
        .unwrap_err();
    assert_eq!(
        err,
        FilterError::DimensionMismatch {
            what: "L",
            expected: (1, 1),
            got: (2, 1)
        }
    );
}

#[test]
fn estimators_are_interchangeable() {
    let _ = pretty_env_logger::try_init();

    let mut kalman = KalmanFilter::from_discrete(
        integrator(),
        DVector::zeros(1),
        scalar(1.0),
        scalar(1e-5),
        scalar(1e-2),
    )
    .unwrap()
    .with_config(
        KalmanConfig::builder()
            .prediction(PredictionMode::ModelPropagation)
            .build(),
    );
    kalman
        .set_true_state(DVector::from_element(1, 1.0))
        .unwrap();

    let mut luenberger =
        LuenbergerObserver::new(integrator(), DVector::zeros(1), scalar(0.2)).unwrap();
    luenberger
        .set_true_state(DVector::from_element(1, 1.0))
        .unwrap();

    let mut estimators: Vec<Box<dyn Observer>> = vec![Box::new(kalman), Box::new(luenberger)];

    for estimator in estimators.iter_mut() {
        let mut last = None;
        for _ in 0..200 {
            last = Some(estimator.step().unwrap());
        }
        let (t, x_hat, x_true) = last.unwrap();
        assert_abs_diff_eq!(t, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x_hat[0], x_true[0], epsilon = 1e-3);
        assert_eq!(estimator.state_estimate(), x_hat);

        estimator.reset();
        assert_eq!(estimator.state_estimate(), DVector::zeros(1));
    }
}
