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

extern crate kalman_tuner as kt;

use clap::{crate_version, value_parser, Arg, Command};
use kt::io::{ConfigRepr, FilterScenario};
use kt::KalmanFilter;
use log::{debug, info};
use snafu::{OptionExt, ResultExt, Whatever};
use std::env::{set_var, var};
use std::io;
use std::path::PathBuf;

const LOG_VAR: &str = "KFTUNE_LOG";

#[snafu::report]
fn main() -> Result<(), Whatever> {
    let matches = Command::new("kftune")
        .version(crate_version!())
        .about("Steps a linear Kalman filter through a scenario and logs its convergence.")
        .arg(
            Arg::new("SCENARIO")
                .help("Sets the YAML scenario file to use")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("steps")
                .short('n')
                .long("steps")
                .value_parser(value_parser!(usize))
                .help("Number of filter steps, overrides the scenario"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .help("CSV file to write, defaults to the standard output"),
        )
        .get_matches();

    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "info");
    }

    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        println!("could not init logger");
    }

    let scenario_path = matches
        .get_one::<PathBuf>("SCENARIO")
        .whatever_context("scenario file required")?;

    let scenario = FilterScenario::load(scenario_path)
        .with_whatever_context(|_| format!("could not load {}", scenario_path.display()))?;
    debug!("{scenario:?}");

    let steps = matches
        .get_one::<usize>("steps")
        .copied()
        .unwrap_or(scenario.steps);

    let mut filter = scenario
        .build()
        .whatever_context("could not build the filter")?;

    info!("Running {steps} steps of {}", scenario_path.display());

    match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            let mut wtr = csv::Writer::from_path(path)
                .with_whatever_context(|_| format!("could not create {}", path.display()))?;
            run(&mut filter, steps, &mut wtr)?;
            info!("Wrote {}", path.display());
        }
        None => run(&mut filter, steps, &mut csv::Writer::from_writer(io::stdout()))?,
    }

    info!("Final {}", filter.gains());

    Ok(())
}

/// Steps the filter and writes one record per step: time, estimate, truth, gain, and the
/// diagonal of the covariance.
fn run<W: io::Write>(
    filter: &mut KalmanFilter,
    steps: usize,
    wtr: &mut csv::Writer<W>,
) -> Result<(), Whatever> {
    let gains = filter.gains();
    let (n, o) = gains.k_k.shape();

    let mut hdr = vec!["t".to_string()];
    hdr.extend((0..n).map(|i| format!("x_hat_{i}")));
    hdr.extend((0..n).map(|i| format!("x_{i}")));
    for i in 0..n {
        hdr.extend((0..o).map(|j| format!("k_{i}{j}")));
    }
    hdr.extend((0..n).map(|i| format!("p_{i}{i}")));
    wtr.write_record(&hdr)
        .whatever_context("could not write CSV header")?;

    for _ in 0..steps {
        let (t, x_hat, x_true) = filter.step().whatever_context("filter step failed")?;
        let gains = filter.gains();

        let mut record = vec![format!("{t}")];
        record.extend(x_hat.iter().map(|v| format!("{v}")));
        record.extend(x_true.iter().map(|v| format!("{v}")));
        for i in 0..n {
            record.extend(gains.k_k.row(i).iter().map(|v| format!("{v}")));
        }
        record.extend(gains.p_k.diagonal().iter().map(|v| format!("{v}")));
        wtr.write_record(&record)
            .whatever_context("could not write CSV record")?;
    }

    wtr.flush().whatever_context("could not flush CSV")?;
    Ok(())
}

#[cfg(test)]
mod ut_kftune {
    use super::*;

    const TWO_STATES: &str = r#"
x_init: [0.0, 0.0]
a:
  - [0.0, 1.0]
  - [0.0, -2.0]
b:
  - [0.0]
  - [2.0]
h:
  - [0.0, 1.0]
d: [0.0]
p: [1.0, 1.0]
q: [1.0e-5, 1.0e-5]
r: [1.0e-2]
"#;

    #[test]
    fn csv_layout() {
        let mut filter = FilterScenario::loads(TWO_STATES).unwrap().build().unwrap();
        let mut wtr = csv::Writer::from_writer(vec![]);
        run(&mut filter, 3, &mut wtr).unwrap();

        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "t,x_hat_0,x_hat_1,x_0,x_1,k_00,k_10,p_00,p_11"
        );
        // One time column, then n estimates, n true states, n * o gains and n variances
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 1 + 2 + 2 + 2 + 2);
        }
        assert!(lines[3].starts_with("0.03"));
    }
}
