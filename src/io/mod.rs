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

use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::prelude::*;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Matrices in configuration files, either as their diagonal or as a list of rows.
pub mod matrices;
pub use matrices::MatrixSerde;

/// Filter scenarios: the continuous model, its noises and initial conditions.
pub mod scenario;
pub use scenario::FilterScenario;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// The file could not be opened.
    #[snafu(display("failed to read configuration file {}: {source}", path.display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The YAML is malformed or does not describe the expected structure.
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseError { source: serde_yaml::Error },
    /// The configuration parsed but does not describe a valid filter.
    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(&path).context(ReadSnafu {
            path: path.as_ref().to_path_buf(),
        })?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(&path).context(ReadSnafu {
            path: path.as_ref().to_path_buf(),
        })?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds the configuration representation from the provided string of a yaml
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}
