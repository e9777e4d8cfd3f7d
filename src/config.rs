use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::decomposition::Boundary;
use crate::error::Error;
use crate::evolver::{Evolver, ForwardEuler, SspRk3};
use crate::grid::Grid;
use crate::reconstruct::{PiecewiseConstant, Polynomial, Reconstructor};
use crate::schedule::{linspace, validate_times};




/// Time integration scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    ForwardEuler,
    SspRk3,
}

impl Scheme {
    pub fn evolver(&self) -> Box<dyn Evolver> {
        match self {
            Scheme::ForwardEuler => Box::new(ForwardEuler::new()),
            Scheme::SspRk3 => Box::new(SspRk3::new()),
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fe" | "euler" | "forward-euler" => Ok(Scheme::ForwardEuler),
            "rk3" | "ssp-rk3" => Ok(Scheme::SspRk3),
            _ => Err(Error::Configuration(format!("unknown scheme '{}'", s))),
        }
    }
}




/**
 * Everything about a run that is not physics: the grid, the time grid and
 * dump schedule, the numerical scheme, the boundary condition, and where
 * the cache and output live. Flux, source and system are supplied in code.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub domain: (f64, f64),
    pub num_cells: usize,
    pub t0: f64,
    pub t_last: f64,
    pub num_steps: usize,
    pub dumps: Option<Vec<f64>>,
    pub scheme: Scheme,
    pub order: usize,
    pub boundary: Boundary,
    pub trace: usize,
    pub monitor_mass: bool,
    pub cache: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            domain: (0.0, 1.0),
            num_cells: 100,
            t0: 0.0,
            t_last: 1.0,
            num_steps: 100,
            dumps: None,
            scheme: Scheme::ForwardEuler,
            order: 1,
            boundary: Boundary::Periodic,
            trace: 0,
            monitor_mass: false,
            cache: None,
            output: None,
        }
    }
}




// ============================================================================
impl RunConfig {

    /// The uniform time grid from `t0` to `t_last` in `num_steps` steps.
    pub fn times(&self) -> Result<Vec<f64>, Error> {
        if self.num_steps == 0 {
            return Err(Error::MalformedTimes("need at least one step".into()));
        }
        let times = linspace(self.t0, self.t_last, self.num_steps + 1);
        validate_times(&times)?;
        Ok(times)
    }

    pub fn grid(&self) -> Result<Grid, Error> {
        Grid::uniform(self.domain.0, self.domain.1, self.num_cells)
    }

    pub fn reconstructor(&self) -> Result<Box<dyn Reconstructor>, Error> {
        match self.order {
            0 => Err(Error::Configuration("reconstruction order must be at least 1".into())),
            1 => Ok(Box::new(PiecewiseConstant)),
            k => Ok(Box::new(Polynomial::new(k)?)),
        }
    }

    pub fn evolver(&self) -> Box<dyn Evolver> {
        self.scheme.evolver()
    }

    /// Read a configuration written by `store`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        ciborium::de::from_reader(BufReader::new(file))
            .map_err(|e| Error::Configuration(format!("{}: {:?}", path.display(), e)))
    }

    pub fn store(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path).map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        ciborium::ser::into_writer(self, &mut writer)
            .map_err(|e| Error::Configuration(format!("{}: {:?}", path.display(), e)))?;
        writer
            .flush()
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn default_config_describes_a_valid_run() {
        let config = RunConfig::default();
        assert_eq!(config.times().unwrap().len(), 101);
        assert_eq!(config.grid().unwrap().len(), 100);
        assert_eq!(config.reconstructor().unwrap().order(), 1);
        assert_eq!(config.evolver().num_stages(), 1);
    }

    #[test]
    fn scheme_names_parse() {
        assert_eq!("rk3".parse::<Scheme>().unwrap(), Scheme::SspRk3);
        assert_eq!("fe".parse::<Scheme>().unwrap(), Scheme::ForwardEuler);
        assert!("leapfrog".parse::<Scheme>().is_err());
    }

    #[test]
    fn config_round_trips_through_a_file() {
        let config = RunConfig {
            order: 3,
            scheme: Scheme::SspRk3,
            boundary: Boundary::Outflow,
            dumps: Some(vec![0.5, 1.0]),
            output: Some("out.cbor".into()),
            ..RunConfig::default()
        };
        let path = std::env::temp_dir().join(format!("blaw-config-{}.cbor", std::process::id()));
        config.store(&path).unwrap();
        let loaded = RunConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn zero_steps_is_malformed() {
        let config = RunConfig {
            num_steps: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.times(), Err(Error::MalformedTimes(_))));
    }
}
