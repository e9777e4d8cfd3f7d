use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use serde::{Deserialize, Serialize};
use crate::component::Hooks;
use crate::error::Error;
use crate::grid::Grid;




/**
 * A named scalar attached to a system and written to the output header.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Integer(i64),
    Real(f64),
    Text(String),
}

pub type Parameters = BTreeMap<String, Parameter>;

impl From<f64> for Parameter {
    fn from(x: f64) -> Self {
        Parameter::Real(x)
    }
}

impl From<i64> for Parameter {
    fn from(x: i64) -> Self {
        Parameter::Integer(x)
    }
}

impl From<&str> for Parameter {
    fn from(x: &str) -> Self {
        Parameter::Text(x.to_string())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Parameter::Integer(x) => write!(fmt, "{}", x),
            Parameter::Real(x) => write!(fmt, "{}", x),
            Parameter::Text(x) => write!(fmt, "{}", x),
        }
    }
}




/**
 * The balance law being solved: how many unknowns each cell carries, the
 * initial condition, and a scalar conserved diagnostic.
 */
pub trait System: Hooks + Send {

    /// Number of unknowns per cell.
    fn num_unknowns(&self) -> usize;

    /// Write the cell averages of the initial condition at time `t0` for the
    /// given global cells into `q` (row-major, `num_unknowns` per cell).
    fn initial_condition(&self, t0: f64, grid: &Grid, cells: Range<usize>, q: &mut [f64]) -> Result<(), Error>;

    /// The unknown whose integral is reported as the mass.
    fn mass_component(&self) -> usize {
        0
    }

    /// Integral of the mass component over the given cells, from a row-major
    /// block of cell averages and the matching cell sizes.
    fn mass(&self, q: &[f64], sizes: &[f64]) -> f64 {
        let p = self.num_unknowns();
        let m = self.mass_component();
        q.chunks_exact(p)
            .zip(sizes)
            .map(|(row, dx)| row[m] * dx)
            .sum()
    }

    fn parameters(&self) -> Parameters {
        Parameters::new()
    }
}




// ============================================================================
/**
 * A system defined by a closure `q0(x, t)` returning the point values of all
 * unknowns. Cell averages are taken with three-point Gauss quadrature.
 */
pub struct SimpleSystem {
    num_unknowns: usize,
    mass_component: usize,
    parameters: Parameters,
    q0: Box<dyn Fn(f64, f64) -> Vec<f64> + Send>,
}




// ============================================================================
impl SimpleSystem {

    pub fn new<F>(num_unknowns: usize, q0: F) -> Self
    where
        F: Fn(f64, f64) -> Vec<f64> + Send + 'static,
    {
        Self {
            num_unknowns,
            mass_component: 0,
            parameters: Parameters::new(),
            q0: Box::new(q0),
        }
    }

    pub fn with_mass_component(mut self, m: usize) -> Self {
        self.mass_component = m;
        self
    }

    pub fn with_parameter<P: Into<Parameter>>(mut self, name: &str, value: P) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

impl Hooks for SimpleSystem {}

impl System for SimpleSystem {

    fn num_unknowns(&self) -> usize {
        self.num_unknowns
    }

    fn initial_condition(&self, t0: f64, grid: &Grid, cells: Range<usize>, q: &mut [f64]) -> Result<(), Error> {
        let p = self.num_unknowns;

        if q.len() != cells.len() * p {
            return Err(Error::Contract(format!(
                "initial condition buffer has {} values, expected {}",
                q.len(),
                cells.len() * p
            )));
        }
        for (i, row) in cells.zip(q.chunks_exact_mut(p)) {
            grid.average_into(i, |x| (self.q0)(x, t0), row)?;
        }
        Ok(())
    }

    fn mass_component(&self) -> usize {
        self.mass_component
    }

    fn parameters(&self) -> Parameters {
        self.parameters.clone()
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn initial_condition_is_cell_averaged() {
        let grid = Grid::uniform(0.0, 1.0, 4).unwrap();
        let system = SimpleSystem::new(2, |x, t| vec![x + t, 1.0]);
        let mut q = vec![0.0; 4];
        system.initial_condition(1.0, &grid, 1..3, &mut q).unwrap();
        assert!((q[0] - 1.375).abs() < 1e-14);
        assert!((q[2] - 1.625).abs() < 1e-14);
        assert!((q[3] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn wrong_kernel_length_is_a_contract_error() {
        let grid = Grid::uniform(0.0, 1.0, 4).unwrap();
        let system = SimpleSystem::new(2, |x, _| vec![x]);
        let mut q = vec![0.0; 8];
        assert!(matches!(system.initial_condition(0.0, &grid, 0..4, &mut q), Err(Error::Contract(_))));
    }

    #[test]
    fn mass_integrates_the_selected_component() {
        let system = SimpleSystem::new(2, |_, _| vec![0.0, 0.0]).with_mass_component(1);
        let q = [1.0, 2.0, 3.0, 4.0];
        assert!((system.mass(&q, &[0.5, 0.25]) - 2.0).abs() < 1e-15);
    }

    #[test]
    fn parameters_are_collected() {
        let system = SimpleSystem::new(1, |_, _| vec![0.0])
            .with_parameter("gravity", 9.81)
            .with_parameter("cells", 100i64);
        let parameters = system.parameters();
        assert_eq!(parameters["gravity"], Parameter::Real(9.81));
        assert_eq!(parameters["cells"].to_string(), "100");
    }
}
