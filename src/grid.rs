use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::quadrature;




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]


/**
 * A one-dimensional, possibly non-uniform, finite-volume grid defined by its
 * cell boundaries. Cell `i` spans `boundaries[i] .. boundaries[i + 1]`.
 */
pub struct Grid {
    boundaries: Vec<f64>,
}




// ============================================================================
impl Grid {

    /// Build a grid from its cell boundaries. The boundaries must be finite
    /// and strictly increasing, and there must be at least one cell.
    pub fn new(boundaries: Vec<f64>) -> Result<Self, Error> {
        if boundaries.len() < 2 {
            return Err(Error::InvalidGrid(format!(
                "need at least two boundaries, got {}",
                boundaries.len()
            )));
        }
        if boundaries.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidGrid("boundaries must be finite".into()));
        }
        if let Some(i) = boundaries.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidGrid(format!(
                "boundaries not strictly increasing at index {}",
                i + 1
            )));
        }
        Ok(Self { boundaries })
    }

    /// Build a grid of `num_cells` equal cells spanning `a .. b`.
    pub fn uniform(a: f64, b: f64, num_cells: usize) -> Result<Self, Error> {
        if num_cells == 0 {
            return Err(Error::InvalidGrid("grid needs at least one cell".into()));
        }
        let dx = (b - a) / num_cells as f64;
        let mut boundaries: Vec<f64> = (0..=num_cells).map(|i| a + i as f64 * dx).collect();
        boundaries[num_cells] = b;
        Self::new(boundaries)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn cell_size(&self, i: usize) -> f64 {
        self.boundaries[i + 1] - self.boundaries[i]
    }

    pub fn cell_center(&self, i: usize) -> f64 {
        0.5 * (self.boundaries[i] + self.boundaries[i + 1])
    }

    pub fn sizes(&self) -> Vec<f64> {
        self.boundaries.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn centers(&self) -> Vec<f64> {
        self.boundaries.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn min_cell_size(&self) -> f64 {
        self.sizes().into_iter().fold(f64::INFINITY, f64::min)
    }

    /// Locations of the quadrature points in cell `i`.
    pub fn quadrature_points(&self, i: usize) -> [f64; quadrature::NUM_POINTS] {
        quadrature::points_in(self.boundaries[i], self.boundaries[i + 1])
    }

    /// Cell average of a scalar function over cell `i`.
    pub fn average<F>(&self, i: usize, f: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        self.quadrature_points(i)
            .iter()
            .zip(quadrature::AVERAGE_WEIGHTS.iter())
            .map(|(x, w)| w * f(*x))
            .sum()
    }

    /// Cell average of a vector-valued function over cell `i`, written into
    /// `out`. The function must return vectors of length `out.len()`.
    pub fn average_into<F>(&self, i: usize, f: F, out: &mut [f64]) -> Result<(), Error>
    where
        F: Fn(f64) -> Vec<f64>,
    {
        for x in out.iter_mut() {
            *x = 0.0;
        }
        for (x, w) in self.quadrature_points(i).iter().zip(quadrature::AVERAGE_WEIGHTS.iter()) {
            let value = f(*x);

            if value.len() != out.len() {
                return Err(Error::Contract(format!(
                    "function returned {} components, expected {}",
                    value.len(),
                    out.len()
                )));
            }
            for (o, v) in out.iter_mut().zip(value) {
                *o += w * v;
            }
        }
        Ok(())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::Grid;

    #[test]
    fn uniform_grid_has_equal_cells() {
        let grid = Grid::uniform(0.0, 2.0, 8).unwrap();
        assert_eq!(grid.len(), 8);
        assert!(grid.sizes().iter().all(|dx| (dx - 0.25).abs() < 1e-15));
        assert_eq!(grid.boundaries()[8], 2.0);
        assert!((grid.cell_center(0) - 0.125).abs() < 1e-15);
    }

    #[test]
    fn non_monotonic_boundaries_are_rejected() {
        assert!(Grid::new(vec![0.0, 1.0, 1.0]).is_err());
        assert!(Grid::new(vec![0.0]).is_err());
        assert!(Grid::new(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn average_of_linear_function_is_value_at_center() {
        let grid = Grid::new(vec![0.0, 0.3, 1.0]).unwrap();
        let avg = grid.average(1, |x| 2.0 * x + 1.0);
        assert!((avg - (2.0 * 0.65 + 1.0)).abs() < 1e-14);
    }

    #[test]
    fn vector_average_checks_component_count() {
        let grid = Grid::uniform(0.0, 1.0, 4).unwrap();
        let mut out = [0.0; 2];
        assert!(grid.average_into(0, |x| vec![x, 1.0], &mut out).is_ok());
        assert!((out[1] - 1.0).abs() < 1e-15);
        assert!(grid.average_into(0, |x| vec![x], &mut out).is_err());
    }
}
