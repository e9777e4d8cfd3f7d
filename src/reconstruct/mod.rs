//! Reconstruction of cell averages to point values: the two one-sided limits
//! at every cell interface, and the values at the interior quadrature points
//! of every cell.
//!
//! Interface `j` is the left edge of local cell `j`. `qm[j]` is the limit
//! from cell `j - 1` and `qp[j]` the limit from cell `j`. At the two ends of
//! the local arrays the missing side is copied from the present one.

use serde::{Deserialize, Serialize};
use crate::component::Hooks;
use crate::context::StepContext;
use crate::error::Error;
use crate::grid::Grid;
use crate::state::{QuadratureArray, StateArray};

pub mod constant;
pub mod polynomial;

pub use constant::PiecewiseConstant;
pub use polynomial::Polynomial;




/**
 * Precomputed reconstruction coefficient tables for one grid and one order.
 * Each table holds `order` stencil weights per global cell (and per
 * quadrature point for the quadrature table).
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operators {
    pub order: usize,
    pub num_cells: usize,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub quadrature: Vec<f64>,
}

impl Operators {

    /// Whether these tables have the shape needed for the given grid and
    /// order.
    pub fn fits(&self, grid: &Grid, order: usize, num_points: usize) -> bool {
        let n = grid.len();
        self.order == order
            && self.num_cells == n
            && self.left.len() == n * order
            && self.right.len() == n * order
            && self.quadrature.len() == n * num_points * order
    }
}




/**
 * Maps cell averages to interface and quadrature-point values.
 */
pub trait Reconstructor: Hooks + Send {

    /// Nominal order of accuracy, which is also the stencil width.
    fn order(&self) -> usize;

    /// Number of quadrature points per cell written by `reconstruct`; zero if
    /// this reconstructor does not provide them.
    fn num_quadrature(&self) -> usize;

    /// Number of ghost cells needed on each side for one evaluation.
    fn num_ghost(&self) -> usize;

    /// Build the cacheable operators for a grid, if this reconstructor has
    /// any.
    fn precompute(&self, grid: &Grid) -> Result<Option<Operators>, Error>;

    /// Install operators, freshly built or loaded from a cache.
    fn restore(&mut self, operators: Option<Operators>) -> Result<(), Error>;

    /// Reconstruct `q` (local cells × unknowns) into `qm`, `qp` (interfaces
    /// × unknowns) and `qq` (cells × points × unknowns).
    fn reconstruct(
        &mut self,
        q: &StateArray,
        qm: &mut StateArray,
        qp: &mut StateArray,
        qq: &mut QuadratureArray,
        ctx: &mut StepContext,
    ) -> Result<(), Error>;
}




// ============================================================================
pub(crate) fn check_shapes(q: &StateArray, qm: &StateArray, qp: &StateArray, qq: &QuadratureArray, num_points: usize) -> Result<(), Error> {
    let (n, p) = q.shape();

    if qm.shape() != (n + 1, p) || qp.shape() != (n + 1, p) {
        return Err(Error::Contract(format!(
            "interface arrays must be {:?}, got {:?} and {:?}",
            (n + 1, p),
            qm.shape(),
            qp.shape()
        )));
    }
    if num_points > 0 && (qq.num_cells() != n || qq.num_points() != num_points || qq.num_fields() != p) {
        return Err(Error::Contract(format!(
            "quadrature array must be {:?}, got {:?}",
            (n, num_points, p),
            (qq.num_cells(), qq.num_points(), qq.num_fields())
        )));
    }
    Ok(())
}




/// Piecewise-constant reconstruction of a single cell.
pub(crate) fn identity_cell(q: &StateArray, qm: &mut StateArray, qp: &mut StateArray, qq: &mut QuadratureArray, i: usize, num_points: usize) {
    let row = q.row(i);
    qp.row_mut(i).copy_from_slice(row);
    qm.row_mut(i + 1).copy_from_slice(row);

    for l in 0..num_points {
        qq.point_mut(i, l).copy_from_slice(row);
    }
}




/// Fill the outer side of the first and last interfaces.
pub(crate) fn close_ends(qm: &mut StateArray, qp: &mut StateArray) {
    let n = qm.num_rows() - 1;
    qm.row_mut(0).copy_from_slice(qp.row(0));
    qp.row_mut(n).copy_from_slice(qm.row(n));
}
