use crate::component::Hooks;
use crate::context::StepContext;
use crate::error::Error;
use crate::grid::Grid;
use crate::quadrature;
use crate::state::{QuadratureArray, StateArray};
use super::{check_shapes, close_ends, identity_cell, Operators, Reconstructor};




/**
 * First-order reconstruction: every point value in a cell is the cell
 * average.
 */
#[derive(Clone, Debug, Default)]
pub struct PiecewiseConstant;

impl Hooks for PiecewiseConstant {}

impl Reconstructor for PiecewiseConstant {

    fn order(&self) -> usize {
        1
    }

    fn num_quadrature(&self) -> usize {
        quadrature::NUM_POINTS
    }

    fn num_ghost(&self) -> usize {
        1
    }

    fn precompute(&self, _grid: &Grid) -> Result<Option<Operators>, Error> {
        Ok(None)
    }

    fn restore(&mut self, _operators: Option<Operators>) -> Result<(), Error> {
        Ok(())
    }

    fn reconstruct(
        &mut self,
        q: &StateArray,
        qm: &mut StateArray,
        qp: &mut StateArray,
        qq: &mut QuadratureArray,
        _ctx: &mut StepContext,
    ) -> Result<(), Error> {
        check_shapes(q, qm, qp, qq, quadrature::NUM_POINTS)?;

        for i in 0..q.num_rows() {
            identity_cell(q, qm, qp, qq, i, quadrature::NUM_POINTS);
        }
        close_ends(qm, qp);
        Ok(())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::context::Diagnostics;

    #[test]
    fn interfaces_take_neighbor_averages() {
        let q = StateArray::from_vec(3, 1, vec![1.0, 2.0, 3.0]).unwrap();
        let mut qm = StateArray::zeros(4, 1);
        let mut qp = StateArray::zeros(4, 1);
        let mut qq = QuadratureArray::zeros(3, 3, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.0, 0.1, &mut diagnostics);

        PiecewiseConstant.reconstruct(&q, &mut qm, &mut qp, &mut qq, &mut ctx).unwrap();

        assert_eq!(qm.as_slice(), &[1.0, 1.0, 2.0, 3.0]);
        assert_eq!(qp.as_slice(), &[1.0, 2.0, 3.0, 3.0]);
        assert_eq!(qq.cell(1), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn mis_sized_interface_arrays_are_rejected() {
        let q = StateArray::zeros(3, 1);
        let mut qm = StateArray::zeros(3, 1);
        let mut qp = StateArray::zeros(4, 1);
        let mut qq = QuadratureArray::zeros(3, 3, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.0, 0.1, &mut diagnostics);
        assert!(PiecewiseConstant.reconstruct(&q, &mut qm, &mut qp, &mut qq, &mut ctx).is_err());
    }
}
