use crate::component::{Hooks, Layout};
use crate::context::StepContext;
use crate::error::Error;
use crate::quadrature;
use crate::state::{QuadratureArray, StateArray};




/// A point source function `S(q, s)`.
pub type PointKernel = Box<dyn Fn(&[f64], &mut [f64]) + Send>;

/// A per-cell source function `S(left, right, quad, s)`: the left and right
/// edge values of one cell, its quadrature-point values (points × unknowns),
/// and the output row.
pub type CellKernel = Box<dyn Fn(&[f64], &[f64], &[f64], &mut [f64]) + Send>;




/**
 * Computes the cell-averaged source term of every local cell from the
 * reconstructed point values.
 */
pub trait Source: Hooks + Send {

    /// Number of quadrature points per cell this source needs from the
    /// reconstructor.
    fn required_quadrature(&self) -> usize {
        0
    }

    fn source(
        &mut self,
        qm: &StateArray,
        qp: &StateArray,
        qq: &QuadratureArray,
        ctx: &mut StepContext,
        s: &mut StateArray,
    ) -> Result<(), Error>;
}




fn check_cells(qm: &StateArray, qq: &QuadratureArray, s: &StateArray) -> Result<(), Error> {
    let n = s.num_rows();

    if qm.num_rows() != n + 1 || qq.num_cells() != n || qq.num_fields() != s.num_fields() {
        return Err(Error::Contract(format!(
            "source arrays disagree: {} interfaces, {} quadrature cells, {} output cells",
            qm.num_rows(),
            qq.num_cells(),
            n
        )));
    }
    Ok(())
}




// ============================================================================
/**
 * Source term averaged over each cell with three-point Gauss quadrature of a
 * point kernel.
 */
pub struct GaussSource {
    kernel: PointKernel,
    value: Vec<f64>,
}

impl GaussSource {
    pub fn new<F>(kernel: F) -> Self
    where
        F: Fn(&[f64], &mut [f64]) + Send + 'static,
    {
        Self {
            kernel: Box::new(kernel),
            value: Vec::new(),
        }
    }
}

impl Hooks for GaussSource {
    fn allocate(&mut self, layout: &Layout) -> Result<(), Error> {
        if layout.num_quadrature != quadrature::NUM_POINTS {
            return Err(Error::Configuration(format!(
                "Gauss source needs {} quadrature points, reconstructor provides {}",
                quadrature::NUM_POINTS,
                layout.num_quadrature
            )));
        }
        self.value = vec![0.0; layout.num_unknowns];
        Ok(())
    }
}

impl Source for GaussSource {

    fn required_quadrature(&self) -> usize {
        quadrature::NUM_POINTS
    }

    fn source(
        &mut self,
        qm: &StateArray,
        _qp: &StateArray,
        qq: &QuadratureArray,
        _ctx: &mut StepContext,
        s: &mut StateArray,
    ) -> Result<(), Error> {
        check_cells(qm, qq, s)?;

        if qq.num_points() != quadrature::NUM_POINTS {
            return Err(Error::Configuration(format!(
                "Gauss source needs {} quadrature points, got {}",
                quadrature::NUM_POINTS,
                qq.num_points()
            )));
        }
        self.value.resize(s.num_fields(), 0.0);

        for i in 0..s.num_rows() {
            let out = s.row_mut(i);

            for x in out.iter_mut() {
                *x = 0.0;
            }
            for (l, w) in quadrature::AVERAGE_WEIGHTS.iter().enumerate() {
                (self.kernel)(qq.point(i, l), &mut self.value);

                for (o, v) in out.iter_mut().zip(&self.value) {
                    *o += w * v;
                }
            }
        }
        Ok(())
    }
}




// ============================================================================
/**
 * Source term computed by a kernel that sees a whole cell at once.
 */
pub struct CellSource {
    kernel: CellKernel,
}

impl CellSource {
    pub fn new<F>(kernel: F) -> Self
    where
        F: Fn(&[f64], &[f64], &[f64], &mut [f64]) + Send + 'static,
    {
        Self { kernel: Box::new(kernel) }
    }
}

impl Hooks for CellSource {}

impl Source for CellSource {
    fn source(
        &mut self,
        qm: &StateArray,
        qp: &StateArray,
        qq: &QuadratureArray,
        _ctx: &mut StepContext,
        s: &mut StateArray,
    ) -> Result<(), Error> {
        check_cells(qm, qq, s)?;

        for i in 0..s.num_rows() {
            (self.kernel)(qp.row(i), qm.row(i + 1), qq.cell(i), s.row_mut(i));
        }
        Ok(())
    }
}
