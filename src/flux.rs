use crate::component::{Hooks, Layout};
use crate::context::StepContext;
use crate::error::Error;
use crate::state::StateArray;




/// A point flux function `F(q, f)`: writes the physical flux of the state
/// `q` into `f`.
pub type FluxKernel = Box<dyn Fn(&[f64], &mut [f64]) + Send>;

/// Boundary hook of a numerical flux: may overwrite the net flux `f` of the
/// local cells once it has been computed. Row `i` of `f` is the cell at
/// global index `layout.window.start() + i`.
pub type FluxBoundary = Box<dyn Fn(&StepContext, &Layout, &mut StateArray) + Send>;




/**
 * Turns interface reconstructions into the net flux contribution of each
 * cell to its time derivative.
 */
pub trait Flux: Hooks + Send {

    /// Write `f[i] = -(F_{i+1/2} - F_{i-1/2}) / dx_i` for every local cell,
    /// given the interface limits `qm` and `qp`.
    fn flux(&mut self, qm: &StateArray, qp: &StateArray, ctx: &mut StepContext, f: &mut StateArray) -> Result<(), Error>;

    /// Upper bound on the characteristic speeds, used in the CFL check.
    fn max_wave_speed(&self) -> f64 {
        0.0
    }
}




// ============================================================================
/**
 * The Lax-Friedrichs (Rusanov) numerical flux with a fixed dissipation
 * speed `alpha`: `F̂ = (F(qm) + F(qp) - alpha (qp - qm)) / 2`.
 *
 * The net flux of the first and last `virtual_cells` cells of the global
 * grid is zeroed, freezing them. An optional boundary hook then gets the
 * last word on the net flux of every local cell.
 */
pub struct LaxFriedrichs {
    kernel: FluxKernel,
    alpha: f64,
    virtual_cells: usize,
    boundary: Option<FluxBoundary>,
    layout: Option<Layout>,
    sizes: Vec<f64>,
    interface: StateArray,
    fm: Vec<f64>,
    fp: Vec<f64>,
}




// ============================================================================
impl LaxFriedrichs {

    pub fn new<F>(kernel: F, alpha: f64) -> Self
    where
        F: Fn(&[f64], &mut [f64]) + Send + 'static,
    {
        Self {
            kernel: Box::new(kernel),
            alpha,
            virtual_cells: 0,
            boundary: None,
            layout: None,
            sizes: Vec::new(),
            interface: StateArray::zeros(0, 0),
            fm: Vec::new(),
            fp: Vec::new(),
        }
    }

    /// Zero the net flux of this many cells at each end of the grid.
    pub fn with_virtual_cells(mut self, count: usize) -> Self {
        self.virtual_cells = count;
        self
    }

    /// Install a hook which may overwrite the net flux after each
    /// evaluation.
    pub fn with_boundary<B>(mut self, boundary: B) -> Self
    where
        B: Fn(&StepContext, &Layout, &mut StateArray) + Send + 'static,
    {
        self.boundary = Some(Box::new(boundary));
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn virtual_cells(&self) -> usize {
        self.virtual_cells
    }

    /// The interface fluxes of the most recent evaluation.
    pub fn interface_fluxes(&self) -> &StateArray {
        &self.interface
    }
}

impl Hooks for LaxFriedrichs {
    fn allocate(&mut self, layout: &Layout) -> Result<(), Error> {
        let p = layout.num_unknowns;

        if 2 * self.virtual_cells > layout.global_cells {
            return Err(Error::Configuration(format!(
                "{} virtual cells on each side of a {}-cell grid",
                self.virtual_cells, layout.global_cells
            )));
        }
        self.layout = Some(layout.clone());
        self.sizes = layout.sizes.clone();
        self.interface = StateArray::zeros(layout.num_cells() + 1, p);
        self.fm = vec![0.0; p];
        self.fp = vec![0.0; p];
        Ok(())
    }
}

impl Flux for LaxFriedrichs {

    fn flux(&mut self, qm: &StateArray, qp: &StateArray, ctx: &mut StepContext, f: &mut StateArray) -> Result<(), Error> {
        let n = self.sizes.len();

        if qm.shape() != self.interface.shape() || qp.shape() != self.interface.shape() || f.shape() != (n, self.fm.len()) {
            return Err(Error::Contract(format!(
                "flux arrays {:?} {:?} -> {:?} do not match the allocated {} cells",
                qm.shape(),
                qp.shape(),
                f.shape(),
                n
            )));
        }

        for j in 0..=n {
            let (l, r) = (qm.row(j), qp.row(j));
            (self.kernel)(l, &mut self.fm);
            (self.kernel)(r, &mut self.fp);

            for (k, x) in self.interface.row_mut(j).iter_mut().enumerate() {
                *x = 0.5 * (self.fm[k] + self.fp[k] - self.alpha * (r[k] - l[k]));
            }
        }

        for i in 0..n {
            let dx = self.sizes[i];
            let (lo, hi) = (self.interface.row(i), self.interface.row(i + 1));

            for (k, x) in f.row_mut(i).iter_mut().enumerate() {
                *x = -(hi[k] - lo[k]) / dx;
            }
        }

        if let Some(layout) = self.layout.as_ref() {
            if self.virtual_cells > 0 {
                let lo = self.virtual_cells as i64;
                let hi = (layout.global_cells - self.virtual_cells) as i64;

                for (i, g) in layout.window.iter().enumerate() {
                    if g < lo || g >= hi {
                        f.row_mut(i).iter_mut().for_each(|x| *x = 0.0);
                    }
                }
            }
            if let Some(boundary) = self.boundary.as_ref() {
                boundary(&*ctx, layout, f);
            }
        }
        Ok(())
    }

    fn max_wave_speed(&self) -> f64 {
        self.alpha.abs()
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::context::Diagnostics;
    use crate::decomposition::Boundary;
    use crate::index_space::range1d;

    fn layout(n: usize, dx: f64) -> Layout {
        Layout {
            window: range1d(0..n as i64),
            owned: range1d(0..n as i64),
            global_cells: n,
            sizes: vec![dx; n],
            num_unknowns: 1,
            num_quadrature: 0,
            halo: 0,
            boundary: Boundary::Periodic,
        }
    }

    #[test]
    fn upwind_advection_flux() {
        let mut flux = LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0);
        flux.allocate(&layout(3, 0.5)).unwrap();

        let qm = StateArray::from_vec(4, 1, vec![0.0, 1.0, 2.0, 4.0]).unwrap();
        let qp = StateArray::from_vec(4, 1, vec![1.0, 2.0, 4.0, 4.0]).unwrap();
        let mut f = StateArray::zeros(3, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.0, 0.1, &mut diagnostics);
        flux.flux(&qm, &qp, &mut ctx, &mut f).unwrap();

        assert_eq!(flux.interface_fluxes().as_slice(), &[0.0, 1.0, 2.0, 4.0]);
        assert_eq!(f.as_slice(), &[-2.0, -2.0, -4.0]);
    }

    #[test]
    fn net_flux_of_uniform_state_vanishes() {
        let mut flux = LaxFriedrichs::new(|q, f| f[0] = 0.5 * q[0] * q[0], 2.0);
        flux.allocate(&layout(4, 0.25)).unwrap();

        let mut q = StateArray::zeros(5, 1);
        q.fill(3.0);
        let mut f = StateArray::zeros(4, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.0, 0.1, &mut diagnostics);
        flux.flux(&q, &q, &mut ctx, &mut f).unwrap();
        assert!(f.as_slice().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn virtual_cells_have_no_net_flux() {
        let mut flux = LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0).with_virtual_cells(1);
        let mut wide = layout(4, 0.5);
        wide.window = range1d(-1..5);
        wide.sizes = vec![0.5; 6];
        flux.allocate(&wide).unwrap();

        let qm = StateArray::from_vec(7, 1, vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let qp = StateArray::from_vec(7, 1, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 5.0]).unwrap();
        let mut f = StateArray::zeros(6, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.0, 0.1, &mut diagnostics);
        flux.flux(&qm, &qp, &mut ctx, &mut f).unwrap();

        // Ghosts -1 and 4 and edge cells 0 and 3 are frozen.
        assert_eq!(f.as_slice(), &[0.0, 0.0, -2.0, -2.0, 0.0, 0.0]);
    }

    #[test]
    fn too_many_virtual_cells_are_rejected() {
        let mut flux = LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0).with_virtual_cells(3);
        assert!(matches!(flux.allocate(&layout(5, 0.2)), Err(Error::Configuration(_))));
    }

    #[test]
    fn boundary_hook_overwrites_the_net_flux() {
        let mut flux = LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0).with_boundary(|ctx, layout, f| {
            let last = layout.num_cells() - 1;
            f.row_mut(last)[0] = ctx.stage_time;
        });
        flux.allocate(&layout(3, 0.5)).unwrap();

        let qm = StateArray::from_vec(4, 1, vec![0.0, 1.0, 2.0, 4.0]).unwrap();
        let qp = StateArray::from_vec(4, 1, vec![1.0, 2.0, 4.0, 4.0]).unwrap();
        let mut f = StateArray::zeros(3, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.25, 0.1, &mut diagnostics);
        flux.flux(&qm, &qp, &mut ctx, &mut f).unwrap();

        assert_eq!(f.as_slice(), &[-2.0, -2.0, 0.25]);
    }

    #[test]
    fn unallocated_flux_rejects_arrays() {
        let mut flux = LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0);
        let q = StateArray::zeros(5, 1);
        let mut f = StateArray::zeros(4, 1);
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(0, 0.0, 0.1, &mut diagnostics);
        assert!(flux.flux(&q, &q, &mut ctx, &mut f).is_err());
    }
}
