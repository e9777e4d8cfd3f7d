use log::debug;
use crate::component::{Hooks, Layout};
use crate::context::StepContext;
use crate::error::Error;
use crate::grid::Grid;
use crate::quadrature;
use crate::state::{QuadratureArray, StateArray};
use super::{check_shapes, close_ends, identity_cell, Operators, Reconstructor};




/**
 * Central polynomial reconstruction of order `k`. The point value at `x` in
 * cell `g` is the derivative, at `x`, of the polynomial interpolating the
 * primitive function through the `k + 1` boundaries of the stencil cells `g -
 * r .. g - r + k`, with `r = (k - 1) / 2`. The stencil weights depend only on
 * the grid, so they are precomputed once and may be cached.
 */
pub struct Polynomial {
    order: usize,
    operators: Option<Operators>,
    layout: Option<Layout>,
}




// ============================================================================
impl Polynomial {

    pub fn new(order: usize) -> Result<Self, Error> {
        if order == 0 {
            return Err(Error::Configuration("reconstruction order must be at least 1".into()));
        }
        Ok(Self {
            order,
            operators: None,
            layout: None,
        })
    }

    /// Offset of the target cell within its stencil.
    pub fn stencil_offset(&self) -> usize {
        (self.order - 1) / 2
    }

    pub fn operators(&self) -> Option<&Operators> {
        self.operators.as_ref()
    }

    fn full_stencil_in_grid(&self, g: i64, num_cells: usize) -> bool {
        let r = self.stencil_offset() as i64;
        g - r >= 0 && g - r + self.order as i64 <= num_cells as i64
    }
}




/**
 * Derivative at `x` of the `m`-th Lagrange basis polynomial on the given
 * nodes.
 */
fn lagrange_derivative(nodes: &[f64], m: usize, x: f64) -> f64 {
    let mut total = 0.0;

    for l in 0..nodes.len() {
        if l == m {
            continue;
        }
        let mut term = 1.0 / (nodes[m] - nodes[l]);

        for n in 0..nodes.len() {
            if n != m && n != l {
                term *= (x - nodes[n]) / (nodes[m] - nodes[n]);
            }
        }
        total += term;
    }
    total
}




/**
 * Weights which map the averages of the cells between consecutive `nodes`
 * to the point value at `x`.
 */
fn stencil_weights(nodes: &[f64], x: f64) -> Vec<f64> {
    let k = nodes.len() - 1;
    let derivatives: Vec<f64> = (0..=k).map(|m| lagrange_derivative(nodes, m, x)).collect();

    (0..k)
        .map(|c| {
            let dx = nodes[c + 1] - nodes[c];
            dx * derivatives[c + 1..].iter().sum::<f64>()
        })
        .collect()
}




fn apply(weights: &[f64], q: &StateArray, first_row: usize, out: &mut [f64]) {
    for x in out.iter_mut() {
        *x = 0.0;
    }
    for (c, w) in weights.iter().enumerate() {
        for (o, v) in out.iter_mut().zip(q.row(first_row + c)) {
            *o += w * v;
        }
    }
}




// ============================================================================
impl Hooks for Polynomial {
    fn allocate(&mut self, layout: &Layout) -> Result<(), Error> {
        self.layout = Some(layout.clone());
        Ok(())
    }
}

impl Reconstructor for Polynomial {

    fn order(&self) -> usize {
        self.order
    }

    fn num_quadrature(&self) -> usize {
        quadrature::NUM_POINTS
    }

    fn num_ghost(&self) -> usize {
        let r = self.stencil_offset();
        r.max(self.order - 1 - r) + 1
    }

    fn precompute(&self, grid: &Grid) -> Result<Option<Operators>, Error> {
        let k = self.order;
        let r = self.stencil_offset();
        let n = grid.len();
        let np = quadrature::NUM_POINTS;

        let mut identity = vec![0.0; k];
        identity[r] = 1.0;

        let mut left = Vec::with_capacity(n * k);
        let mut right = Vec::with_capacity(n * k);
        let mut quad = Vec::with_capacity(n * np * k);

        for g in 0..n {
            if self.full_stencil_in_grid(g as i64, n) {
                let nodes = &grid.boundaries()[g - r..g - r + k + 1];
                left.extend(stencil_weights(nodes, grid.boundaries()[g]));
                right.extend(stencil_weights(nodes, grid.boundaries()[g + 1]));

                for x in grid.quadrature_points(g).iter() {
                    quad.extend(stencil_weights(nodes, *x));
                }
            } else {
                left.extend_from_slice(&identity);
                right.extend_from_slice(&identity);

                for _ in 0..np {
                    quad.extend_from_slice(&identity);
                }
            }
        }
        debug!("built order-{} reconstruction operators for {} cells", k, n);

        Ok(Some(Operators {
            order: k,
            num_cells: n,
            left,
            right,
            quadrature: quad,
        }))
    }

    fn restore(&mut self, operators: Option<Operators>) -> Result<(), Error> {
        match operators {
            Some(ops) if ops.order == self.order => {
                self.operators = Some(ops);
                Ok(())
            }
            Some(ops) => Err(Error::CacheMismatch(format!(
                "operators were built for order {}, reconstructor has order {}",
                ops.order, self.order
            ))),
            None => Err(Error::CacheMismatch(format!(
                "order-{} reconstruction needs operators",
                self.order
            ))),
        }
    }

    fn reconstruct(
        &mut self,
        q: &StateArray,
        qm: &mut StateArray,
        qp: &mut StateArray,
        qq: &mut QuadratureArray,
        _ctx: &mut StepContext,
    ) -> Result<(), Error> {
        let ops = self.operators.as_ref().ok_or_else(|| {
            Error::Configuration("reconstruction operators were not built or loaded".into())
        })?;
        let layout = self.layout.as_ref().ok_or_else(|| {
            Error::Configuration("reconstructor used before allocate".into())
        })?;

        check_shapes(q, qm, qp, qq, quadrature::NUM_POINTS)?;

        if q.num_rows() != layout.num_cells() || ops.num_cells != layout.global_cells {
            return Err(Error::Contract(format!(
                "state has {} rows for a window of {} cells ({} operator cells, {} grid cells)",
                q.num_rows(),
                layout.num_cells(),
                ops.num_cells,
                layout.global_cells
            )));
        }

        let k = self.order;
        let r = self.stencil_offset();
        let np = quadrature::NUM_POINTS;
        let n_local = q.num_rows();

        // Ghost rows use the weights of their boundary image, so on a periodic
        // grid a ghost evolves exactly like the cell it copies.
        for j in 0..n_local {
            let g = layout.image_of_row(j);
            let in_window = j >= r && j - r + k <= n_local;

            if !in_window || !self.full_stencil_in_grid(g, ops.num_cells) {
                identity_cell(q, qm, qp, qq, j, np);
                continue;
            }
            let g = g as usize;
            let s = j - r;

            apply(&ops.left[g * k..(g + 1) * k], q, s, qp.row_mut(j));
            apply(&ops.right[g * k..(g + 1) * k], q, s, qm.row_mut(j + 1));

            for l in 0..np {
                let w = &ops.quadrature[(g * np + l) * k..(g * np + l + 1) * k];
                apply(w, q, s, qq.point_mut(j, l));
            }
        }
        close_ends(qm, qp);
        Ok(())
    }
}
