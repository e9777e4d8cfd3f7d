//! Three-point Gauss-Legendre rule on the reference cell `[-1, 1]`. The same
//! nodes serve the cell-averaging operator of the grid, the quadrature
//! reconstruction points, and source integration.

/// Number of quadrature points per cell.
pub const NUM_POINTS: usize = 3;

/// Gauss-Legendre nodes on `[-1, 1]`, in increasing order.
pub fn nodes() -> [f64; NUM_POINTS] {
    let a = (3.0f64 / 5.0).sqrt();
    [-a, 0.0, a]
}

/// Gauss-Legendre weights on `[-1, 1]` (they sum to 2).
pub const WEIGHTS: [f64; NUM_POINTS] = [5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0];

/// Weights which turn point values into a cell average (they sum to 1).
pub const AVERAGE_WEIGHTS: [f64; NUM_POINTS] = [5.0 / 18.0, 8.0 / 18.0, 5.0 / 18.0];

/// Physical locations of the quadrature points in the cell `[a, b]`.
pub fn points_in(a: f64, b: f64) -> [f64; NUM_POINTS] {
    let c = 0.5 * (a + b);
    let h = 0.5 * (b - a);
    let xi = nodes();
    [c + h * xi[0], c + h * xi[1], c + h * xi[2]]
}
