use crate::context::StepContext;
use crate::decomposition::Boundary;
use crate::error::Error;
use crate::index_space::IndexSpace;
use crate::state::StateArray;




/**
 * Local storage layout of one worker: which global cells the local arrays
 * cover, and which of them this worker owns. Components size their scratch
 * buffers from it.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    /// Global cell indexes of the local arrays (owned cells plus ghosts).
    pub window: IndexSpace,
    /// Global cell indexes owned by this worker.
    pub owned: IndexSpace,
    /// Total number of cells in the global grid.
    pub global_cells: usize,
    /// Size of each local cell; ghost sizes are those of their boundary
    /// image.
    pub sizes: Vec<f64>,
    pub num_unknowns: usize,
    pub num_quadrature: usize,
    pub halo: usize,
    /// Which interior cell each ghost stands for.
    pub boundary: Boundary,
}

impl Layout {

    /// Number of local cells, ghosts included.
    pub fn num_cells(&self) -> usize {
        self.window.len()
    }

    /// Local row range of the owned cells.
    pub fn owned_rows(&self) -> std::ops::Range<usize> {
        self.owned.rows_in(&self.window)
    }

    /// Local row of a global cell index.
    pub fn row_of(&self, global: i64) -> usize {
        self.window.offset(global)
    }

    /// The interior cell a local row stands for: the cell itself if it lies
    /// in the grid, otherwise its boundary image.
    pub fn image_of_row(&self, row: usize) -> i64 {
        self.boundary.image(self.window.start() + row as i64, self.global_cells)
    }
}




/**
 * Optional life-cycle hooks shared by every solver component. Each method
 * defaults to doing nothing, so a component implements only the ones it
 * needs.
 */
pub trait Hooks {

    /// Size private scratch buffers for the given layout. Called once per
    /// run, before the initial condition is set.
    fn allocate(&mut self, _layout: &Layout) -> Result<(), Error> {
        Ok(())
    }

    /// Last-minute setup which needs the initial state.
    fn pre_run(&mut self, _t0: f64, _q0: &StateArray) -> Result<(), Error> {
        Ok(())
    }

    /// Observe a completed step.
    fn on_step(&mut self, _ctx: &StepContext) {}
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::Layout;
    use crate::decomposition::Boundary;
    use crate::index_space::range1d;

    #[test]
    fn owned_rows_are_offset_by_halo() {
        let layout = Layout {
            window: range1d(8..22),
            owned: range1d(10..20),
            global_cells: 40,
            sizes: vec![0.1; 14],
            num_unknowns: 1,
            num_quadrature: 0,
            halo: 2,
            boundary: Boundary::Periodic,
        };
        assert_eq!(layout.num_cells(), 14);
        assert_eq!(layout.owned_rows(), 2..12);
        assert_eq!(layout.row_of(10), 2);
    }

    #[test]
    fn ghost_rows_map_to_their_images() {
        let mut layout = Layout {
            window: range1d(-2..6),
            owned: range1d(0..4),
            global_cells: 4,
            sizes: vec![0.25; 8],
            num_unknowns: 1,
            num_quadrature: 0,
            halo: 2,
            boundary: Boundary::Periodic,
        };
        let images: Vec<i64> = (0..8).map(|j| layout.image_of_row(j)).collect();
        assert_eq!(images, vec![2, 3, 0, 1, 2, 3, 0, 1]);

        layout.boundary = Boundary::Outflow;
        let images: Vec<i64> = (0..8).map(|j| layout.image_of_row(j)).collect();
        assert_eq!(images, vec![0, 0, 0, 1, 2, 3, 3, 3]);
    }
}
