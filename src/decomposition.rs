use serde::{Deserialize, Serialize};
use crate::component::Layout;
use crate::error::Error;
use crate::grid::Grid;
use crate::index_space::{range1d, IndexSpace};




/**
 * The physical boundary condition at the two ends of the domain.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    /// The domain wraps around.
    Periodic,
    /// Ghost cells copy the nearest edge cell (zero-gradient).
    Outflow,
}

impl Boundary {

    /// The interior cell whose data a (possibly ghost) global cell index
    /// stands for, in a grid of `num_cells` cells.
    pub fn image(&self, index: i64, num_cells: usize) -> i64 {
        let n = num_cells as i64;

        match self {
            Boundary::Periodic => index.rem_euclid(n),
            Boundary::Outflow => index.max(0).min(n - 1),
        }
    }
}

impl std::str::FromStr for Boundary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "periodic" => Ok(Boundary::Periodic),
            "outflow" => Ok(Boundary::Outflow),
            _ => Err(Error::Configuration(format!("unknown boundary condition '{}'", s))),
        }
    }
}




// ============================================================================
/**
 * Split of the global cells into contiguous, balanced blocks, one per rank.
 * The first `num_cells % num_ranks` ranks get one extra cell. Each rank's
 * local arrays cover its block padded by `halo` ghost cells on both sides.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Decomposition {
    num_cells: usize,
    halo: usize,
    boundary: Boundary,
    blocks: Vec<IndexSpace>,
}




// ============================================================================
impl Decomposition {

    pub fn new(num_cells: usize, num_ranks: usize, halo: usize, boundary: Boundary) -> Result<Self, Error> {
        if num_ranks == 0 {
            return Err(Error::Decomposition("need at least one rank".into()));
        }
        let base = num_cells / num_ranks;
        let extra = num_cells % num_ranks;
        let mut blocks = Vec::with_capacity(num_ranks);
        let mut start = 0;

        for rank in 0..num_ranks {
            let count = base + if rank < extra { 1 } else { 0 };
            blocks.push(range1d(start as i64..(start + count) as i64));
            start += count;
        }

        // A lone rank fills every ghost from its own cells, however wide the
        // halo; between ranks a ghost block must come from one neighbor.
        let min_cells = if num_ranks == 1 { 1 } else { halo.max(1) };

        if let Some((rank, block)) = blocks.iter().enumerate().find(|(_, b)| b.len() < min_cells) {
            return Err(Error::Decomposition(format!(
                "rank {} owns {} cells but the halo is {} cells wide ({} cells over {} ranks)",
                rank,
                block.len(),
                halo,
                num_cells,
                num_ranks
            )));
        }
        Ok(Self {
            num_cells,
            halo,
            boundary,
            blocks,
        })
    }

    pub fn num_ranks(&self) -> usize {
        self.blocks.len()
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn halo(&self) -> usize {
        self.halo
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Global cells owned by a rank.
    pub fn owned(&self, rank: usize) -> &IndexSpace {
        &self.blocks[rank]
    }

    /// Global cells covered by a rank's local arrays.
    pub fn window(&self, rank: usize) -> IndexSpace {
        self.blocks[rank].extend_all(self.halo as i64)
    }

    /// Number of owned cells per rank.
    pub fn counts(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.len()).collect()
    }

    /// Offset of each rank's block in the gathered array.
    pub fn displacements(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.start() as usize).collect()
    }

    pub fn left_neighbor(&self, rank: usize) -> Option<usize> {
        match (rank, self.boundary) {
            (0, Boundary::Periodic) => Some(self.num_ranks() - 1),
            (0, Boundary::Outflow) => None,
            (r, _) => Some(r - 1),
        }
    }

    pub fn right_neighbor(&self, rank: usize) -> Option<usize> {
        let last = self.num_ranks() - 1;

        match (rank, self.boundary) {
            (r, Boundary::Periodic) if r == last => Some(0),
            (r, Boundary::Outflow) if r == last => None,
            (r, _) => Some(r + 1),
        }
    }

    /// Storage layout of a rank. Ghost cells take the size of their image.
    pub fn layout(&self, rank: usize, grid: &Grid, num_unknowns: usize, num_quadrature: usize) -> Layout {
        let window = self.window(rank);
        let sizes = window
            .iter()
            .map(|g| grid.cell_size(self.boundary.image(g, self.num_cells) as usize))
            .collect();

        Layout {
            window,
            owned: self.blocks[rank].clone(),
            global_cells: self.num_cells,
            sizes,
            num_unknowns,
            num_quadrature,
            halo: self.halo,
            boundary: self.boundary,
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn blocks_are_balanced_and_contiguous() {
        let d = Decomposition::new(10, 3, 2, Boundary::Periodic).unwrap();
        assert_eq!(d.counts(), vec![4, 3, 3]);
        assert_eq!(d.displacements(), vec![0, 4, 7]);
        assert_eq!(d.window(1), range1d(2..9));
    }

    #[test]
    fn ranks_thinner_than_the_halo_are_rejected() {
        assert!(matches!(Decomposition::new(5, 3, 2, Boundary::Outflow), Err(Error::Decomposition(_))));
        assert!(Decomposition::new(6, 3, 2, Boundary::Outflow).is_ok());
    }

    #[test]
    fn a_single_rank_may_be_narrower_than_its_halo() {
        let d = Decomposition::new(8, 1, 9, Boundary::Periodic).unwrap();
        assert_eq!(d.window(0), range1d(-9..17));
        assert!(matches!(Decomposition::new(0, 1, 2, Boundary::Periodic), Err(Error::Decomposition(_))));
    }

    #[test]
    fn neighbors_wrap_only_when_periodic() {
        let p = Decomposition::new(12, 3, 1, Boundary::Periodic).unwrap();
        assert_eq!(p.left_neighbor(0), Some(2));
        assert_eq!(p.right_neighbor(2), Some(0));

        let o = Decomposition::new(12, 3, 1, Boundary::Outflow).unwrap();
        assert_eq!(o.left_neighbor(0), None);
        assert_eq!(o.right_neighbor(2), None);
        assert_eq!(o.right_neighbor(1), Some(2));

        let single = Decomposition::new(12, 1, 1, Boundary::Periodic).unwrap();
        assert_eq!(single.left_neighbor(0), Some(0));
    }

    #[test]
    fn ghost_sizes_follow_the_boundary_image() {
        let grid = Grid::new(vec![0.0, 0.1, 0.3, 0.6, 1.0]).unwrap();
        let periodic = Decomposition::new(4, 1, 1, Boundary::Periodic).unwrap();
        let layout = periodic.layout(0, &grid, 1, 3);
        assert_eq!(layout.sizes.len(), 6);
        assert!((layout.sizes[0] - 0.4).abs() < 1e-15);
        assert!((layout.sizes[5] - 0.1).abs() < 1e-15);

        let outflow = Decomposition::new(4, 1, 1, Boundary::Outflow).unwrap();
        let layout = outflow.layout(0, &grid, 1, 3);
        assert!((layout.sizes[0] - 0.1).abs() < 1e-15);
        assert!((layout.sizes[5] - 0.4).abs() < 1e-15);
    }

    #[test]
    fn boundary_images() {
        assert_eq!(Boundary::Periodic.image(-1, 10), 9);
        assert_eq!(Boundary::Periodic.image(11, 10), 1);
        assert_eq!(Boundary::Outflow.image(-3, 10), 0);
        assert_eq!(Boundary::Outflow.image(12, 10), 9);
    }
}
