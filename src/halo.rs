use std::ops::Range;
use log::debug;
use crate::decomposition::Decomposition;
use crate::error::Error;
use crate::message::{Communicator, Mailbox, Tag};
use crate::state::StateArray;




/**
 * Keeps the ghost cells of one rank's local state consistent with the
 * owned cells of its neighbors (or with the physical boundary), and performs
 * the collective operations a run needs: gathering the solution to the
 * coordinator and summing a scalar over all ranks.
 *
 * Every rank must call the same sequence of operations; each kind of
 * operation carries its own sequence number, so messages from a rank which
 * is a step ahead are held rather than mistaken for the current ones.
 */
pub struct HaloExchange {
    rank: usize,
    decomposition: Decomposition,
    mailbox: Option<Mailbox>,
    exchanges: u64,
    gathers: u64,
    reductions: u64,
}




// ============================================================================
impl HaloExchange {

    /// Exchange for a single-process run: every ghost cell is filled from
    /// the local owned cells according to the boundary condition.
    pub fn single(decomposition: Decomposition) -> Result<Self, Error> {
        if decomposition.num_ranks() != 1 {
            return Err(Error::Decomposition(format!(
                "single-process run over {} ranks",
                decomposition.num_ranks()
            )));
        }
        Ok(Self {
            rank: 0,
            decomposition,
            mailbox: None,
            exchanges: 0,
            gathers: 0,
            reductions: 0,
        })
    }

    /// Exchange over a communicator whose size matches the decomposition.
    pub fn distributed(decomposition: Decomposition, comm: Box<dyn Communicator>) -> Result<Self, Error> {
        if comm.size() != decomposition.num_ranks() {
            return Err(Error::Decomposition(format!(
                "communicator has {} ranks, decomposition has {}",
                comm.size(),
                decomposition.num_ranks()
            )));
        }
        Ok(Self {
            rank: comm.rank(),
            decomposition,
            mailbox: Some(Mailbox::new(comm)),
            exchanges: 0,
            gathers: 0,
            reductions: 0,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    /// Local rows of the owned cells.
    pub fn owned_rows(&self) -> Range<usize> {
        let h = self.decomposition.halo();
        h..h + self.decomposition.owned(self.rank).len()
    }

    fn mailbox(&mut self) -> Result<&mut Mailbox, Error> {
        self.mailbox
            .as_mut()
            .ok_or_else(|| Error::Decomposition("remote neighbor in a single-process run".into()))
    }

    fn fill_from_image(&self, q: &mut StateArray, rows: Range<usize>) -> Result<(), Error> {
        let d = &self.decomposition;
        let window = d.window(self.rank);
        let owned = d.owned(self.rank);

        for j in rows {
            let image = d.boundary().image(window.start() + j as i64, d.num_cells());

            if !owned.contains(image) {
                return Err(Error::Decomposition(format!(
                    "ghost image {} is not owned by rank {}",
                    image, self.rank
                )));
            }
            let src = window.offset(image);
            q.copy_rows_within(src..src + 1, j);
        }
        Ok(())
    }

    fn place(q: &mut StateArray, rows: Range<usize>, payload: &[f64]) -> Result<(), Error> {
        let target = q.select_mut(rows);

        if target.len() != payload.len() {
            return Err(Error::Communication(format!(
                "received {} values for a block of {}",
                payload.len(),
                target.len()
            )));
        }
        target.copy_from_slice(payload);
        Ok(())
    }




    /**
     * Fill the ghost cells of `q` (the local array of this rank). The first
     * `halo` owned rows go to the left neighbor and the last `halo` owned
     * rows to the right neighbor, then the ghost blocks are received.
     */
    pub fn exchange(&mut self, q: &mut StateArray) -> Result<(), Error> {
        let h = self.decomposition.halo();
        let owned = self.owned_rows();
        let rank = self.rank;
        let left = self.decomposition.left_neighbor(rank).filter(|&l| l != rank);
        let right = self.decomposition.right_neighbor(rank).filter(|&r| r != rank);
        let seq = self.exchanges;
        self.exchanges += 1;

        if q.num_rows() != owned.end + h {
            return Err(Error::Contract(format!(
                "local state has {} rows, window has {}",
                q.num_rows(),
                owned.end + h
            )));
        }

        if let Some(l) = left {
            let block = q.select(owned.start..owned.start + h).to_vec();
            self.mailbox()?.send(l, Tag::RightGhosts, seq, block)?;
        }
        if let Some(r) = right {
            let block = q.select(owned.end - h..owned.end).to_vec();
            self.mailbox()?.send(r, Tag::LeftGhosts, seq, block)?;
        }

        match left {
            Some(l) => {
                let payload = self.mailbox()?.receive(Tag::LeftGhosts, seq, l)?;
                Self::place(q, 0..h, &payload)?;
            }
            None => self.fill_from_image(q, 0..h)?,
        }
        match right {
            Some(r) => {
                let payload = self.mailbox()?.receive(Tag::RightGhosts, seq, r)?;
                Self::place(q, owned.end..owned.end + h, &payload)?;
            }
            None => self.fill_from_image(q, owned.end..owned.end + h)?,
        }
        Ok(())
    }




    /**
     * Collect the owned cells of every rank on the coordinator, in global
     * order. The coordinator gets the whole solution; other ranks get
     * `None`.
     */
    pub fn gather(&mut self, q: &StateArray) -> Result<Option<StateArray>, Error> {
        let p = q.num_fields();
        let owned = self.owned_rows();
        let seq = self.gathers;
        self.gathers += 1;

        if self.mailbox.is_none() {
            let mut out = StateArray::zeros(owned.len(), p);
            out.as_mut_slice().copy_from_slice(q.select(owned));
            return Ok(Some(out));
        }
        if !self.is_coordinator() {
            let block = q.select(owned).to_vec();
            self.mailbox()?.send(0, Tag::Gather, seq, block)?;
            return Ok(None);
        }

        let counts = self.decomposition.counts();
        let displacements = self.decomposition.displacements();
        let mut out = StateArray::zeros(self.decomposition.num_cells(), p);
        out.select_mut(displacements[0]..displacements[0] + counts[0])
            .copy_from_slice(q.select(owned));

        for r in 1..self.decomposition.num_ranks() {
            let payload = self.mailbox()?.receive(Tag::Gather, seq, r)?;
            Self::place(&mut out, displacements[r]..displacements[r] + counts[r], &payload)?;
        }
        debug!("gathered {} cells from {} ranks", out.num_rows(), counts.len());
        Ok(Some(out))
    }




    /**
     * Sum a scalar over all ranks. Every rank gets the total, which is
     * accumulated in rank order so all ranks agree bit for bit.
     */
    pub fn reduce_sum(&mut self, value: f64) -> Result<f64, Error> {
        let seq = self.reductions;
        self.reductions += 1;

        if self.mailbox.is_none() {
            return Ok(value);
        }
        let num_ranks = self.decomposition.num_ranks();

        if self.is_coordinator() {
            let mut total = value;

            for r in 1..num_ranks {
                let partial = self.mailbox()?.receive(Tag::Partial, seq, r)?;
                total += partial.first().copied().ok_or_else(|| {
                    Error::Communication(format!("empty reduction partial from rank {}", r))
                })?;
            }
            for r in 1..num_ranks {
                self.mailbox()?.send(r, Tag::Total, seq, vec![total])?;
            }
            Ok(total)
        } else {
            let mailbox = self.mailbox()?;
            mailbox.send(0, Tag::Partial, seq, vec![value])?;
            let total = mailbox.receive(Tag::Total, seq, 0)?;
            total
                .first()
                .copied()
                .ok_or_else(|| Error::Communication("empty reduction total".into()))
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::decomposition::Boundary;
    use crate::parallel::run_ranks;

    fn local_state(d: &Decomposition, rank: usize) -> StateArray {
        let window = d.window(rank);
        let owned = d.owned(rank).clone();
        let mut q = StateArray::zeros(window.len(), 2);

        for g in owned.iter() {
            q.row_mut(window.offset(g)).copy_from_slice(&[g as f64, -(g as f64)]);
        }
        q
    }

    #[test]
    fn single_periodic_exchange_wraps() {
        let d = Decomposition::new(6, 1, 2, Boundary::Periodic).unwrap();
        let mut q = local_state(&d, 0);
        let mut halo = HaloExchange::single(d).unwrap();
        halo.exchange(&mut q).unwrap();
        let column: Vec<f64> = q.rows().map(|r| r[0]).collect();
        assert_eq!(column, vec![4.0, 5.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 1.0]);
    }

    #[test]
    fn single_outflow_exchange_copies_edges() {
        let d = Decomposition::new(4, 1, 2, Boundary::Outflow).unwrap();
        let mut q = local_state(&d, 0);
        let mut halo = HaloExchange::single(d).unwrap();
        halo.exchange(&mut q).unwrap();
        let column: Vec<f64> = q.rows().map(|r| r[0]).collect();
        assert_eq!(column, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn ghosts_match_neighbor_owned_cells() {
        for &boundary in &[Boundary::Periodic, Boundary::Outflow] {
            let d = Decomposition::new(17, 4, 3, boundary).unwrap();

            let results = run_ranks(4, |comm| {
                let rank = comm.rank();
                let mut q = local_state(&d, rank);
                let mut halo = HaloExchange::distributed(d.clone(), Box::new(comm)).unwrap();
                halo.exchange(&mut q).unwrap();
                halo.exchange(&mut q).unwrap();
                q
            })
            .unwrap();

            for (rank, q) in results.iter().enumerate() {
                let window = d.window(rank);

                for (j, g) in window.iter().enumerate() {
                    let image = boundary.image(g, 17) as f64;
                    assert_eq!(q.row(j), &[image, -image], "rank {} cell {}", rank, g);
                }
            }
        }
    }

    #[test]
    fn gather_and_reduce_over_three_ranks() {
        let d = Decomposition::new(10, 3, 1, Boundary::Periodic).unwrap();

        let results = run_ranks(3, |comm| {
            let rank = comm.rank();
            let q = local_state(&d, rank);
            let mut halo = HaloExchange::distributed(d.clone(), Box::new(comm)).unwrap();
            let gathered = halo.gather(&q).unwrap();
            let total = halo.reduce_sum(rank as f64 + 1.0).unwrap();
            (gathered, total)
        })
        .unwrap();

        let whole = results[0].0.as_ref().unwrap();
        let column: Vec<f64> = whole.rows().map(|r| r[0]).collect();
        assert_eq!(column, (0..10).map(|g| g as f64).collect::<Vec<_>>());
        assert!(results[1].0.is_none());
        assert!(results.iter().all(|(_, total)| *total == 6.0));
    }

    #[test]
    fn empty_partial_sum_is_a_communication_error() {
        let d = Decomposition::new(4, 2, 1, Boundary::Periodic).unwrap();

        let results = run_ranks(2, |comm| {
            if comm.rank() == 0 {
                let mut halo = HaloExchange::distributed(d.clone(), Box::new(comm)).unwrap();
                matches!(halo.reduce_sum(1.0), Err(Error::Communication(_)))
            } else {
                Mailbox::new(Box::new(comm)).send(0, Tag::Partial, 0, vec![]).unwrap();
                true
            }
        })
        .unwrap();
        assert!(results.iter().all(|ok| *ok));
    }
}
