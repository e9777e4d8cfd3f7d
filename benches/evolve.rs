#![feature(test)]
extern crate test;

use blaw::decomposition::Boundary;
use blaw::dump::MemoryDumper;
use blaw::evolver::SspRk3;
use blaw::flux::LaxFriedrichs;
use blaw::grid::Grid;
use blaw::message::Communicator;
use blaw::parallel::run_ranks;
use blaw::reconstruct::{Polynomial, Reconstructor};
use blaw::schedule::linspace;
use blaw::system::SimpleSystem;
use blaw::{ExecutionMode, Solver};




fn advection(num_cells: usize, mode: ExecutionMode) -> Solver {
    let mut solver = Solver::builder()
        .system(SimpleSystem::new(1, |x, _| vec![(-100.0 * (x - 0.5) * (x - 0.5)).exp()]))
        .flux(LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0))
        .reconstructor(Polynomial::new(5).unwrap())
        .evolver(SspRk3::new())
        .dumper(MemoryDumper::new())
        .boundary(Boundary::Periodic)
        .times(linspace(0.0, 0.1, 101))
        .mode(mode)
        .build()
        .unwrap();
    solver.build_cache(Grid::uniform(0.0, 1.0, num_cells).unwrap()).unwrap();
    solver
}




#[bench]
fn precompute_order_5_operators_on_4096_cells(b: &mut test::Bencher) {
    let grid = Grid::new((0..=4096).map(|i| (i as f64 / 4096.0).powf(1.5)).collect()).unwrap();
    let reconstructor = Polynomial::new(5).unwrap();
    b.iter(|| reconstructor.precompute(&grid).unwrap());
}

#[bench]
fn rk3_advection_1024_cells_single(b: &mut test::Bencher) {
    b.iter(|| advection(1024, ExecutionMode::Single).run().unwrap());
}

#[bench]
fn rk3_advection_1024_cells_over_4_channel_ranks(b: &mut test::Bencher) {
    b.iter(|| {
        run_ranks(4, |comm| {
            let rank = comm.rank();
            advection(1024, ExecutionMode::Distributed(Box::new(comm))).run().map(|_| rank)
        })
        .unwrap()
    });
}
