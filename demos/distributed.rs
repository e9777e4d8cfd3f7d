use std::f64::consts::PI;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;
use clap::Parser;
use log::info;
use simple_logger::SimpleLogger;
use blaw::config::{RunConfig, Scheme};
use blaw::dump::MemoryDumper;
use blaw::flux::LaxFriedrichs;
use blaw::message::{Communicator, TcpCommunicator};
use blaw::parallel::run_ranks;
use blaw::system::SimpleSystem;
use blaw::{Error, ExecutionMode, RunSummary, Solver};

/// Run the same advection problem on one worker and on several, and compare
/// the final solutions.
#[derive(Debug, Parser)]
#[clap(version = "0.1")]
struct Opts {
    #[clap(short = 'r', long, default_value = "4")]
    num_ranks: usize,

    #[clap(short = 'n', long, default_value = "400")]
    num_cells: usize,

    #[clap(short = 'k', long, default_value = "3")]
    order: usize,

    /// Talk over TCP on localhost instead of in-process channels.
    #[clap(long)]
    tcp: bool,

    #[clap(short = 'p', long, default_value = "7100")]
    port: u16,
}

fn peer(port: u16, rank: usize) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port + rank as u16)
}

fn solve(config: &RunConfig, mode: ExecutionMode) -> Result<RunSummary, Error> {
    let mut solver = Solver::builder()
        .system(SimpleSystem::new(1, |x, _| vec![(-50.0 * (x - 0.5) * (x - 0.5)).exp() + 0.1 * (2.0 * PI * x).cos()]))
        .flux(LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0))
        .dumper(MemoryDumper::new())
        .mode(mode)
        .configure(config)?
        .build()?;
    solver.build_cache(config.grid()?)?;
    solver.run()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();
    SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;

    let config = RunConfig {
        num_cells: opts.num_cells,
        num_steps: 4 * opts.num_cells,
        order: opts.order,
        scheme: Scheme::SspRk3,
        monitor_mass: true,
        ..RunConfig::default()
    };

    let single = solve(&config, ExecutionMode::Single)?;

    let summaries: Vec<Result<RunSummary, Error>> = if opts.tcp {
        let peers: Vec<_> = (0..opts.num_ranks).map(|rank| peer(opts.port, rank)).collect();
        let procs: Vec<_> = (0..opts.num_ranks)
            .map(|rank| {
                let peers = peers.clone();
                let config = config.clone();
                thread::spawn(move || {
                    let comm = TcpCommunicator::new(rank, peers)?;
                    solve(&config, ExecutionMode::Distributed(Box::new(comm)))
                })
            })
            .collect();
        procs
            .into_iter()
            .map(|process| {
                process
                    .join()
                    .unwrap_or_else(|_| Err(Error::Communication("rank thread panicked".into())))
            })
            .collect()
    } else {
        run_ranks(opts.num_ranks, |comm| {
            let rank = comm.rank();
            info!("starting rank {}", rank);
            solve(&config, ExecutionMode::Distributed(Box::new(comm)))
        })?
    };

    let mut summaries = summaries.into_iter().collect::<Result<Vec<_>, _>>()?;
    let coordinator = summaries.remove(0);

    match (coordinator.solution, single.solution) {
        (Some(distributed), Some(reference)) => {
            info!(
                "{} ranks vs one: max difference {:.3e}, mass drift {:.3e}",
                opts.num_ranks,
                distributed.max_abs_difference(&reference),
                coordinator.diagnostics.mass_drift()
            );
        }
        _ => return Err(Box::new(Error::Communication("coordinator returned no solution".into()))),
    }
    Ok(())
}
