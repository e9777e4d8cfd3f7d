use std::f64::consts::PI;
use std::path::PathBuf;
use clap::Parser;
use log::info;
use simple_logger::SimpleLogger;
use blaw::config::{RunConfig, Scheme};
use blaw::decomposition::Boundary;
use blaw::dump::MemoryDumper;
use blaw::flux::LaxFriedrichs;
use blaw::system::SimpleSystem;
use blaw::Solver;

/// Linear advection of a smooth profile at unit speed.
#[derive(Debug, Parser)]
#[clap(version = "0.1")]
struct Opts {
    #[clap(short = 'n', long, default_value = "100")]
    num_cells: usize,

    #[clap(short = 's', long, default_value = "250")]
    num_steps: usize,

    #[clap(short = 't', long, default_value = "1.0")]
    t_last: f64,

    #[clap(short = 'k', long, default_value = "1")]
    order: usize,

    #[clap(long, default_value = "fe")]
    scheme: Scheme,

    #[clap(long, default_value = "periodic")]
    boundary: Boundary,

    #[clap(long)]
    cache: Option<PathBuf>,

    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    #[clap(long, default_value = "0")]
    trace: usize,

    #[clap(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    SimpleLogger::new()
        .with_level(if opts.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init()?;

    let config = RunConfig {
        num_cells: opts.num_cells,
        num_steps: opts.num_steps,
        t_last: opts.t_last,
        order: opts.order,
        scheme: opts.scheme,
        boundary: opts.boundary,
        trace: opts.trace,
        monitor_mass: true,
        cache: opts.cache.clone(),
        output: opts.output.clone(),
        ..RunConfig::default()
    };
    let recorder = MemoryDumper::new();

    let mut solver = Solver::builder()
        .system(SimpleSystem::new(1, |x, _| vec![1.0 + 0.5 * (2.0 * PI * x).sin()]).with_parameter("speed", 1.0))
        .flux(LaxFriedrichs::new(|q, f| f[0] = q[0], 1.0))
        .dumper(recorder.clone())
        .configure(&config)?
        .build()?;

    solver.ensure_cache(config.grid()?)?;
    let summary = solver.run()?;

    info!("{:?} after {} steps, {} dumps", summary.status, summary.steps, summary.dumps);
    info!("mass drift {:.3e}", summary.diagnostics.mass_drift());

    if opts.output.is_none() {
        let output = recorder.output();
        if let (Some(first), Some(last)) = (output.snapshots.first(), output.snapshots.last()) {
            info!("max change over the run {:.3e}", first.max_abs_difference(last));
        }
    }
    Ok(())
}
