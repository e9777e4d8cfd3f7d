use std::path::PathBuf;
use clap::Parser;
use log::info;
use simple_logger::SimpleLogger;
use blaw::config::{RunConfig, Scheme};
use blaw::decomposition::Boundary;
use blaw::dump::{read_output, MemoryDumper};
use blaw::flux::LaxFriedrichs;
use blaw::source::GaussSource;
use blaw::system::SimpleSystem;
use blaw::Solver;

/// Shallow water over a flat bed with linear bottom drag: a hump of water
/// spreading out toward outflow boundaries.
#[derive(Debug, Parser)]
#[clap(version = "0.1")]
struct Opts {
    #[clap(short = 'n', long, default_value = "200")]
    num_cells: usize,

    #[clap(short = 's', long, default_value = "400")]
    num_steps: usize,

    #[clap(short = 't', long, default_value = "0.25")]
    t_last: f64,

    #[clap(short = 'k', long, default_value = "3")]
    order: usize,

    #[clap(short = 'g', long, default_value = "9.81")]
    gravity: f64,

    #[clap(short = 'd', long, default_value = "0.5")]
    drag: f64,

    /// Upper bound on |u| + sqrt(g h), used as the Lax-Friedrichs speed.
    #[clap(short = 'a', long, default_value = "4.0")]
    alpha: f64,

    #[clap(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();
    SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;

    let g = opts.gravity;
    let drag = opts.drag;

    let config = RunConfig {
        domain: (0.0, 1.0),
        num_cells: opts.num_cells,
        num_steps: opts.num_steps,
        t_last: opts.t_last,
        order: opts.order,
        scheme: Scheme::SspRk3,
        boundary: Boundary::Outflow,
        monitor_mass: true,
        output: opts.output.clone(),
        ..RunConfig::default()
    };

    let system = SimpleSystem::new(2, |x, _| vec![1.0 + 0.2 * (-100.0 * (x - 0.5) * (x - 0.5)).exp(), 0.0])
        .with_parameter("gravity", g)
        .with_parameter("drag", drag);

    let flux = LaxFriedrichs::new(
        move |q, f| {
            let (h, hu) = (q[0], q[1]);
            f[0] = hu;
            f[1] = hu * hu / h + 0.5 * g * h * h;
        },
        opts.alpha,
    );

    let source = GaussSource::new(move |q, s| {
        s[0] = 0.0;
        s[1] = -drag * q[1];
    });

    let mut solver = Solver::builder()
        .system(system)
        .flux(flux)
        .source(source)
        .dumper(MemoryDumper::new())
        .configure(&config)?
        .build()?;

    solver.build_cache(config.grid()?)?;
    let summary = solver.run()?;

    info!(
        "{:?}: {} steps, {} dumps, mass drift {:.3e}",
        summary.status,
        summary.steps,
        summary.dumps,
        summary.diagnostics.mass_drift()
    );

    if let Some(path) = &opts.output {
        let output = read_output(path)?;
        info!("{} holds {} snapshots of {} cells", path.display(), output.len(), config.num_cells);
    }
    Ok(())
}
