use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::cache::{self, CacheBundle, CACHE_VERSION};
use crate::component::{Hooks, Layout};
use crate::config::RunConfig;
use crate::context::{Diagnostics, StepContext};
use crate::decomposition::{Boundary, Decomposition};
use crate::dump::{CborDumper, Dims, DumpHeader, Dumper};
use crate::error::Error;
use crate::evolver::{Evolver, Pipeline};
use crate::flux::Flux;
use crate::grid::Grid;
use crate::halo::HaloExchange;
use crate::message::Communicator;
use crate::reconstruct::Reconstructor;
use crate::schedule::DumpSchedule;
use crate::source::Source;
use crate::state::StateArray;
use crate::system::System;




/**
 * How the cells of a run are spread over workers.
 */
pub enum ExecutionMode {
    /// One worker owns every cell.
    Single,
    /// Each rank of the communicator owns a contiguous block of cells.
    Distributed(Box<dyn Communicator>),
}




/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunStatus {
    Completed,
    /// The run was stopped after the configured trace step.
    TraceStop { step: usize },
}




/**
 * What a run returns: how it ended, how far it got, what it observed, and
 * (on the coordinator) the final solution on the owned cells of the whole
 * grid.
 */
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub status: RunStatus,
    pub steps: usize,
    pub dumps: usize,
    pub final_time: f64,
    pub diagnostics: Diagnostics,
    pub solution: Option<StateArray>,
}




// ============================================================================
/**
 * Collects the components and settings of a solver, and checks them in
 * `build`.
 */
pub struct SolverBuilder {
    system: Option<Box<dyn System>>,
    reconstructor: Option<Box<dyn Reconstructor>>,
    flux: Option<Box<dyn Flux>>,
    source: Option<Box<dyn Source>>,
    evolver: Option<Box<dyn Evolver>>,
    dumper: Option<Box<dyn Dumper>>,
    times: Option<Vec<f64>>,
    dumps: Option<Vec<f64>>,
    boundary: Boundary,
    mode: ExecutionMode,
    cache_path: Option<PathBuf>,
    trace: usize,
    monitor_mass: bool,
}

impl Default for SolverBuilder {
    fn default() -> Self {
        Self {
            system: None,
            reconstructor: None,
            flux: None,
            source: None,
            evolver: None,
            dumper: None,
            times: None,
            dumps: None,
            boundary: Boundary::Periodic,
            mode: ExecutionMode::Single,
            cache_path: None,
            trace: 0,
            monitor_mass: false,
        }
    }
}

impl SolverBuilder {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn system<S: System + 'static>(mut self, system: S) -> Self {
        self.system = Some(Box::new(system));
        self
    }

    pub fn reconstructor<R: Reconstructor + 'static>(mut self, reconstructor: R) -> Self {
        self.reconstructor = Some(Box::new(reconstructor));
        self
    }

    pub fn flux<F: Flux + 'static>(mut self, flux: F) -> Self {
        self.flux = Some(Box::new(flux));
        self
    }

    pub fn source<S: Source + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn evolver<E: Evolver + 'static>(mut self, evolver: E) -> Self {
        self.evolver = Some(Box::new(evolver));
        self
    }

    pub fn dumper<D: Dumper + 'static>(mut self, dumper: D) -> Self {
        self.dumper = Some(Box::new(dumper));
        self
    }

    pub fn times(mut self, times: Vec<f64>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn dump_times(mut self, dumps: Vec<f64>) -> Self {
        self.dumps = Some(dumps);
        self
    }

    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn cache<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Stop the run after the given step (zero disables).
    pub fn trace(mut self, step: usize) -> Self {
        self.trace = step;
        self
    }

    pub fn monitor_mass(mut self, on: bool) -> Self {
        self.monitor_mass = on;
        self
    }

    /// Take the scheme, reconstruction order, time grid, dump schedule,
    /// boundary condition, trace step, cache path and output file from a
    /// run configuration.
    pub fn configure(mut self, config: &RunConfig) -> Result<Self, Error> {
        self.times = Some(config.times()?);
        self.dumps = config.dumps.clone();
        self.boundary = config.boundary;
        self.trace = config.trace;
        self.monitor_mass = config.monitor_mass;
        self.cache_path = config.cache.clone();
        self.reconstructor = Some(config.reconstructor()?);
        self.evolver = Some(config.evolver());

        if let Some(output) = &config.output {
            self.dumper = Some(Box::new(CborDumper::new(output)));
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Solver, Error> {
        let system = self.system.ok_or(Error::MissingComponent("system"))?;
        let reconstructor = self.reconstructor.ok_or(Error::MissingComponent("reconstructor"))?;
        let flux = self.flux.ok_or(Error::MissingComponent("flux"))?;
        let evolver = self.evolver.ok_or(Error::MissingComponent("evolver"))?;
        let dumper = self.dumper.ok_or(Error::MissingComponent("dumper"))?;
        let times = self.times.ok_or(Error::MissingComponent("times"))?;

        DumpSchedule::new(&times, self.dumps.as_deref())?;

        if let Some(source) = &self.source {
            if reconstructor.num_quadrature() < source.required_quadrature() {
                return Err(Error::Configuration(format!(
                    "source needs {} quadrature points per cell, reconstructor provides {}",
                    source.required_quadrature(),
                    reconstructor.num_quadrature()
                )));
            }
        }

        Ok(Solver {
            system,
            reconstructor,
            flux,
            source: self.source,
            evolver,
            dumper,
            times,
            dumps: self.dumps,
            boundary: self.boundary,
            mode: Some(self.mode),
            cache_path: self.cache_path,
            trace: self.trace,
            monitor_mass: self.monitor_mass,
            grid: None,
        })
    }
}




// ============================================================================
/**
 * Integrates a balance law in time with the method of lines. A solver is
 * built by `SolverBuilder`, given a grid through the cache operations
 * (`load_cache`, `build_cache` or `ensure_cache`), then `run`.
 */
pub struct Solver {
    system: Box<dyn System>,
    reconstructor: Box<dyn Reconstructor>,
    flux: Box<dyn Flux>,
    source: Option<Box<dyn Source>>,
    evolver: Box<dyn Evolver>,
    dumper: Box<dyn Dumper>,
    times: Vec<f64>,
    dumps: Option<Vec<f64>>,
    boundary: Boundary,
    mode: Option<ExecutionMode>,
    cache_path: Option<PathBuf>,
    trace: usize,
    monitor_mass: bool,
    grid: Option<Grid>,
}




// ============================================================================
impl Solver {

    pub fn builder() -> SolverBuilder {
        SolverBuilder::new()
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Whether this worker persists the cache and writes output.
    pub fn is_coordinator(&self) -> bool {
        match &self.mode {
            Some(ExecutionMode::Distributed(comm)) => comm.is_coordinator(),
            _ => true,
        }
    }

    /// Halo width of a run: one reconstruction's ghost cells for every stage
    /// of the time step, since ghosts are refreshed once per step.
    pub fn halo_width(&self) -> usize {
        self.reconstructor.num_ghost() * self.evolver.num_stages()
    }




    /**
     * Install the grid and reconstruction operators from the cache file.
     * Returns `Ok(false)` if there is no cache path or no file there.
     */
    pub fn load_cache(&mut self) -> Result<bool, Error> {
        let path = match &self.cache_path {
            Some(path) => path.clone(),
            None => return Ok(false),
        };
        let bundle = match cache::load(&path)? {
            Some(bundle) => bundle,
            None => return Ok(false),
        };
        let order = self.reconstructor.order();

        if bundle.order != order {
            return Err(Error::CacheMismatch(format!(
                "{} was built for order {}, reconstructor has order {}",
                path.display(),
                bundle.order,
                order
            )));
        }
        if let Some(ops) = &bundle.operators {
            if !ops.fits(&bundle.grid, order, self.reconstructor.num_quadrature()) {
                return Err(Error::CacheMismatch(format!(
                    "{} holds operators that do not fit its {}-cell grid",
                    path.display(),
                    bundle.grid.len()
                )));
            }
        }
        self.reconstructor.restore(bundle.operators)?;
        info!("loaded cache {} ({} cells, order {})", path.display(), bundle.grid.len(), order);
        self.grid = Some(bundle.grid);
        Ok(true)
    }




    /**
     * Install the grid, build the reconstruction operators for it, and
     * persist both if a cache path is set (only the coordinator writes).
     */
    pub fn build_cache(&mut self, grid: Grid) -> Result<(), Error> {
        let operators = self.reconstructor.precompute(&grid)?;
        self.reconstructor.restore(operators.clone())?;

        if let (Some(path), true) = (&self.cache_path, self.is_coordinator()) {
            let bundle = CacheBundle {
                version: CACHE_VERSION,
                order: self.reconstructor.order(),
                grid: grid.clone(),
                operators,
            };
            cache::store(path, &bundle)?;
        }
        self.grid = Some(grid);
        Ok(())
    }




    /**
     * Load the cache if it matches the candidate grid, otherwise build it.
     * Returns whether the cache was (re)built.
     */
    pub fn ensure_cache(&mut self, candidate: Grid) -> Result<bool, Error> {
        match self.load_cache() {
            Ok(true) if self.grid.as_ref() == Some(&candidate) => return Ok(false),
            Ok(true) => warn!("cached grid differs from the requested one; rebuilding"),
            Ok(false) => debug!("no cache found; building"),
            Err(e @ Error::CacheMismatch(_)) | Err(e @ Error::CacheFormat(_)) => warn!("{}; rebuilding", e),
            Err(e) => return Err(e),
        }
        self.build_cache(candidate)?;
        Ok(true)
    }




    /**
     * Run the solver over its time grid. Needs an installed grid. A solver
     * in distributed mode can run only once, since the run takes ownership
     * of its communicator.
     */
    pub fn run(&mut self) -> Result<RunSummary, Error> {
        let grid = self.grid.clone().ok_or(Error::MissingGrid)?;
        let mode = self
            .mode
            .take()
            .ok_or_else(|| Error::Configuration("the communicator of this solver was used by an earlier run".into()))?;
        let single = matches!(mode, ExecutionMode::Single);
        let result = self.run_with(grid, mode);

        if single {
            self.mode = Some(ExecutionMode::Single);
        }
        result
    }

    fn run_with(&mut self, grid: Grid, mode: ExecutionMode) -> Result<RunSummary, Error> {
        let num_cells = grid.len();
        let num_unknowns = self.system.num_unknowns();
        let halo_width = self.halo_width();

        let mut exchange = match mode {
            ExecutionMode::Single => {
                HaloExchange::single(Decomposition::new(num_cells, 1, halo_width, self.boundary)?)?
            }
            ExecutionMode::Distributed(comm) => {
                let decomposition = Decomposition::new(num_cells, comm.size(), halo_width, self.boundary)?;
                HaloExchange::distributed(decomposition, comm)?
            }
        };
        let rank = exchange.rank();
        let coordinator = exchange.is_coordinator();
        let layout = exchange
            .decomposition()
            .layout(rank, &grid, num_unknowns, self.reconstructor.num_quadrature());

        info!(
            "rank {}: cells {}..{} of {}, halo {}, {} unknowns",
            rank,
            layout.owned.start(),
            layout.owned.end(),
            num_cells,
            halo_width,
            num_unknowns
        );

        let Self {
            system,
            reconstructor,
            flux,
            source,
            evolver,
            dumper,
            times,
            dumps,
            trace,
            monitor_mass,
            ..
        } = self;

        allocate_all(&layout, system.as_mut(), reconstructor.as_mut(), flux.as_mut(), source, evolver.as_mut())?;

        let t0 = times[0];
        let t_last = times[times.len() - 1];
        let owned_rows = layout.owned_rows();
        let owned_sizes = &layout.sizes[owned_rows.clone()];
        let mut q = StateArray::zeros(layout.num_cells(), num_unknowns);
        let mut qn = StateArray::zeros(layout.num_cells(), num_unknowns);

        system.initial_condition(t0, &grid, layout.owned.to_usize_range(), q.select_mut(owned_rows.clone()))?;
        exchange.exchange(&mut q)?;

        system.pre_run(t0, &q)?;
        reconstructor.pre_run(t0, &q)?;
        flux.pre_run(t0, &q)?;
        if let Some(source) = source.as_mut() {
            source.pre_run(t0, &q)?;
        }
        evolver.pre_run(t0, &q)?;

        let mut diagnostics = Diagnostics::default();
        check_cfl(times, &grid, flux.max_wave_speed(), &mut diagnostics);

        let mut schedule = DumpSchedule::new(times, dumps.as_deref())?;

        if coordinator {
            let plan = schedule.plan(times);
            dumper.init_dump(&DumpHeader {
                dims: Dims {
                    xdim: grid.centers(),
                    tdim: plan.clone(),
                },
                parameters: system.parameters(),
                shape: [plan.len(), num_cells, num_unknowns],
            })?;
        }

        if *monitor_mass {
            let mass = exchange.reduce_sum(system.mass(q.select(owned_rows.clone()), owned_sizes))?;
            diagnostics.record_mass(0, t0, mass);
        }

        let mut status = RunStatus::Completed;
        let mut steps = 0;
        let mut num_dumps = 0;
        let mut final_time = t0;

        for (n, w) in times.windows(2).enumerate() {
            let (t, t_next) = (w[0], w[1]);

            if schedule.is_due(t) {
                write_dump(&mut exchange, &mut **dumper, &**system, &grid, &q, num_dumps, t)?;
                schedule.pop();
                num_dumps += 1;
            }

            let mut ctx = StepContext::new(n, t, t_next - t, &mut diagnostics);
            let mut pipeline = Pipeline {
                reconstructor: reconstructor.as_mut(),
                flux: flux.as_mut(),
                source: source.as_mut().map(|s| s.as_mut() as &mut dyn Source),
            };

            if pipeline.source.is_some() {
                evolver.evolve(&q, &mut pipeline, &mut ctx, &mut qn)?;
            } else {
                evolver.evolve_homogeneous(&q, &mut pipeline, &mut ctx, &mut qn)?;
            }

            system.on_step(&ctx);
            reconstructor.on_step(&ctx);
            flux.on_step(&ctx);
            if let Some(source) = source.as_mut() {
                source.on_step(&ctx);
            }
            evolver.on_step(&ctx);
            drop(ctx);

            std::mem::swap(&mut q, &mut qn);
            exchange.exchange(&mut q)?;
            steps = n + 1;
            final_time = t_next;

            if *monitor_mass {
                let mass = exchange.reduce_sum(system.mass(q.select(owned_rows.clone()), owned_sizes))?;
                diagnostics.record_mass(n + 1, t_next, mass);
            }
            debug!("rank {} step {} t={:.6}", rank, n, t_next);

            if *trace != 0 && n == *trace {
                info!("stopping at trace step {}", n);
                status = RunStatus::TraceStop { step: n };
                break;
            }
        }

        if status == RunStatus::Completed && !schedule.is_exhausted() {
            write_dump(&mut exchange, &mut **dumper, &**system, &grid, &q, num_dumps, t_last)?;
            schedule.pop();
            num_dumps += 1;
        }

        let solution = exchange.gather(&q)?;

        if coordinator {
            dumper.finish()?;
            info!("run finished after {} steps and {} dumps (t={})", steps, num_dumps, final_time);
        }

        Ok(RunSummary {
            status,
            steps,
            dumps: num_dumps,
            final_time,
            diagnostics,
            solution,
        })
    }
}




fn allocate_all(
    layout: &Layout,
    system: &mut dyn System,
    reconstructor: &mut dyn Reconstructor,
    flux: &mut dyn Flux,
    source: &mut Option<Box<dyn Source>>,
    evolver: &mut dyn Evolver,
) -> Result<(), Error> {
    system.allocate(layout)?;
    reconstructor.allocate(layout)?;
    flux.allocate(layout)?;
    if let Some(source) = source.as_mut() {
        source.allocate(layout)?;
    }
    evolver.allocate(layout)
}




/// Warn (and count) when the largest step exceeds the CFL limit of the
/// smallest cell.
fn check_cfl(times: &[f64], grid: &Grid, alpha: f64, diagnostics: &mut Diagnostics) {
    let max_dt = times.windows(2).map(|w| w[1] - w[0]).fold(0.0, f64::max);
    let min_dx = grid.min_cell_size();

    if alpha * max_dt >= 0.5 * min_dx {
        warn!(
            "CFL condition violated: alpha * max(dt) = {:.3e} >= 0.5 * min(dx) = {:.3e}",
            alpha * max_dt,
            0.5 * min_dx
        );
        diagnostics.cfl_violations += 1;
    }
}




/// Gather the owned cells to the coordinator and hand them to the dumper.
fn write_dump(
    exchange: &mut HaloExchange,
    dumper: &mut dyn Dumper,
    system: &dyn System,
    grid: &Grid,
    q: &StateArray,
    index: usize,
    t: f64,
) -> Result<(), Error> {
    if let Some(whole) = exchange.gather(q)? {
        let mass = system.mass(whole.as_slice(), &grid.sizes());
        info!("dump {} at t={:.6}, mass={:.12e}", index, t, mass);
        dumper.dump(t, &whole)?;
    }
    Ok(())
}
