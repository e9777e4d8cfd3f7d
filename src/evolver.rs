use crate::component::{Hooks, Layout};
use crate::context::{StepContext, NET_FLUX, SOURCE_TERM};
use crate::error::Error;
use crate::flux::Flux;
use crate::reconstruct::Reconstructor;
use crate::source::Source;
use crate::state::{QuadratureArray, StateArray};




/**
 * The spatial operator handed to an evolver for one step: reconstruction,
 * then flux and (optionally) source evaluation.
 */
pub struct Pipeline<'a> {
    pub reconstructor: &'a mut dyn Reconstructor,
    pub flux: &'a mut dyn Flux,
    pub source: Option<&'a mut dyn Source>,
}




/**
 * An explicit time integration scheme for `dq/dt = L(q)`.
 */
pub trait Evolver: Hooks + Send {

    /// Number of right-hand side evaluations per step.
    fn num_stages(&self) -> usize;

    /// Advance `q` by `ctx.dt` into `qn`, with `L = flux + source`.
    fn evolve(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray) -> Result<(), Error>;

    /// Advance `q` by `ctx.dt` into `qn`, with `L = flux`.
    fn evolve_homogeneous(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray) -> Result<(), Error>;
}




// ============================================================================
/**
 * Work buffers shared by the schemes, sized once in `allocate` and reused on
 * every step.
 */
struct Scratch {
    qm: StateArray,
    qp: StateArray,
    qq: QuadratureArray,
    f: StateArray,
    s: StateArray,
    rhs: StateArray,
}

impl Scratch {

    fn new(layout: &Layout) -> Self {
        let n = layout.num_cells();
        let p = layout.num_unknowns;
        Self {
            qm: StateArray::zeros(n + 1, p),
            qp: StateArray::zeros(n + 1, p),
            qq: QuadratureArray::zeros(n, layout.num_quadrature, p),
            f: StateArray::zeros(n, p),
            s: StateArray::zeros(n, p),
            rhs: StateArray::zeros(n, p),
        }
    }

    /// Evaluate the right-hand side at `q` into `self.rhs`.
    fn evaluate(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, with_source: bool) -> Result<(), Error> {
        q.check_shape(&self.rhs)?;

        pipeline.reconstructor.reconstruct(q, &mut self.qm, &mut self.qp, &mut self.qq, ctx)?;
        pipeline.flux.flux(&self.qm, &self.qp, ctx, &mut self.f)?;
        ctx.publish_from(NET_FLUX, self.f.as_slice());

        if with_source {
            let source = pipeline.source.as_mut().ok_or(Error::MissingComponent("source"))?;
            source.source(&self.qm, &self.qp, &self.qq, ctx, &mut self.s)?;
            ctx.publish_from(SOURCE_TERM, self.s.as_slice());

            for ((r, f), s) in self.rhs.as_mut_slice().iter_mut().zip(self.f.as_slice()).zip(self.s.as_slice()) {
                *r = f + s;
            }
        } else {
            self.rhs.copy_from(&self.f)?;
        }
        Ok(())
    }
}




fn scratch_or_err(scratch: &mut Option<Scratch>) -> Result<&mut Scratch, Error> {
    scratch
        .as_mut()
        .ok_or_else(|| Error::Configuration("evolver used before allocate".into()))
}




/// out = a * x + b * y + c * z
fn combine(out: &mut StateArray, a: f64, x: &StateArray, b: f64, y: &StateArray, c: f64, z: &StateArray) -> Result<(), Error> {
    out.check_shape(x)?;
    out.check_shape(y)?;
    out.check_shape(z)?;

    for (((o, x), y), z) in out
        .as_mut_slice()
        .iter_mut()
        .zip(x.as_slice())
        .zip(y.as_slice())
        .zip(z.as_slice())
    {
        *o = a * x + b * y + c * z;
    }
    Ok(())
}




// ============================================================================
/**
 * First-order explicit Euler: `qn = q + dt L(q)`.
 */
#[derive(Default)]
pub struct ForwardEuler {
    scratch: Option<Scratch>,
}

impl ForwardEuler {
    pub fn new() -> Self {
        Self::default()
    }

    fn step(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray, with_source: bool) -> Result<(), Error> {
        let scratch = scratch_or_err(&mut self.scratch)?;
        let dt = ctx.dt;

        ctx.set_stage(0, ctx.time);
        scratch.evaluate(q, pipeline, ctx, with_source)?;
        combine(qn, 1.0, q, dt, &scratch.rhs, 0.0, q)
    }
}

impl Hooks for ForwardEuler {
    fn allocate(&mut self, layout: &Layout) -> Result<(), Error> {
        self.scratch = Some(Scratch::new(layout));
        Ok(())
    }
}

impl Evolver for ForwardEuler {

    fn num_stages(&self) -> usize {
        1
    }

    fn evolve(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray) -> Result<(), Error> {
        if pipeline.source.is_none() {
            return Err(Error::MissingComponent("source"));
        }
        self.step(q, pipeline, ctx, qn, true)
    }

    fn evolve_homogeneous(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray) -> Result<(), Error> {
        self.step(q, pipeline, ctx, qn, false)
    }
}




// ============================================================================
/**
 * Three-stage, third-order strong-stability-preserving Runge-Kutta scheme in
 * Shu-Osher form.
 */
pub struct SspRk3 {
    scratch: Option<Scratch>,
    q1: StateArray,
    q2: StateArray,
}

impl SspRk3 {
    pub fn new() -> Self {
        Self {
            scratch: None,
            q1: StateArray::zeros(0, 0),
            q2: StateArray::zeros(0, 0),
        }
    }

    fn step(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray, with_source: bool) -> Result<(), Error> {
        let scratch = scratch_or_err(&mut self.scratch)?;
        let (t, dt) = (ctx.time, ctx.dt);

        ctx.set_stage(0, t);
        scratch.evaluate(q, pipeline, ctx, with_source)?;
        combine(&mut self.q1, 1.0, q, dt, &scratch.rhs, 0.0, q)?;

        ctx.set_stage(1, t + dt);
        scratch.evaluate(&self.q1, pipeline, ctx, with_source)?;
        combine(&mut self.q2, 0.75, q, 0.25, &self.q1, 0.25 * dt, &scratch.rhs)?;

        ctx.set_stage(2, t + 0.5 * dt);
        scratch.evaluate(&self.q2, pipeline, ctx, with_source)?;
        combine(qn, 1.0 / 3.0, q, 2.0 / 3.0, &self.q2, 2.0 / 3.0 * dt, &scratch.rhs)
    }
}

impl Default for SspRk3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hooks for SspRk3 {
    fn allocate(&mut self, layout: &Layout) -> Result<(), Error> {
        self.scratch = Some(Scratch::new(layout));
        self.q1 = StateArray::zeros(layout.num_cells(), layout.num_unknowns);
        self.q2 = StateArray::zeros(layout.num_cells(), layout.num_unknowns);
        Ok(())
    }
}

impl Evolver for SspRk3 {

    fn num_stages(&self) -> usize {
        3
    }

    fn evolve(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray) -> Result<(), Error> {
        if pipeline.source.is_none() {
            return Err(Error::MissingComponent("source"));
        }
        self.step(q, pipeline, ctx, qn, true)
    }

    fn evolve_homogeneous(&mut self, q: &StateArray, pipeline: &mut Pipeline, ctx: &mut StepContext, qn: &mut StateArray) -> Result<(), Error> {
        self.step(q, pipeline, ctx, qn, false)
    }
}
