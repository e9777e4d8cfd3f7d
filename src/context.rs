use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};




/**
 * A named channel a component may publish a vector into during a step, for
 * other components to read later in the same step. Slots are declared as
 * constants next to the component that writes them.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(&'static str);

impl Slot {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}




/// Net flux of the most recent stage, published by the evolver.
pub const NET_FLUX: Slot = Slot::new("net_flux");

/// Source term of the most recent stage, published by the evolver.
pub const SOURCE_TERM: Slot = Slot::new("source_term");




// ============================================================================
/**
 * Per-run record of observations made while stepping. It is owned by the
 * solver, lent to components through the step context, and returned in the
 * run summary.
 */
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// (step, time, mass) samples.
    pub mass_history: Vec<(usize, f64, f64)>,
    pub cfl_violations: usize,
    pub values: BTreeMap<String, Vec<f64>>,
}




// ============================================================================
impl Diagnostics {

    /// Append a value to the named series.
    pub fn record(&mut self, name: &str, value: f64) {
        self.values.entry(name.to_string()).or_default().push(value)
    }

    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    pub fn record_mass(&mut self, step: usize, time: f64, mass: f64) {
        self.mass_history.push((step, time, mass))
    }

    /// Largest deviation of the recorded mass from its first sample.
    pub fn mass_drift(&self) -> f64 {
        match self.mass_history.first() {
            Some(&(_, _, m0)) => self
                .mass_history
                .iter()
                .map(|&(_, _, m)| (m - m0).abs())
                .fold(0.0, f64::max),
            None => 0.0,
        }
    }
}




// ============================================================================
/**
 * Transient record of the step in progress. A fresh context is created for
 * every step; published slot values do not outlive it.
 */
pub struct StepContext<'a> {
    pub step: usize,
    pub time: f64,
    pub dt: f64,
    pub stage: usize,
    pub stage_time: f64,
    published: BTreeMap<Slot, Vec<f64>>,
    diagnostics: &'a mut Diagnostics,
}




// ============================================================================
impl<'a> StepContext<'a> {

    pub fn new(step: usize, time: f64, dt: f64, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            step,
            time,
            dt,
            stage: 0,
            stage_time: time,
            published: BTreeMap::new(),
            diagnostics,
        }
    }

    pub fn set_stage(&mut self, stage: usize, stage_time: f64) {
        self.stage = stage;
        self.stage_time = stage_time;
    }

    /// Publish a vector into a slot, replacing any earlier value.
    pub fn publish(&mut self, slot: Slot, value: Vec<f64>) {
        self.published.insert(slot, value);
    }

    /// Publish by copying from a slice, reusing the slot's allocation.
    pub fn publish_from(&mut self, slot: Slot, value: &[f64]) {
        let entry = self.published.entry(slot).or_default();
        entry.clear();
        entry.extend_from_slice(value);
    }

    pub fn get(&self, slot: Slot) -> Option<&[f64]> {
        self.published.get(&slot).map(|v| v.as_slice())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    const WAVE_SPEED: Slot = Slot::new("wave_speed");

    #[test]
    fn published_values_are_visible_within_the_step() {
        let mut diagnostics = Diagnostics::default();
        let mut ctx = StepContext::new(3, 0.5, 0.1, &mut diagnostics);
        assert!(ctx.get(WAVE_SPEED).is_none());
        ctx.publish(WAVE_SPEED, vec![1.0, 2.0]);
        ctx.publish_from(WAVE_SPEED, &[3.0]);
        assert_eq!(ctx.get(WAVE_SPEED), Some(&[3.0][..]));
        ctx.diagnostics_mut().record("speed", 3.0);
        assert_eq!(diagnostics.series("speed"), Some(&[3.0][..]));
    }

    #[test]
    fn mass_drift_is_measured_from_first_sample() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.record_mass(0, 0.0, 1.0);
        diagnostics.record_mass(1, 0.1, 1.5);
        diagnostics.record_mass(2, 0.2, 0.75);
        assert!((diagnostics.mass_drift() - 0.5).abs() < 1e-15);
    }
}
