use std::collections::VecDeque;
use crate::error::Error;




/// Number of evenly spaced dump times used when none are given.
pub const DEFAULT_NUM_DUMPS: usize = 11;




/**
 * Return `num` evenly spaced values from `start` to `stop`, both included.
 */
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut values: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
            values[num - 1] = stop;
            values
        }
    }
}




/**
 * Check that a time grid is finite, strictly increasing, and has at least
 * one step.
 */
pub fn validate_times(times: &[f64]) -> Result<(), Error> {
    if times.len() < 2 {
        return Err(Error::MalformedTimes(format!(
            "need at least two times, got {}",
            times.len()
        )));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(Error::MalformedTimes("times must be finite".into()));
    }
    if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
        return Err(Error::MalformedTimes(format!(
            "times not strictly increasing at index {}",
            i + 1
        )));
    }
    Ok(())
}




// ============================================================================
/**
 * The queue of pending output times of a run.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct DumpSchedule {
    pending: VecDeque<f64>,
    total: usize,
}




// ============================================================================
impl DumpSchedule {




    /**
     * Build the schedule for a run over `times`. Without explicit dump
     * times, dump at 11 evenly spaced times. Explicit dump times must be
     * finite, strictly increasing, and within the run; if the last one falls
     * short of the final time, the final time is appended.
     */
    pub fn new(times: &[f64], dumps: Option<&[f64]>) -> Result<Self, Error> {
        validate_times(times)?;

        let t0 = times[0];
        let t1 = times[times.len() - 1];

        let mut pending: Vec<f64> = match dumps {
            None => linspace(t0, t1, DEFAULT_NUM_DUMPS),
            Some(dumps) => {
                if dumps.is_empty() {
                    return Err(Error::MalformedDumpTimes("dump schedule is empty".into()));
                }
                if dumps.iter().any(|t| !t.is_finite()) {
                    return Err(Error::MalformedDumpTimes("dump times must be finite".into()));
                }
                if dumps.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(Error::MalformedDumpTimes("dump times not strictly increasing".into()));
                }
                if dumps[0] < t0 || dumps[dumps.len() - 1] > t1 {
                    return Err(Error::MalformedDumpTimes(format!(
                        "dump times {} .. {} fall outside the run {} .. {}",
                        dumps[0],
                        dumps[dumps.len() - 1],
                        t0,
                        t1
                    )));
                }
                dumps.to_vec()
            }
        };

        if pending[pending.len() - 1] < t1 {
            pending.push(t1)
        }

        let total = pending.len();
        Ok(Self {
            pending: pending.into(),
            total,
        })
    }

    /// The next pending dump time.
    pub fn next(&self) -> Option<f64> {
        self.pending.front().copied()
    }

    /// Whether the head of the schedule is due at time `t`.
    pub fn is_due(&self, t: f64) -> bool {
        self.next().map_or(false, |head| t >= head)
    }

    /// Drop the head of the schedule, returning it.
    pub fn pop(&mut self) -> Option<f64> {
        self.pending.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    /// All times the schedule was created with.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn pending(&self) -> Vec<f64> {
        self.pending.iter().copied().collect()
    }

    /**
     * The times at which a complete run over `times` actually writes. At
     * most one dump is written per step, at the start of the first step
     * whose time reaches the head of the schedule, and whatever remains
     * after the last step is flushed once at the final time. On a coarse
     * time grid this is fewer than `total`.
     */
    pub fn plan(&self, times: &[f64]) -> Vec<f64> {
        let mut schedule = self.clone();
        let mut written = Vec::new();

        if let Some((t_last, steps)) = times.split_last() {
            for t in steps {
                if schedule.is_due(*t) {
                    schedule.pop();
                    written.push(*t);
                }
            }
            if !schedule.is_exhausted() {
                written.push(*t_last);
            }
        }
        written
    }
}
