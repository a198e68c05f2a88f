use super::session::ProbeError;
use std::collections::VecDeque;

/// A cumulative reading of the energy and time counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub energy_uj: f64,
    pub time_ns: f64,
}

impl Sample {
    pub fn new(energy_uj: f64, time_ns: f64) -> Self {
        Self { energy_uj, time_ns }
    }

    /// Consumption between `start` and this sample.
    pub fn since(&self, start: &Sample) -> Sample {
        Sample {
            energy_uj: self.energy_uj - start.energy_uj,
            time_ns: self.time_ns - start.time_ns,
        }
    }
}

/// Source of cumulative energy and time readings.
pub trait EnergyCounter: Send {
    fn sample(&mut self) -> Result<Sample, ProbeError>;
}

impl<C: EnergyCounter + ?Sized> EnergyCounter for Box<C> {
    fn sample(&mut self) -> Result<Sample, ProbeError> {
        (**self).sample()
    }
}

/// Replays a fixed sequence of samples.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCounter {
    samples: VecDeque<Sample>,
    taken: usize,
}

impl ScriptedCounter {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            taken: 0,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }

    pub fn taken(&self) -> usize {
        self.taken
    }
}

impl EnergyCounter for ScriptedCounter {
    fn sample(&mut self) -> Result<Sample, ProbeError> {
        let sample = self.samples.pop_front().ok_or_else(|| {
            ProbeError::Counter(format!("scripted counter exhausted after {} samples", self.taken))
        })?;
        self.taken += 1;
        Ok(sample)
    }
}
