use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

const SWEEP_SECS: f32 = 0.7;
const GAP_SECS: f32 = 0.35;
const LOW_HZ: f32 = 220.0;
const HIGH_HZ: f32 = 660.0;

/// "Aoogah" horn: a rising sawtooth sweep followed by a short gap,
/// repeated forever.
pub struct Klaxon {
    sample_rate: u32,
    num_sample: u64,
    phase: f32,
}

impl Klaxon {
    pub fn new() -> Self {
        Self {
            sample_rate: 44100,
            num_sample: 0,
            phase: 0.0,
        }
    }

    fn period_samples(&self) -> u64 {
        ((SWEEP_SECS + GAP_SECS) * self.sample_rate as f32).round() as u64
    }
}

impl Iterator for Klaxon {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        // Position within the current cycle, so `t` stays small however
        // long the horn has been sounding.
        let period = self.period_samples();
        let t = (self.num_sample % period) as f32 / self.sample_rate as f32;
        self.num_sample = (self.num_sample + 1) % period;

        if t >= SWEEP_SECS {
            self.phase = 0.0;
            return Some(0.0);
        }

        let progress = t / SWEEP_SECS;
        let freq = LOW_HZ + (HIGH_HZ - LOW_HZ) * progress * progress;
        self.phase += TAU * freq / self.sample_rate as f32;
        if self.phase > TAU {
            self.phase -= TAU;
        }

        // Sawtooth in [-1, 1]
        let saw = self.phase / TAU * 2.0 - 1.0;
        Some(saw * 0.35)
    }
}

impl Source for Klaxon {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
