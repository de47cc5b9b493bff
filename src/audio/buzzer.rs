use rodio::Source;
use std::time::Duration;

/// Pulsed square-wave buzzer: 250 ms on, 250 ms off.
pub struct Buzzer {
    freq: f32,
    sample_rate: u32,
    num_sample: u64,
}

impl Buzzer {
    pub fn new() -> Self {
        Self {
            freq: 880.0,
            sample_rate: 44100,
            num_sample: 0,
        }
    }
}

impl Iterator for Buzzer {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        // One on/off gate cycle is half a second; 880 Hz fits it exactly.
        let gate_period = u64::from(self.sample_rate / 2);
        let t = (self.num_sample % gate_period) as f32 / self.sample_rate as f32;
        self.num_sample = (self.num_sample + 1) % gate_period;

        let gate_on = (t * 2.0).fract() < 0.5;
        if !gate_on {
            return Some(0.0);
        }

        let square = if (t * self.freq).fract() < 0.5 { 1.0 } else { -1.0 };
        Some(square * 0.2)
    }
}

impl Source for Buzzer {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulses_on_and_off_every_quarter_second() {
        let samples: Vec<f32> = Buzzer::new().take(22050).collect();
        assert!(samples[..11025].iter().all(|s| s.abs() == 0.2));
        assert!(samples[11025..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn waveform_does_not_drift_on_long_runs() {
        let fresh: Vec<f32> = Buzzer::new().take(4000).collect();

        let mut late = Buzzer::new();
        late.num_sample = 22_050 * 7_200;
        let late: Vec<f32> = late.take(4000).collect();

        assert_eq!(fresh, late);
    }
}
