//! Capabilities the session drives but does not own: the live readout,
//! the alarm indicator and alarm sound playback.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AlarmSound {
    Klaxon,
    Buzzer,
}

/// The fixed set of sounds an alarm may play.
pub const ALARM_SOUNDS: [AlarmSound; 2] = [AlarmSound::Klaxon, AlarmSound::Buzzer];

pub trait Notifier: Send + Sync {
    fn set_alarm_indicator(&self, active: bool);

    /// Starts `sound` and keeps looping it until `stop_alarm_sound`.
    fn play_alarm(&self, sound: AlarmSound) -> Result<(), NotificationError>;

    fn stop_alarm_sound(&self);
}

pub trait LiveDisplay: Send + Sync {
    /// `None` clears the readout.
    fn show_pressure(&self, psi: Option<f64>);
}

pub trait SoundChooser: Send + Sync {
    fn choose_one_of(&self, sounds: &[AlarmSound]) -> AlarmSound;
}

/// Picks uniformly at random.
pub struct RandomChooser;

impl SoundChooser for RandomChooser {
    fn choose_one_of(&self, sounds: &[AlarmSound]) -> AlarmSound {
        sounds
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(AlarmSound::Klaxon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_chooser_stays_within_the_set() {
        let chooser = RandomChooser;
        for _ in 0..50 {
            assert!(ALARM_SOUNDS.contains(&chooser.choose_one_of(&ALARM_SOUNDS)));
        }
        assert_eq!(chooser.choose_one_of(&[AlarmSound::Buzzer]), AlarmSound::Buzzer);
    }
}
