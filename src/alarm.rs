use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::notify::{Notifier, SoundChooser, ALARM_SOUNDS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AlarmState {
    #[default]
    Normal,
    Triggered,
}

/// Sticky over-pressure detector. Once triggered it stays triggered until
/// `reset`, whatever the pressure does afterwards.
#[derive(Debug, Clone)]
pub struct AlarmMonitor {
    state: AlarmState,
    threshold_psi: f64,
}

impl AlarmMonitor {
    pub fn new(threshold_psi: f64) -> Self {
        Self {
            state: AlarmState::Normal,
            threshold_psi,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn threshold_psi(&self) -> f64 {
        self.threshold_psi
    }

    pub fn set_threshold(&mut self, threshold_psi: f64) {
        self.threshold_psi = threshold_psi;
    }

    /// Returns `true` only on the `Normal -> Triggered` transition.
    pub fn evaluate(
        &mut self,
        psi: f64,
        notifier: &dyn Notifier,
        chooser: &dyn SoundChooser,
    ) -> bool {
        if self.state == AlarmState::Triggered || psi <= self.threshold_psi {
            return false;
        }

        self.state = AlarmState::Triggered;
        notifier.set_alarm_indicator(true);

        let sound = chooser.choose_one_of(&ALARM_SOUNDS);
        match notifier.play_alarm(sound) {
            Ok(()) => info!("alarm sound {:?} started", sound),
            Err(err) => warn!("{err}; alarm continues without sound"),
        }

        true
    }

    pub fn reset(&mut self, notifier: &dyn Notifier) {
        self.state = AlarmState::Normal;
        notifier.stop_alarm_sound();
        notifier.set_alarm_indicator(false);
    }
}
