pub mod buzzer;
pub mod klaxon;

use buzzer::Buzzer;
use klaxon::Klaxon;

use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::warn;

use crate::error::NotificationError;
use crate::notify::AlarmSound;

enum AudioCommand {
    Play(AlarmSound),
    Stop,
    SetVolume(f32),
}

/// Handle to the alarm playback thread. rodio's output stream is not
/// `Send`, so it lives on a dedicated thread fed through a channel.
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;
                let mut volume = 1.0f32;

                fn open_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    let (s, handle) = OutputStream::try_default()
                        .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                    let new_sink = Sink::try_new(&handle)
                        .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                    *stream = Some(s);
                    *sink = Some(new_sink);
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play(sound) => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;

                            if let Err(err) = open_sink(&mut _stream, &mut sink) {
                                warn!("alarm sound unavailable: {err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.set_volume(volume);
                                match sound {
                                    AlarmSound::Klaxon => s.append(Klaxon::new()),
                                    AlarmSound::Buzzer => s.append(Buzzer::new()),
                                }
                                s.play();
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                        AudioCommand::SetVolume(v) => {
                            volume = v.clamp(0.0, 1.0);
                            if let Some(ref s) = sink {
                                s.set_volume(volume);
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    /// Queues `sound` to start looping and returns without waiting for the
    /// device. A missing output device is logged by the audio thread.
    pub fn play_looping(&self, sound: AlarmSound) -> Result<(), NotificationError> {
        let tx = self.ensure_thread().map_err(NotificationError)?;
        tx.send(AudioCommand::Play(sound))
            .map_err(|e| NotificationError(e.to_string()))
    }

    pub fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), NotificationError> {
        let tx = self.ensure_thread().map_err(NotificationError)?;
        tx.send(AudioCommand::SetVolume(volume))
            .map_err(|e| NotificationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn play_returns_without_waiting_for_the_device() {
        let audio = AudioEngineHandle::new();
        audio.set_volume(0.0).unwrap();

        let started = Instant::now();
        audio.play_looping(AlarmSound::Buzzer).unwrap();
        audio.play_looping(AlarmSound::Klaxon).unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
        audio.stop();
    }
}
