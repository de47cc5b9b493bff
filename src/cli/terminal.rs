//! Terminal stand-ins for the operator-facing collaborators.

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use dialoguer::{Confirm, Input, Select};

use crate::{
    audio::AudioEngineHandle,
    error::{ExportError, NotificationError},
    export::{ExportPrompt, ExportTarget, SaveChoice, DEFAULT_EXPORT_FILE_NAME},
    notify::{AlarmSound, LiveDisplay, Notifier},
};

/// Rewrites one status line in place.
pub struct TerminalDisplay;

impl LiveDisplay for TerminalDisplay {
    fn show_pressure(&self, psi: Option<f64>) {
        let mut stdout = io::stdout().lock();
        let _ = match psi {
            Some(psi) => write!(stdout, "\r{:>6.1} psi ", psi),
            None => write!(stdout, "\r{:>6} psi \n", "00.0"),
        };
        let _ = stdout.flush();
    }
}

/// Banner on stderr for the indicator, looping tones through the audio
/// engine for the sound.
pub struct TerminalAlarm {
    audio: Arc<AudioEngineHandle>,
    active: AtomicBool,
}

impl TerminalAlarm {
    pub fn new(audio: Arc<AudioEngineHandle>) -> Self {
        Self {
            audio,
            active: AtomicBool::new(false),
        }
    }
}

impl Notifier for TerminalAlarm {
    fn set_alarm_indicator(&self, active: bool) {
        let was_active = self.active.swap(active, Ordering::SeqCst);
        if active && !was_active {
            eprintln!("\n!!! PRESSURE ALARM: threshold exceeded !!!");
        } else if !active && was_active {
            eprintln!("\nAlarm cleared.");
        }
    }

    fn play_alarm(&self, sound: AlarmSound) -> Result<(), NotificationError> {
        self.audio.play_looping(sound)
    }

    fn stop_alarm_sound(&self) {
        self.audio.stop();
    }
}

/// Yes/No/Cancel, then a file name, then overwrite confirmation.
pub struct DialogPrompt;

impl ExportPrompt for DialogPrompt {
    fn choose(&self, default_directory: &Path) -> Result<SaveChoice, ExportError> {
        println!();
        let answer = Select::new()
            .with_prompt("Save data?")
            .items(&["Yes", "No", "Cancel"])
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?;

        match answer {
            Some(0) => {}
            Some(1) => return Ok(SaveChoice::Discard),
            _ => return Ok(SaveChoice::Cancel),
        }

        let suggested = default_directory.join(DEFAULT_EXPORT_FILE_NAME);
        let input: String = Input::new()
            .with_prompt("Save as")
            .with_initial_text(suggested.to_string_lossy())
            .interact_text()
            .map_err(prompt_error)?;

        let path = with_csv_extension(PathBuf::from(input.trim()));
        if path.exists() {
            let overwrite = Confirm::new()
                .with_prompt(format!("{} exists. Overwrite?", path.display()))
                .default(false)
                .interact()
                .map_err(prompt_error)?;
            if !overwrite {
                println!("File not saved.");
                return Ok(SaveChoice::Cancel);
            }
        }

        let file = File::create(&path)?;
        Ok(SaveChoice::Save(ExportTarget {
            sink: Box::new(file),
            directory: path.parent().map(Path::to_path_buf),
        }))
    }
}

fn prompt_error(err: dialoguer::Error) -> ExportError {
    ExportError::Prompt(err.to_string())
}

fn with_csv_extension(mut path: PathBuf) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension("csv");
    }
    path
}
