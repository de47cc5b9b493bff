use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    config::{validate_port_id, validate_threshold, ConfigStore},
    conversion::{raw_to_psi, round_to},
    error::{ExportError, SessionError},
    export::{write_readings, ExportPrompt, ExportTarget, SaveChoice},
    notify::{LiveDisplay, Notifier, SoundChooser},
    sampling::Reading,
    serial::{LinkEvent, SerialLink, SerialTransport},
};

use super::{
    clock::Clock,
    state::{Session, SessionSnapshot, SessionStatus, StopOutcome},
};

/// Everything outside the session that the controller talks to.
pub struct Collaborators {
    pub transport: Arc<dyn SerialTransport>,
    pub notifier: Arc<dyn Notifier>,
    pub display: Arc<dyn LiveDisplay>,
    pub prompt: Arc<dyn ExportPrompt>,
    pub chooser: Arc<dyn SoundChooser>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct ControllerState {
    session: Option<Session>,
    link: Option<SerialLink>,
    pump: Option<JoinHandle<()>>,
}

/// Owns the running session. Commands and incoming lines all go through
/// the one state lock, so they apply one at a time in arrival order.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<ControllerState>>,
    config: Arc<ConfigStore>,
    deps: Arc<Collaborators>,
}

impl SessionController {
    pub fn new(config: Arc<ConfigStore>, deps: Collaborators) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState::default())),
            config,
            deps: Arc::new(deps),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub async fn status(&self) -> SessionStatus {
        if self.state.lock().await.session.is_some() {
            SessionStatus::Running
        } else {
            SessionStatus::Idle
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.state.lock().await;
        guard
            .session
            .as_ref()
            .map(SessionSnapshot::of)
            .unwrap_or_else(SessionSnapshot::idle)
    }

    /// Readings logged so far in the running session.
    pub async fn readings(&self) -> Vec<Reading> {
        let guard = self.state.lock().await;
        guard
            .session
            .as_ref()
            .map(|session| session.readings().to_vec())
            .unwrap_or_default()
    }

    pub async fn start(
        &self,
        port_id: u8,
        threshold_psi: f64,
    ) -> Result<SessionSnapshot, SessionError> {
        if !validate_threshold(threshold_psi) {
            return Err(SessionError::InvalidThreshold(threshold_psi));
        }

        let mut state = self.state.lock().await;
        if let Some(session) = state.session.as_ref() {
            info!("session {} already running; start ignored", session.id);
            return Ok(SessionSnapshot::of(session));
        }

        let started_at = self.deps.clock.now();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let link = match SerialLink::open(
            self.deps.transport.clone(),
            port_id,
            self.deps.clock.clone(),
            events_tx,
        )
        .await
        {
            Ok(link) => link,
            Err(err) => {
                error!("failed to start session on port {}: {}", port_id, err);
                self.deps.display.show_pressure(None);
                return Err(err.into());
            }
        };

        let mut session = Session::begin(
            Uuid::new_v4().to_string(),
            port_id,
            threshold_psi,
            started_at,
        );
        session.alarm.reset(self.deps.notifier.as_ref());

        info!(
            "session {} started on {} (threshold {} psi)",
            session.id,
            link.port(),
            threshold_psi
        );

        let snapshot = SessionSnapshot::of(&session);
        state.pump = Some(self.spawn_pump(session.id.clone(), events_rx));
        state.link = Some(link);
        state.session = Some(session);

        Ok(snapshot)
    }

    /// Ends the running session. With `prompt_save` the operator is asked to
    /// export first; cancelling, or a failed export, leaves it running.
    ///
    /// The state lock is not held while the prompt is open, so lines keep
    /// being displayed, logged and checked against the threshold.
    pub async fn stop(&self, prompt_save: bool) -> Result<StopOutcome, SessionError> {
        let Some(session_id) = self.running_session_id().await else {
            return Ok(StopOutcome::NotRunning);
        };

        let mut target = None;
        if prompt_save {
            let prompt = self.deps.prompt.clone();
            let default_directory = self.config.last_save_directory();
            let choice = tokio::task::spawn_blocking(move || prompt.choose(&default_directory))
                .await
                .map_err(|err| ExportError::Prompt(err.to_string()))??;

            match choice {
                SaveChoice::Cancel => {
                    info!("stop of session {} cancelled by operator", session_id);
                    return Ok(StopOutcome::Cancelled);
                }
                SaveChoice::Discard => {
                    info!("discarding readings of session {}", session_id);
                }
                SaveChoice::Save(chosen) => target = Some(chosen),
            }
        }

        let mut state = self.state.lock().await;
        let Some(session) = state.session.as_ref().filter(|s| s.id == session_id) else {
            info!("session {} already ended while awaiting the operator", session_id);
            return Ok(StopOutcome::NotRunning);
        };
        if let Some(target) = target {
            self.export(session, target).await?;
        }

        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        if let Some(mut link) = state.link.take() {
            if let Err(err) = link.close().await {
                warn!("serial link did not close cleanly: {err:#}");
            }
        }

        let Some(mut session) = state.session.take() else {
            return Ok(StopOutcome::NotRunning);
        };
        session.alarm.reset(self.deps.notifier.as_ref());
        self.deps.display.show_pressure(None);

        info!(
            "session {} stopped with {} logged readings",
            session.id,
            session.log.len()
        );

        Ok(StopOutcome::Stopped(session.log.into_readings()))
    }

    /// Stop hook for application shutdown.
    pub async fn shutdown(&self) -> Result<StopOutcome, SessionError> {
        self.stop(true).await
    }

    pub async fn on_threshold_changed(&self, threshold_psi: f64) -> Result<(), SessionError> {
        if !validate_threshold(threshold_psi) {
            return Err(SessionError::InvalidThreshold(threshold_psi));
        }
        self.config
            .set_threshold_psi(threshold_psi)
            .map_err(SessionError::Config)?;

        let mut state = self.state.lock().await;
        if let Some(session) = state.session.as_mut() {
            session.alarm.set_threshold(threshold_psi);
            info!("session {} threshold now {} psi", session.id, threshold_psi);
        }
        Ok(())
    }

    /// Saved for the next session; a running session keeps its port.
    pub async fn on_port_changed(&self, port_id: u8) -> Result<(), SessionError> {
        if !validate_port_id(port_id) {
            return Err(SessionError::InvalidPort(port_id));
        }
        self.config
            .set_port_id(port_id)
            .map_err(SessionError::Config)?;

        if let Some(session) = self.state.lock().await.session.as_ref() {
            info!(
                "port {} takes effect after session {} on port {} stops",
                port_id, session.id, session.port_id
            );
        }
        Ok(())
    }

    async fn running_session_id(&self) -> Option<String> {
        let guard = self.state.lock().await;
        guard.session.as_ref().map(|session| session.id.clone())
    }

    async fn export(&self, session: &Session, target: ExportTarget) -> Result<(), ExportError> {
        let ExportTarget { sink, directory } = target;
        let readings = session.readings().to_vec();
        let count = readings.len();

        tokio::task::spawn_blocking(move || write_readings(sink, &readings))
            .await
            .map_err(|err| ExportError::Io(std::io::Error::other(err)))?
            .inspect_err(|err| error!("export of session {} failed: {}", session.id, err))?;

        info!("exported {} readings of session {}", count, session.id);

        if let Some(directory) = directory {
            if let Err(err) = self.config.set_last_save_directory(directory) {
                warn!("failed to remember save directory: {err:#}");
            }
        }
        Ok(())
    }

    fn spawn_pump(
        &self,
        session_id: String,
        mut events: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> JoinHandle<()> {
        let state = self.state.clone();
        let deps = self.deps.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let mut guard = state.lock().await;
                let Some(session) = guard.session.as_mut().filter(|s| s.id == session_id) else {
                    break;
                };

                match event {
                    LinkEvent::Line { raw, at } => process_line(session, &raw, at, &deps),
                    LinkEvent::Closed => {
                        session.link_lost = true;
                        warn!("sensor closed the link during session {}", session.id);
                    }
                    LinkEvent::Failed(reason) => {
                        session.link_lost = true;
                        error!("serial link failed during session {}: {}", session.id, reason);
                    }
                }
            }
        })
    }
}

/// Convert, publish, log, evaluate. Malformed lines change nothing.
fn process_line(session: &mut Session, raw: &str, at: DateTime<Utc>, deps: &Collaborators) {
    let psi = match raw_to_psi(raw) {
        Ok(psi) => psi,
        Err(err) => {
            session.discarded_lines += 1;
            warn!("discarding sensor line: {err}");
            return;
        }
    };
    let display_psi = round_to(psi, 1);

    session.live_psi = Some(display_psi);
    deps.display.show_pressure(Some(display_psi));

    if let Some(reading) = session.log.observe(at, display_psi) {
        info!(
            "logged {:.1} psi at {:.2} min",
            reading.psi, reading.elapsed_minutes
        );
    }

    if session
        .alarm
        .evaluate(psi, deps.notifier.as_ref(), deps.chooser.as_ref())
    {
        warn!(
            "pressure {:.1} psi exceeded threshold {} psi in session {}",
            display_psi,
            session.alarm.threshold_psi(),
            session.id
        );
    }
}
