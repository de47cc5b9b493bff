use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmMonitor, AlarmState};
use crate::sampling::{Reading, SamplingLog};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
}

/// One start-to-stop measurement run.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub port_id: u8,
    pub log: SamplingLog,
    pub alarm: AlarmMonitor,
    /// Most recent converted value, logged or not.
    pub live_psi: Option<f64>,
    pub discarded_lines: u64,
    /// The sensor link ended or failed; readings stay exportable.
    pub link_lost: bool,
}

impl Session {
    pub fn begin(id: String, port_id: u8, threshold_psi: f64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            port_id,
            log: SamplingLog::new(now),
            alarm: AlarmMonitor::new(threshold_psi),
            live_psi: None,
            discarded_lines: 0,
            link_lost: false,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.log.started_at()
    }

    pub fn readings(&self) -> &[Reading] {
        self.log.readings()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub port_id: Option<u8>,
    pub threshold_psi: Option<f64>,
    pub alarm: AlarmState,
    pub live_psi: Option<f64>,
    pub logged_readings: usize,
    pub discarded_lines: u64,
    pub link_lost: bool,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: None,
            port_id: None,
            threshold_psi: None,
            alarm: AlarmState::Normal,
            live_psi: None,
            logged_readings: 0,
            discarded_lines: 0,
            link_lost: false,
            started_at: None,
        }
    }

    pub fn of(session: &Session) -> Self {
        Self {
            status: SessionStatus::Running,
            session_id: Some(session.id.clone()),
            port_id: Some(session.port_id),
            threshold_psi: Some(session.alarm.threshold_psi()),
            alarm: session.alarm.state(),
            live_psi: session.live_psi,
            logged_readings: session.log.len(),
            discarded_lines: session.discarded_lines,
            link_lost: session.link_lost,
            started_at: Some(session.started_at()),
        }
    }
}

/// Result of a `stop` request.
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// The session ended; its logged readings are handed back.
    Stopped(Vec<Reading>),
    /// The operator cancelled the save prompt; still running.
    Cancelled,
    NotRunning,
}
