use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::info;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{port_name, reader::read_lines, SerialTransport, SENSOR_LINE_SETTINGS};
use crate::config::validate_port_id;
use crate::error::LinkError;
use crate::session::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One received line with its terminator stripped, and when it arrived.
    Line { raw: String, at: DateTime<Utc> },
    /// The device closed the stream.
    Closed,
    /// The stream failed; no further lines will arrive.
    Failed(String),
}

/// An open port whose reader runs on the blocking pool and delivers lines
/// over `events`, each stamped by `clock` as it comes off the wire.
pub struct SerialLink {
    port: String,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl SerialLink {
    pub async fn open(
        transport: Arc<dyn SerialTransport>,
        port_id: u8,
        clock: Arc<dyn Clock>,
        events: UnboundedSender<LinkEvent>,
    ) -> Result<Self, LinkError> {
        if !validate_port_id(port_id) {
            return Err(LinkError::InvalidPort(port_id));
        }

        let stream = tokio::task::spawn_blocking(move || {
            transport.open(port_id, &SENSOR_LINE_SETTINGS)
        })
        .await
        .map_err(|err| LinkError::Task(err.to_string()))??;

        let port = port_name(port_id);
        let cancel_token = CancellationToken::new();
        let handle = tokio::task::spawn_blocking({
            let port = port.clone();
            let token = cancel_token.clone();
            move || read_lines(port, stream, clock, events, token)
        });

        info!("serial link open on {}", port);

        Ok(Self {
            port,
            handle: Some(handle),
            cancel_token,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops the reader and waits for it to drop the port. Safe to call
    /// more than once; the wait is bounded by the read timeout.
    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("serial reader task failed to join")?;
            info!("serial link on {} closed", self.port);
        }
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
