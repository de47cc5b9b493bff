use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::LinkEvent;
use crate::session::Clock;

// Set to true to log every received line
const ENABLE_LOGS: bool = true;

/// Longest line accepted from the sensor, terminator excluded.
pub const MAX_LINE_BYTES: usize = 256;

use crate::{log_debug, log_error, log_info, log_warn};

/// Blocking read loop. Splits the stream on `\n` and forwards each line,
/// stamped with its arrival time, in order until the stream ends, fails, the
/// receiver goes away, or `cancel` fires. Read timeouts are idle periods,
/// not errors. Lines longer than [`MAX_LINE_BYTES`] are dropped whole.
pub(super) fn read_lines(
    port: String,
    stream: Box<dyn Read + Send>,
    clock: Arc<dyn Clock>,
    events: UnboundedSender<LinkEvent>,
    cancel: CancellationToken,
) {
    let mut reader = BufReader::new(stream);
    let mut pending = Vec::new();
    let mut overflowed = false;

    log_info!("serial reader started on {}", port);

    loop {
        if cancel.is_cancelled() {
            log_info!("serial reader on {} cancelled", port);
            break;
        }

        // One byte past the cap, so a full-length line still fits its `\n`.
        let budget = (MAX_LINE_BYTES + 1).saturating_sub(pending.len()) as u64;
        match (&mut reader).take(budget).read_until(b'\n', &mut pending) {
            Ok(0) => {
                log_info!("serial stream on {} ended", port);
                let _ = events.send(LinkEvent::Closed);
                break;
            }
            Ok(_) => {
                if pending.last() != Some(&b'\n') {
                    if pending.len() > MAX_LINE_BYTES {
                        if !overflowed {
                            log_warn!(
                                "discarding over-long line on {} (more than {} bytes)",
                                port,
                                MAX_LINE_BYTES
                            );
                        }
                        pending.clear();
                        overflowed = true;
                    }
                    // Otherwise the stream ended mid-line; the next call reports EOF.
                    continue;
                }
                if overflowed {
                    // Tail of an over-long line.
                    pending.clear();
                    overflowed = false;
                    continue;
                }
                let raw = decode_line(&pending);
                pending.clear();
                log_debug!("{} <- {:?}", port, raw);
                let event = LinkEvent::Line { raw, at: clock.now() };
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                continue;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                log_error!("serial read on {} failed: {err}", port);
                let _ = events.send(LinkEvent::Failed(err.to_string()));
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches(['\n', '\r']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::tests::FixedClock;
    use chrono::{DateTime, Utc};
    use std::io::{self, Cursor};
    use tokio::sync::mpsc;

    fn collect(stream: Box<dyn Read + Send>) -> Vec<LinkEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let clock = Arc::new(FixedClock(arrival()));
        read_lines("test".into(), stream, clock, tx, CancellationToken::new());
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn arrival() -> DateTime<Utc> {
        DateTime::from_timestamp(1_709_280_000, 0).unwrap()
    }

    fn line(raw: &str) -> LinkEvent {
        LinkEvent::Line {
            raw: raw.into(),
            at: arrival(),
        }
    }

    #[test]
    fn forwards_lines_in_order_without_terminators() {
        let events = collect(Box::new(Cursor::new(b"512\r\n300\n\n".to_vec())));
        assert_eq!(
            events,
            vec![
                line("512"),
                line("300"),
                line(""),
                LinkEvent::Closed,
            ]
        );
    }

    #[test]
    fn drops_a_trailing_partial_line_at_end_of_stream() {
        let events = collect(Box::new(Cursor::new(b"512\n51".to_vec())));
        assert_eq!(events, vec![line("512"), LinkEvent::Closed]);
    }

    /// Yields a chunk, then a timeout, then the rest.
    struct Stuttering {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for Stuttering {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let bytes = self.chunks.remove(0)?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }
    }

    #[test]
    fn partial_line_survives_a_read_timeout() {
        let stream = Stuttering {
            chunks: vec![
                Ok(b"10".to_vec()),
                Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
                Ok(b"24\n".to_vec()),
            ],
        };
        let events = collect(Box::new(stream));
        assert_eq!(events, vec![line("1024"), LinkEvent::Closed]);
    }

    #[test]
    fn hard_read_errors_end_the_link() {
        let stream = Stuttering {
            chunks: vec![
                Ok(b"1\n".to_vec()),
                Err(io::Error::new(ErrorKind::BrokenPipe, "device unplugged")),
            ],
        };
        let events = collect(Box::new(stream));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], LinkEvent::Failed(_)));
    }

    #[test]
    fn cancelled_reader_exits_without_reading() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stream = Box::new(Cursor::new(b"1\n".to_vec()));
        read_lines("test".into(), stream, Arc::new(FixedClock(arrival())), tx, cancel);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn over_long_lines_are_dropped_and_reading_resumes() {
        let mut bytes = vec![b'7'; 1000];
        bytes.extend_from_slice(b"\n512\n");
        let events = collect(Box::new(Cursor::new(bytes)));
        assert_eq!(events, vec![line("512"), LinkEvent::Closed]);
    }

    #[test]
    fn a_line_at_the_length_cap_is_kept() {
        let mut bytes = vec![b'1'; MAX_LINE_BYTES];
        bytes.push(b'\n');
        let events = collect(Box::new(Cursor::new(bytes)));
        let longest = "1".repeat(MAX_LINE_BYTES);
        assert_eq!(events, vec![line(&longest), LinkEvent::Closed]);
    }
}
