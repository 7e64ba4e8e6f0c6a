//! Replays a recorded run log as an event feed.
//!
//! Each line is `<time>\tID:<node>\t<message>`. The time is either seconds
//! with a fractional part (`12.000450`) or whole microseconds (`12000450`).
//! Lines that do not fit are skipped with a warning.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use motewatch_core::events::SimEvent;

use crate::error::{SimulatorError, TraceLineError};

pub struct TraceReplayer<R> {
    reader: R,
    line: String,
    line_no: usize,
    skipped: usize,
}

impl TraceReplayer<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SimulatorError::OpenTrace {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReplayer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn next_event(&mut self) -> Result<Option<SimEvent>, SimulatorError> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|source| SimulatorError::ReadTrace {
                    line: self.line_no + 1,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            match parse_trace_line(line) {
                Ok(event) => return Ok(Some(event)),
                Err(err) => {
                    self.skipped += 1;
                    warn!(line = self.line_no, error = %err, "skipping trace line");
                }
            }
        }
    }
}

pub fn parse_trace_line(line: &str) -> Result<SimEvent, TraceLineError> {
    let mut fields = line.splitn(3, '\t');
    let (Some(time), Some(node), Some(message)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(TraceLineError::MissingField);
    };

    let timestamp = parse_time_us(time.trim())?;
    let origin = node
        .trim()
        .strip_prefix("ID:")
        .and_then(|id| id.parse::<i64>().ok())
        .ok_or_else(|| TraceLineError::InvalidNode(node.to_string()))?;

    Ok(SimEvent::log(timestamp, origin, message.to_string()))
}

/// Exact conversion, no floating point. Digits past microseconds are
/// truncated.
fn parse_time_us(raw: &str) -> Result<u64, TraceLineError> {
    let invalid = || TraceLineError::InvalidTime(raw.to_string());
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    match raw.split_once('.') {
        None if digits(raw) => raw.parse::<u64>().map_err(|_| invalid()),
        None => Err(invalid()),
        Some((secs, frac)) => {
            if !digits(secs) || !(frac.is_empty() || digits(frac)) {
                return Err(invalid());
            }
            let secs: u64 = secs.parse().map_err(|_| invalid())?;
            let mut micros = 0u64;
            for i in 0..6 {
                let digit = frac.as_bytes().get(i).map_or(0, |b| u64::from(b - b'0'));
                micros = micros * 10 + digit;
            }
            secs.checked_mul(1_000_000)
                .and_then(|us| us.checked_add(micros))
                .ok_or_else(invalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn parses_both_time_forms() {
        assert_eq!(
            parse_trace_line("12.00045\tID:7\thello").unwrap(),
            SimEvent::log(12_000_450, 7, "hello")
        );
        assert_eq!(
            parse_trace_line("12000450\tID:-1\ta\tb").unwrap(),
            SimEvent::log(12_000_450, -1, "a\tb")
        );
        assert_eq!(parse_time_us("1.1234567").unwrap(), 1_123_456);
        assert_eq!(parse_time_us("3.").unwrap(), 3_000_000);
    }

    #[test]
    fn rejects_malformed_fields() {
        assert_eq!(
            parse_trace_line("no tabs here"),
            Err(TraceLineError::MissingField)
        );
        assert!(matches!(
            parse_trace_line("-1.0\tID:1\tx"),
            Err(TraceLineError::InvalidTime(_))
        ));
        assert!(matches!(
            parse_trace_line("1.0\tnode7\tx"),
            Err(TraceLineError::InvalidNode(_))
        ));
        assert!(parse_time_us("1e3").is_err());
        assert!(parse_time_us(".5").is_err());
    }

    #[test]
    fn replayer_skips_bad_lines() {
        let trace = "1.0\tID:2\tfirst\n\ngarbage\r\n2000000\tID:3\tsecond\r\n";
        let mut replayer = TraceReplayer::new(Cursor::new(trace));
        assert_eq!(
            replayer.next_event().unwrap(),
            Some(SimEvent::log(1_000_000, 2, "first"))
        );
        assert_eq!(
            replayer.next_event().unwrap(),
            Some(SimEvent::log(2_000_000, 3, "second"))
        );
        assert_eq!(replayer.next_event().unwrap(), None);
        assert_eq!(replayer.skipped(), 1);
    }

    #[test]
    fn opens_trace_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0.500000\tID:4\tSending packet").unwrap();
        let mut replayer = TraceReplayer::open(file.path()).unwrap();
        assert_eq!(replayer.next_event().unwrap().unwrap().timestamp(), 500_000);

        assert!(matches!(
            TraceReplayer::open("missing/trace.log"),
            Err(SimulatorError::OpenTrace { .. })
        ));
    }
}
