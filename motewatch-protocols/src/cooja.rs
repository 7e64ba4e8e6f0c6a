//! ## motewatch-protocols::cooja
//! Parser for the application log lines motes print during a Cooja run.
//!
//! A line looks like `[INFO: App       ] Sending packet seqno 12 to fd00::201:1:1:1`.
//! Everything up to the first `]` is the log-module prefix; the rest is
//! trimmed and split on whitespace. Two six-token shapes are recognised:
//!
//! - `<x> received <x> <sender> <x> <x>`: the server got a packet; the sender
//!   id is the trailing decimal digits of the fourth token.
//! - `Sending <x> <x> <x> <x> <x>`: a node sent a packet; the node is the one
//!   that printed the line.
//!
//! RPL control traffic (`sending a DIS`, `sending a DIO`, `sending a DAO`
//! anywhere in the message) is counted for the node that printed the line.
//!
//! Anything else is ignored. Parsing never fails loudly: errors are folded
//! into [`MoteEvent::Ignored`] by [`CoojaLogParser::classify`].

use std::fmt;

use thiserror::Error;

const PREFIX_DELIMITER: char = ']';
const EXPECTED_TOKENS: usize = 6;
const CONTROL_MARKERS: [(&str, ControlMessage); 3] = [
    ("sending a DIS", ControlMessage::Dis),
    ("sending a DIO", ControlMessage::Dio),
    ("sending a DAO", ControlMessage::Dao),
];

/// Reasons a log line does not produce a packet event.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("log payload is not valid UTF-8")]
    NonUtf8,
    #[error("no ']' delimiter in log line")]
    MissingDelimiter,
    #[error("unrecognised message shape ({tokens} tokens)")]
    UnrecognizedShape { tokens: usize },
    #[error("no numeric node id in '{0}'")]
    InvalidSenderId(String),
}

/// RPL control message kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlMessage {
    /// DODAG Information Solicitation
    Dis,
    /// DODAG Information Object
    Dio,
    /// Destination Advertisement Object
    Dao,
}

impl ControlMessage {
    pub const ALL: [ControlMessage; 3] = [ControlMessage::Dis, ControlMessage::Dio, ControlMessage::Dao];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlMessage::Dis => "DIS",
            ControlMessage::Dio => "DIO",
            ControlMessage::Dao => "DAO",
        }
    }

    /// Finds the first `sending a <KIND>` marker in a message.
    fn find_in(message: &str) -> Option<Self> {
        CONTROL_MARKERS
            .iter()
            .filter_map(|(marker, kind)| message.find(marker).map(|at| (at, *kind)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, kind)| kind)
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packet activity derived from one log line.
///
/// Node ids are kept raw (signed, unchecked); range checking belongs to the
/// consumer that knows the node count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoteEvent {
    Sent { node: i64, timestamp: u64 },
    Received { sender: i64, timestamp: u64 },
    Control { node: i64, kind: ControlMessage, timestamp: u64 },
    Ignored { reason: ParseError },
}

impl MoteEvent {
    pub fn is_ignored(&self) -> bool {
        matches!(self, MoteEvent::Ignored { .. })
    }
}

#[derive(Default, Debug, Copy, Clone)]
pub struct CoojaLogParser;

impl CoojaLogParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses one raw log line printed by `origin` at `timestamp` (usec).
    pub fn parse(&self, raw: &[u8], origin: i64, timestamp: u64) -> Result<MoteEvent, ParseError> {
        let text = std::str::from_utf8(raw).map_err(|_| ParseError::NonUtf8)?;
        let position = text
            .find(PREFIX_DELIMITER)
            .ok_or(ParseError::MissingDelimiter)?;
        let message = text[position + PREFIX_DELIMITER.len_utf8()..].trim();
        let tokens: Vec<&str> = message.split_whitespace().collect();

        if tokens.len() == EXPECTED_TOKENS {
            if tokens[1] == "received" {
                let sender = trailing_id(tokens[3])?;
                return Ok(MoteEvent::Received { sender, timestamp });
            }
            if tokens[0] == "Sending" {
                return Ok(MoteEvent::Sent {
                    node: origin,
                    timestamp,
                });
            }
        }

        match ControlMessage::find_in(message) {
            Some(kind) => Ok(MoteEvent::Control {
                node: origin,
                kind,
                timestamp,
            }),
            None => Err(ParseError::UnrecognizedShape {
                tokens: tokens.len(),
            }),
        }
    }

    /// Like [`parse`](Self::parse) but never fails.
    #[inline]
    pub fn classify(&self, raw: &[u8], origin: i64, timestamp: u64) -> MoteEvent {
        self.parse(raw, origin, timestamp)
            .unwrap_or_else(|reason| MoteEvent::Ignored { reason })
    }
}

/// Decimal digits at the end of an address token, e.g. `fd00::207:7:7:7` -> 7.
fn trailing_id(token: &str) -> Result<i64, ParseError> {
    let digits_start = token
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .ok_or_else(|| ParseError::InvalidSenderId(token.to_string()))?;

    token[digits_start..]
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidSenderId(token.to_string()))
}
