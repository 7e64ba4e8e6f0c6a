//! # motewatch Log Parsers
//!
//! Turns raw node log lines into packet send/receive and RPL control events.

pub mod cooja;

pub use cooja::{CoojaLogParser, ControlMessage, MoteEvent, ParseError};
