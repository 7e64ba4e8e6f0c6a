//! ## motewatch-telemetry::sink
//! **Run-log output**
//!
//! Every observer line has the shape `"<seconds>\tID:<node>\t<message>"`.
//! Lines that do not belong to a node carry `ID:-1`.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

/// Node id printed for observer-level lines.
pub const OBSERVER_ID: i64 = -1;

/// Formats one run-log line. `time_us` is printed as exact seconds with six
/// fractional digits so the log can be replayed without rounding.
pub fn format_line(time_us: u64, node: Option<i64>, message: &str) -> String {
    format!(
        "{}.{:06}\tID:{}\t{}",
        time_us / 1_000_000,
        time_us % 1_000_000,
        node.unwrap_or(OBSERVER_ID),
        message
    )
}

pub trait Sink {
    fn append(&mut self, time_us: u64, node: Option<i64>, message: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn append(&mut self, time_us: u64, node: Option<i64>, message: &str) -> io::Result<()> {
        (**self).append(time_us, node, message)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Writes newline-terminated lines to any writer.
pub struct LineSink<W: Write> {
    writer: W,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineSink<BufWriter<File>> {
    /// Truncates or creates the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl LineSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Sink for LineSink<W> {
    fn append(&mut self, time_us: u64, node: Option<i64>, message: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", format_line(time_us, node, message))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Sink for MemorySink {
    fn append(&mut self, time_us: u64, node: Option<i64>, message: &str) -> io::Result<()> {
        self.lines.push(format_line(time_us, node, message));
        Ok(())
    }
}
