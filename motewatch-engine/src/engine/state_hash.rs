//! Run fingerprint: a BLAKE3 digest over every line written to the sink.

use std::io;

use blake3::Hasher;

use motewatch_telemetry::sink::{format_line, Sink};

pub struct HashingSink<S> {
    inner: S,
    hasher: Hasher,
    lines: u64,
}

impl<S: Sink> HashingSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            lines: 0,
        }
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Hex digest of the lines so far.
    pub fn digest(&self) -> String {
        hex::encode(self.hasher.finalize().as_bytes())
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sink> Sink for HashingSink<S> {
    fn append(&mut self, time_us: u64, node: Option<i64>, message: &str) -> io::Result<()> {
        let line = format_line(time_us, node, message);
        self.hasher.update(line.as_bytes());
        self.hasher.update(b"\n");
        self.lines += 1;
        self.inner.append(time_us, node, message)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
