//! Single-producer single-consumer event bus.
//!
//! A bounded circular buffer indexed by two atomic counters. The producer
//! (simulator or trace replayer) only advances `head`, the consumer (the
//! observer loop) only advances `tail`, so events come out in exactly the
//! order they went in. Closing the bus lets the consumer tell "empty for
//! now" apart from "feed exhausted".

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use super::sim_event::SimEvent;

/// Event bus error conditions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Event queue capacity exceeded")]
    QueueFull,
    #[error("Invalid capacity (must be a power of two)")]
    InvalidCapacity,
    #[error("Event bus closed")]
    Closed,
}

/// Cache-line aligned atomic counter to prevent false sharing
#[repr(align(64))]
struct AlignedCounter(AtomicU64);

impl AlignedCounter {
    #[inline]
    fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }
}

struct InnerBus {
    buffer: Box<[UnsafeCell<Option<SimEvent>>]>,
    head: AlignedCounter,
    tail: AlignedCounter,
    mask: usize,
    closed: AtomicBool,
}

/// Ordered event bus between the feed and the observer.
pub struct EventBus {
    inner: Arc<InnerBus>,
}

impl EventBus {
    /// Creates new event bus with specified capacity.
    ///
    /// * `capacity` - Must be a power of two for efficient modulo operations.
    pub fn with_capacity(capacity: usize) -> Result<Self, EventError> {
        if !capacity.is_power_of_two() {
            return Err(EventError::InvalidCapacity);
        }

        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            inner: Arc::new(InnerBus {
                buffer,
                head: AlignedCounter::new(0),
                tail: AlignedCounter::new(0),
                mask: capacity - 1,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Creates new handle to shared event bus.
    #[inline]
    pub fn share(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Attempts to send event onto the bus.
    #[inline]
    pub fn send(&self, event: SimEvent) -> Result<(), EventError> {
        if self.is_closed() {
            return Err(EventError::Closed);
        }

        let head = self.inner.head.0.load(Ordering::Relaxed);
        let tail = self.inner.tail.0.load(Ordering::Acquire);

        if head - tail >= self.inner.buffer.len() as u64 {
            return Err(EventError::QueueFull);
        }

        // SAFETY: only the producer writes slot `head`, and the consumer will
        // not read it until the release store below publishes it.
        unsafe {
            let idx = (head as usize) & self.inner.mask;
            *self.inner.buffer[idx].get() = Some(event)
        }

        self.inner.head.0.store(head + 1, Ordering::Release);
        Ok(())
    }

    /// Attempts to receive an event from the bus.
    ///
    /// Returns `None` if the queue is empty.
    #[inline]
    pub fn recv(&self) -> Option<SimEvent> {
        let tail = self.inner.tail.0.load(Ordering::Relaxed);
        let head = self.inner.head.0.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        // SAFETY: slot `tail` was published by the producer and is not
        // rewritten until the consumer advances `tail`.
        let event = unsafe {
            let idx = (tail as usize) & self.inner.mask;
            (*self.inner.buffer[idx].get()).take()
        };

        self.inner.tail.0.store(tail + 1, Ordering::Release);
        event
    }

    /// Marks the feed as exhausted. Queued events can still be received.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn len(&self) -> usize {
        let head = self.inner.head.0.load(Ordering::Acquire);
        let tail = self.inner.tail.0.load(Ordering::Acquire);
        (head - tail) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closed and fully consumed.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.is_closed() && self.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.buffer.len()
    }
}

// SAFETY: slot access is serialised by the head/tail counters under the
// single-producer single-consumer discipline.
unsafe impl Send for InnerBus {}
unsafe impl Sync for InnerBus {}
