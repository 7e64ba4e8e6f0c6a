//! ## motewatch-attacks::descriptor
//! **Per-attack state machine**
//!
//! ```text
//!   Idle ──(now > start, flag write ok)──▶ Active ──(now > end, flag write ok)──▶ Finished
//! ```
//!
//! Transitions happen only when the memory write behind them succeeds. A
//! failed write (missing symbol, unknown node) leaves the state untouched and
//! is re-attempted on the next tick. While `Active` and before `end`, due
//! fault-program steps are written in stored order; the cursor advances once
//! per successful write and never moves back.

use std::fmt;

use tracing::{debug, info};

use motewatch_core::memory::{write_node_byte, MemoryDirectory};
use motewatch_core::{MemoryError, NodeId};

use crate::program::FaultProgram;

/// Flag value written when an attack switches on.
pub const ACTIVE_SENTINEL: u8 = 0xFF;
/// Flag value written when an attack switches off.
pub const INACTIVE_SENTINEL: u8 = 0x00;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackState {
    Idle,
    Active,
    Finished,
}

/// Which pending write a deferral refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Activation,
    FaultStep(usize),
    Deactivation,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Activation => f.write_str("activation"),
            Transition::FaultStep(i) => write!(f, "fault step {}", i),
            Transition::Deactivation => f.write_str("deactivation"),
        }
    }
}

/// Observable outcome of a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackEvent {
    Started {
        attack: String,
        target: NodeId,
        time: u64,
    },
    FaultApplied {
        attack: String,
        target: NodeId,
        time: u64,
        symbol: String,
        index: usize,
        value: u8,
    },
    Stopped {
        attack: String,
        target: NodeId,
        time: u64,
    },
    Deferred {
        attack: String,
        target: NodeId,
        time: u64,
        transition: Transition,
        error: MemoryError,
        /// Consecutive failed attempts for this transition, starting at 1.
        attempt: u32,
    },
}

impl AttackEvent {
    pub fn target(&self) -> NodeId {
        match self {
            AttackEvent::Started { target, .. }
            | AttackEvent::FaultApplied { target, .. }
            | AttackEvent::Stopped { target, .. }
            | AttackEvent::Deferred { target, .. } => *target,
        }
    }

    pub fn time(&self) -> u64 {
        match self {
            AttackEvent::Started { time, .. }
            | AttackEvent::FaultApplied { time, .. }
            | AttackEvent::Stopped { time, .. }
            | AttackEvent::Deferred { time, .. } => *time,
        }
    }

    /// Sink line for this event.
    pub fn message(&self) -> String {
        match self {
            AttackEvent::Started { attack, .. } => {
                format!("[WARN: {} ] attack has started", attack)
            }
            AttackEvent::FaultApplied {
                attack,
                symbol,
                index,
                value,
                ..
            } => format!(
                "[WARN: {} ] fault step {} wrote {:#04x} to {}",
                attack, index, value, symbol
            ),
            AttackEvent::Stopped { attack, .. } => {
                format!("[WARN: {} ] attack has stopped", attack)
            }
            AttackEvent::Deferred {
                attack,
                transition,
                error,
                attempt,
                ..
            } => format!(
                "[WARN: {} ] {} deferred (attempt {}): {}",
                attack, transition, attempt, error
            ),
        }
    }
}

/// One configured attack and its progress through the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackDescriptor {
    symbol: String,
    target: NodeId,
    start_us: u64,
    end_us: u64,
    state: AttackState,
    program: FaultProgram,
    cursor: usize,
    failed_attempts: u32,
}

impl AttackDescriptor {
    /// Window bounds are given in milliseconds of simulation time and
    /// saturate at the end of representable time.
    pub fn new(symbol: impl Into<String>, target: NodeId, start_ms: u64, end_ms: u64) -> Self {
        Self {
            symbol: symbol.into(),
            target,
            start_us: start_ms.saturating_mul(1_000),
            end_us: end_ms.saturating_mul(1_000),
            state: AttackState::Idle,
            program: FaultProgram::default(),
            cursor: 0,
            failed_attempts: 0,
        }
    }

    pub fn with_program(mut self, program: FaultProgram) -> Self {
        self.program = program;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn state(&self) -> AttackState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn program(&self) -> &FaultProgram {
        &self.program
    }

    pub fn window_us(&self) -> (u64, u64) {
        (self.start_us, self.end_us)
    }

    /// Symbol the fault program writes to.
    pub fn program_symbol(&self) -> &str {
        self.program.symbol().unwrap_or(&self.symbol)
    }

    /// Advances the state machine to `now` (usec), issuing writes through
    /// `memory`. Returns what happened, in order.
    pub fn tick<D>(&mut self, now: u64, memory: &mut D) -> Vec<AttackEvent>
    where
        D: MemoryDirectory + ?Sized,
    {
        let mut events = Vec::new();

        if self.state == AttackState::Idle && now > self.start_us {
            match write_node_byte(memory, self.target, &self.symbol, 0, ACTIVE_SENTINEL) {
                Ok(()) => {
                    self.state = AttackState::Active;
                    self.failed_attempts = 0;
                    info!(attack = %self.symbol, target = %self.target, now, "attack has started");
                    events.push(AttackEvent::Started {
                        attack: self.symbol.clone(),
                        target: self.target,
                        time: now,
                    });
                }
                Err(error) => events.push(self.defer(Transition::Activation, now, error)),
            }
        }

        if self.state == AttackState::Active && now < self.end_us {
            self.run_program(now, memory, &mut events);
        }

        if self.state == AttackState::Active && now > self.end_us {
            match write_node_byte(memory, self.target, &self.symbol, 0, INACTIVE_SENTINEL) {
                Ok(()) => {
                    self.state = AttackState::Finished;
                    self.failed_attempts = 0;
                    info!(attack = %self.symbol, target = %self.target, now, "attack has stopped");
                    events.push(AttackEvent::Stopped {
                        attack: self.symbol.clone(),
                        target: self.target,
                        time: now,
                    });
                }
                Err(error) => events.push(self.defer(Transition::Deactivation, now, error)),
            }
        }

        events
    }

    fn run_program<D>(&mut self, now: u64, memory: &mut D, events: &mut Vec<AttackEvent>)
    where
        D: MemoryDirectory + ?Sized,
    {
        while let Some(step) = self.program.due(self.cursor, now) {
            let symbol = self.program_symbol().to_string();
            match write_node_byte(memory, self.target, &symbol, 0, step.value) {
                Ok(()) => {
                    debug!(attack = %self.symbol, index = self.cursor, value = step.value, "fault step applied");
                    events.push(AttackEvent::FaultApplied {
                        attack: self.symbol.clone(),
                        target: self.target,
                        time: now,
                        symbol,
                        index: self.cursor,
                        value: step.value,
                    });
                    self.cursor += 1;
                    self.failed_attempts = 0;
                }
                Err(error) => {
                    // Later steps wait behind this one to keep the stored order.
                    let transition = Transition::FaultStep(self.cursor);
                    events.push(self.defer(transition, now, error));
                    break;
                }
            }
        }
    }

    fn defer(&mut self, transition: Transition, now: u64, error: MemoryError) -> AttackEvent {
        self.failed_attempts += 1;
        debug!(attack = %self.symbol, %transition, %error, attempt = self.failed_attempts, "write deferred");
        AttackEvent::Deferred {
            attack: self.symbol.clone(),
            target: self.target,
            time: now,
            transition,
            error,
            attempt: self.failed_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::FaultStep;
    use crate::test_memory::TestDirectory;
    use tracing_test::traced_test;

    const TARGET: NodeId = NodeId::new(7);

    #[test]
    #[traced_test]
    fn activates_exactly_once_within_window() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SHA_on"]);
        let mut attack = AttackDescriptor::new("SHA_on", TARGET, 0, 1_000);

        let mut started = 0;
        for _ in 0..5 {
            started += attack
                .tick(500_000, &mut memory)
                .iter()
                .filter(|e| matches!(e, AttackEvent::Started { .. }))
                .count();
        }
        attack.tick(999_999, &mut memory);

        assert_eq!(started, 1);
        assert_eq!(attack.state(), AttackState::Active);
        assert_eq!(memory.byte(TARGET, "SHA_on"), Some(ACTIVE_SENTINEL));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|l| l.contains("attack has started")).count() {
                1 => Ok(()),
                n => Err(format!("expected one start log, saw {}", n)),
            }
        });
        assert!(!logs_contain("attack has stopped"));
    }

    #[test]
    fn huge_window_saturates_instead_of_overflowing() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SHA_on"]);
        let start_ms = u64::MAX / 1_000 + 1;
        let mut attack = AttackDescriptor::new("SHA_on", TARGET, start_ms, u64::MAX);
        assert_eq!(attack.window_us(), (u64::MAX, u64::MAX));

        // `now > start` can never hold, so the attack stays idle forever.
        assert!(attack.tick(u64::MAX, &mut memory).is_empty());
        assert_eq!(attack.state(), AttackState::Idle);
    }

    #[test]
    fn start_boundary_is_exclusive() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SFA_on"]);
        let mut attack = AttackDescriptor::new("SFA_on", TARGET, 300, 600);
        assert!(attack.tick(300_000, &mut memory).is_empty());
        assert_eq!(attack.state(), AttackState::Idle);
        assert_eq!(memory.write_count(), 0);
    }

    #[test]
    fn deactivates_after_end_and_then_is_terminal() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SHA_on"]);
        let mut attack = AttackDescriptor::new("SHA_on", TARGET, 0, 1_000);
        attack.tick(1, &mut memory);
        let events = attack.tick(1_000_001, &mut memory);

        assert_eq!(
            events,
            vec![AttackEvent::Stopped {
                attack: "SHA_on".into(),
                target: TARGET,
                time: 1_000_001
            }]
        );
        assert_eq!(attack.state(), AttackState::Finished);
        assert_eq!(memory.byte(TARGET, "SHA_on"), Some(INACTIVE_SENTINEL));

        let writes = memory.write_count();
        assert!(attack.tick(5_000_000, &mut memory).is_empty());
        assert_eq!(memory.write_count(), writes);
    }

    #[test]
    fn late_first_tick_starts_and_stops_in_one_pass() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["DFA_on"]);
        let mut attack = AttackDescriptor::new("DFA_on", TARGET, 0, 10);
        let events = attack.tick(20_000, &mut memory);
        assert!(matches!(events[0], AttackEvent::Started { .. }));
        assert!(matches!(events[1], AttackEvent::Stopped { .. }));
        assert_eq!(attack.state(), AttackState::Finished);
    }

    #[test]
    fn missing_symbol_defers_activation_until_it_appears() {
        let mut memory = TestDirectory::with_symbols(TARGET, &[]);
        let mut attack = AttackDescriptor::new("VNA_on", TARGET, 0, 1_000);

        let events = attack.tick(10, &mut memory);
        assert!(matches!(
            &events[..],
            [AttackEvent::Deferred {
                transition: Transition::Activation,
                attempt: 1,
                ..
            }]
        ));
        assert_eq!(attack.state(), AttackState::Idle);

        let events = attack.tick(20, &mut memory);
        assert!(matches!(&events[..], [AttackEvent::Deferred { attempt: 2, .. }]));

        memory.add_symbol(TARGET, "VNA_on");
        let events = attack.tick(30, &mut memory);
        assert!(matches!(&events[..], [AttackEvent::Started { .. }]));
        assert_eq!(attack.state(), AttackState::Active);
    }

    #[test]
    fn missing_symbol_keeps_attack_active_past_end() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SHA_on"]);
        let mut attack = AttackDescriptor::new("SHA_on", TARGET, 0, 1);
        attack.tick(10, &mut memory);
        memory.remove_symbol(TARGET, "SHA_on");

        let events = attack.tick(2_000, &mut memory);
        assert!(matches!(
            &events[..],
            [AttackEvent::Deferred {
                transition: Transition::Deactivation,
                ..
            }]
        ));
        assert_eq!(attack.state(), AttackState::Active);

        memory.add_symbol(TARGET, "SHA_on");
        attack.tick(3_000, &mut memory);
        assert_eq!(attack.state(), AttackState::Finished);
    }

    #[test]
    fn fault_program_applies_each_step_once_in_order() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SYA_on", "fake_id"]);
        let program = FaultProgram::new(
            Some("fake_id".into()),
            vec![FaultStep::at_ms(200, 0x09), FaultStep::at_ms(400, 0x26)],
        );
        let mut attack = AttackDescriptor::new("SYA_on", TARGET, 0, 600_000).with_program(program);

        attack.tick(150_000, &mut memory);
        assert_eq!(attack.cursor(), 0);
        assert_eq!(memory.writes_to(TARGET, "fake_id"), Vec::<u8>::new());

        attack.tick(250_000, &mut memory);
        assert_eq!(attack.cursor(), 1);
        assert_eq!(memory.writes_to(TARGET, "fake_id"), vec![0x09]);

        attack.tick(450_000, &mut memory);
        assert_eq!(attack.cursor(), 2);
        assert_eq!(memory.writes_to(TARGET, "fake_id"), vec![0x09, 0x26]);

        attack.tick(500_000, &mut memory);
        attack.tick(550_000, &mut memory);
        assert_eq!(memory.writes_to(TARGET, "fake_id"), vec![0x09, 0x26]);
        assert_eq!(memory.byte(TARGET, "fake_id"), Some(0x26));
    }

    #[test]
    fn one_tick_crossing_several_steps_applies_all_in_order() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SYA_on"]);
        let program = FaultProgram::new(
            None,
            vec![
                FaultStep::at_ms(1, 0x01),
                FaultStep::at_ms(2, 0x02),
                FaultStep::at_ms(3, 0x03),
            ],
        );
        let mut attack = AttackDescriptor::new("SYA_on", TARGET, 0, 100).with_program(program);

        let events = attack.tick(50_000, &mut memory);
        let applied: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                AttackEvent::FaultApplied { value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(applied, vec![0x01, 0x02, 0x03]);
        assert_eq!(attack.cursor(), 3);
        // Switch flag first, then the three program writes on the same symbol.
        assert_eq!(memory.writes_to(TARGET, "SYA_on"), vec![0xFF, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn missing_program_symbol_blocks_later_steps() {
        let mut memory = TestDirectory::with_symbols(TARGET, &["SYA_on"]);
        let program = FaultProgram::new(
            Some("fake_id".into()),
            vec![FaultStep::at_ms(1, 0x09), FaultStep::at_ms(2, 0x26)],
        );
        let mut attack = AttackDescriptor::new("SYA_on", TARGET, 0, 100).with_program(program);

        let events = attack.tick(5_000, &mut memory);
        assert!(events.iter().any(|e| matches!(
            e,
            AttackEvent::Deferred {
                transition: Transition::FaultStep(0),
                ..
            }
        )));
        assert_eq!(attack.cursor(), 0);

        memory.add_symbol(TARGET, "fake_id");
        attack.tick(6_000, &mut memory);
        assert_eq!(attack.cursor(), 2);
        assert_eq!(memory.writes_to(TARGET, "fake_id"), vec![0x09, 0x26]);
    }

    #[test]
    fn messages_match_their_transitions() {
        let started = AttackEvent::Started {
            attack: "SHA_on".into(),
            target: TARGET,
            time: 0,
        };
        let stopped = AttackEvent::Stopped {
            attack: "SHA_on".into(),
            target: TARGET,
            time: 0,
        };
        assert_eq!(started.message(), "[WARN: SHA_on ] attack has started");
        assert_eq!(stopped.message(), "[WARN: SHA_on ] attack has stopped");
    }
}
