//! Ticks every configured attack against the shared node memory.

use tracing::trace;

use motewatch_core::memory::MemoryDirectory;

use crate::descriptor::{AttackDescriptor, AttackEvent, AttackState};

/// The fixed set of attacks for a run.
#[derive(Clone, Debug, Default)]
pub struct AttackScheduler {
    attacks: Vec<AttackDescriptor>,
}

impl AttackScheduler {
    pub fn new(attacks: Vec<AttackDescriptor>) -> Self {
        Self { attacks }
    }

    /// Advances every attack to `now`. A deferral on one attack never stops
    /// the others from being evaluated.
    pub fn tick<D>(&mut self, now: u64, memory: &mut D) -> Vec<AttackEvent>
    where
        D: MemoryDirectory + ?Sized,
    {
        trace!(now, attacks = self.attacks.len(), "scheduler tick");
        self.attacks
            .iter_mut()
            .flat_map(|attack| attack.tick(now, memory))
            .collect()
    }

    pub fn attacks(&self) -> &[AttackDescriptor] {
        &self.attacks
    }

    pub fn active_count(&self) -> usize {
        self.count_in(AttackState::Active)
    }

    /// True once no attack can change state any more.
    pub fn all_finished(&self) -> bool {
        self.count_in(AttackState::Finished) == self.attacks.len()
    }

    fn count_in(&self, state: AttackState) -> usize {
        self.attacks.iter().filter(|a| a.state() == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Transition;
    use crate::program::{FaultProgram, FaultStep};
    use crate::test_memory::TestDirectory;
    use motewatch_core::NodeId;
    use proptest::prelude::*;

    #[test]
    fn deferred_attack_does_not_block_others() {
        let target = NodeId::new(7);
        let mut memory = TestDirectory::with_symbols(target, &["SHA_on"]);
        let mut scheduler = AttackScheduler::new(vec![
            AttackDescriptor::new("SFA_on", target, 0, 1_000),
            AttackDescriptor::new("SHA_on", target, 0, 1_000),
            AttackDescriptor::new("DFA_on", NodeId::new(16), 0, 1_000),
        ]);

        let events = scheduler.tick(10, &mut memory);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            AttackEvent::Deferred {
                transition: Transition::Activation,
                ..
            }
        ));
        assert!(matches!(&events[1], AttackEvent::Started { .. }));
        assert!(matches!(
            &events[2],
            AttackEvent::Deferred {
                error: motewatch_core::MemoryError::UnknownNode(_),
                ..
            }
        ));
        assert_eq!(scheduler.active_count(), 1);
        assert!(!scheduler.all_finished());
    }

    #[test]
    fn empty_scheduler_is_finished() {
        let scheduler = AttackScheduler::default();
        assert!(scheduler.all_finished());
    }

    fn rank(state: AttackState) -> u8 {
        match state {
            AttackState::Idle => 0,
            AttackState::Active => 1,
            AttackState::Finished => 2,
        }
    }

    proptest! {
        #[test]
        fn states_and_cursors_only_move_forward(
            mut times in proptest::collection::vec(0u64..2_000_000, 1..60),
            flaky in proptest::collection::vec(any::<bool>(), 60),
        ) {
            times.sort_unstable();
            let target = NodeId::new(3);
            let mut memory = TestDirectory::with_symbols(target, &["SYA_on"]);
            let program = FaultProgram::new(
                Some("fake_id".into()),
                vec![FaultStep::at_ms(200, 0x09), FaultStep::at_ms(400, 0x26), FaultStep::at_ms(900, 0x11)],
            );
            let mut scheduler = AttackScheduler::new(vec![
                AttackDescriptor::new("SYA_on", target, 100, 1_500).with_program(program),
            ]);

            let mut last_rank = 0;
            let mut last_cursor = 0;
            let mut applied = Vec::new();
            for (i, now) in times.iter().enumerate() {
                // Flap the program symbol to exercise deferrals.
                if flaky[i] {
                    memory.add_symbol(target, "fake_id");
                } else {
                    memory.remove_symbol(target, "fake_id");
                }
                for event in scheduler.tick(*now, &mut memory) {
                    if let AttackEvent::FaultApplied { index, .. } = event {
                        applied.push(index);
                    }
                }
                let attack = &scheduler.attacks()[0];
                prop_assert!(rank(attack.state()) >= last_rank);
                prop_assert!(attack.cursor() >= last_cursor);
                last_rank = rank(attack.state());
                last_cursor = attack.cursor();
            }

            let expected: Vec<usize> = (0..applied.len()).collect();
            prop_assert_eq!(applied, expected);
        }
    }
}
