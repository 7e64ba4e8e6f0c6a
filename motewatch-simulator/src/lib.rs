/*!
# motewatch Simulator

Deterministic event feeds for the observer.

## Key Components:
- **Virtual Clock:** simulated time in microseconds.
- **Mote Memory:** per-mote byte images with symbol tables, written by the
  attack scheduler.
- **Network Models:** seeded latency, jitter and packet loss.
- **Traffic Simulator:** motes reporting to a server, emitted as Cooja-style
  log lines in timestamp order.
- **Replay:** feeds a recorded run log back through the observer.
*/

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use tracing::{debug, trace};

use motewatch_config::{AttackConfig, NetworkConfig, RunConfig, SimulatorConfig};
use motewatch_core::events::SimEvent;
use motewatch_core::NodeId;

pub mod error;
pub mod mote_memory;
pub mod network_simulation;
pub mod replay;
pub mod virtual_clock;

pub use error::{SimulatorError, TraceLineError};
pub use mote_memory::{MoteMemory, MoteMemoryBank, SharedMemory};
pub use replay::TraceReplayer;
pub use virtual_clock::VirtualClock;

use network_simulation::jitter::{JitterModel, RandomJitterModel};
use network_simulation::latency::{FixedLatencyModel, LatencyModel};
use network_simulation::packet_loss::{PacketLossModel, ProbabilisticLossModel};

const LOG_PREFIX: &str = "[INFO: App       ]";

/// Contiki-style link-local address of a mote. The last group carries the
/// decimal id, which is what the log parser reads back.
pub fn mote_address(id: u32) -> String {
    format!("fd00::{:x}:{id}:{id}:{id}", 0x200 + id)
}

/// Builds the mote images an attack schedule needs: each attack's switch
/// symbol and program symbol on its target.
pub fn provision_memory(
    node_count: usize,
    attacks: &[AttackConfig],
    symbol_size: usize,
) -> MoteMemoryBank {
    let mut bank = MoteMemoryBank::new(node_count);
    for attack in attacks {
        let Some(mote) = bank.mote_mut(NodeId::new(attack.target)) else {
            continue;
        };
        mote.define_flag(&attack.symbol, symbol_size);
        if let Some(symbol) = attack.program.as_ref().and_then(|p| p.symbol.as_deref()) {
            mote.define(symbol, symbol_size);
        }
    }
    bank
}

/// Everything the traffic generator needs, in microseconds.
#[derive(Debug, Clone)]
pub struct TrafficSettings {
    pub node_count: usize,
    pub server_id: u32,
    pub seed: u64,
    pub send_count: usize,
    pub send_interval_us: u64,
    pub latency_ms: u64,
    pub jitter_ms: u64,
    pub loss_probability: f64,
    pub compromised_loss_probability: f64,
    pub tick_interval_us: Option<u64>,
}

impl TrafficSettings {
    pub fn from_config(network: &NetworkConfig, simulator: &SimulatorConfig, run: &RunConfig) -> Self {
        Self {
            node_count: network.node_count,
            server_id: network.server_id,
            seed: simulator.seed,
            send_count: simulator.event_count,
            send_interval_us: simulator.send_interval_ms.saturating_mul(1000),
            latency_ms: simulator.latency_ms,
            jitter_ms: simulator.jitter_ms,
            loss_probability: simulator.loss_probability,
            compromised_loss_probability: simulator.compromised_loss_probability,
            tick_interval_us: run.tick_interval_ms.map(|ms| ms.saturating_mul(1000)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficStats {
    pub sent: u64,
    pub dropped: u64,
    pub delivered: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheduled {
    Send,
    Delivery { sender: u32, seqno: u32 },
    Tick,
}

#[derive(Debug, PartialEq, Eq)]
struct Pending {
    at_us: u64,
    seq: u64,
    what: Scheduled,
}

// Min-heap on (time, insertion order).
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at_us, other.seq).cmp(&(self.at_us, self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Non-server motes take turns sending one packet to the server every
/// `send_interval_us`. Each packet is either lost or delivered after the
/// latency plus jitter delay. Motes whose attack flag is raised lose packets
/// at the compromised rate.
pub struct TrafficSimulator {
    settings: TrafficSettings,
    clock: VirtualClock,
    memory: SharedMemory,
    senders: Vec<u32>,
    seqnos: Vec<u32>,
    latency: FixedLatencyModel,
    jitter: RandomJitterModel,
    loss: ProbabilisticLossModel,
    compromised_loss: ProbabilisticLossModel,
    queue: BinaryHeap<Pending>,
    next_seq: u64,
    sends_scheduled: usize,
    in_flight: usize,
    stats: TrafficStats,
}

impl TrafficSimulator {
    pub fn new(settings: TrafficSettings, memory: SharedMemory) -> Self {
        let senders: Vec<u32> = (0..settings.node_count as u32)
            .filter(|id| *id != settings.server_id)
            .collect();
        let seed = settings.seed;
        let mut simulator = Self {
            clock: VirtualClock::new(0),
            memory,
            seqnos: vec![0; settings.node_count],
            senders,
            latency: FixedLatencyModel::new(settings.latency_ms),
            jitter: RandomJitterModel::new(settings.jitter_ms, seed),
            loss: ProbabilisticLossModel::new(settings.loss_probability, seed.wrapping_add(1)),
            compromised_loss: ProbabilisticLossModel::new(
                settings.compromised_loss_probability,
                seed.wrapping_add(2),
            ),
            queue: BinaryHeap::new(),
            next_seq: 0,
            sends_scheduled: 0,
            in_flight: 0,
            stats: TrafficStats::default(),
            settings,
        };
        simulator.schedule_next_send();
        if let Some(interval) = simulator.settings.tick_interval_us {
            if simulator.has_traffic() {
                simulator.push(interval, Scheduled::Tick);
            }
        }
        simulator
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn stats(&self) -> TrafficStats {
        self.stats
    }

    /// Produces the next event in timestamp order, or `None` once every
    /// packet has been sent and delivered or lost.
    pub fn next_event(&mut self) -> Option<SimEvent> {
        loop {
            let pending = self.queue.pop()?;
            self.clock.advance_to(pending.at_us);
            match pending.what {
                Scheduled::Send => {
                    self.schedule_next_send();
                    return Some(self.send(pending.at_us));
                }
                Scheduled::Delivery { sender, seqno } => {
                    self.in_flight -= 1;
                    self.stats.delivered += 1;
                    let line = format!(
                        "{LOG_PREFIX} Packet received from {} seqno {seqno}",
                        mote_address(sender)
                    );
                    return Some(SimEvent::log(
                        pending.at_us,
                        i64::from(self.settings.server_id),
                        line,
                    ));
                }
                Scheduled::Tick => {
                    if !self.has_traffic() {
                        continue;
                    }
                    if let Some(interval) = self.settings.tick_interval_us {
                        self.push(pending.at_us.saturating_add(interval), Scheduled::Tick);
                    }
                    return Some(SimEvent::tick(pending.at_us));
                }
            }
        }
    }

    fn send(&mut self, now: u64) -> SimEvent {
        let index = (self.stats.sent as usize) % self.senders.len();
        let sender = self.senders[index];
        let seqno = {
            let slot = &mut self.seqnos[sender as usize];
            *slot = slot.wrapping_add(1);
            *slot
        };
        self.stats.sent += 1;

        let compromised = self.memory.lock().is_compromised(NodeId::new(sender));
        let lost = if compromised {
            self.compromised_loss.should_drop()
        } else {
            self.loss.should_drop()
        };

        if lost {
            self.stats.dropped += 1;
            trace!(sender, seqno, compromised, "packet lost");
        } else {
            let delay = self.jitter.apply_jitter(self.latency.apply_latency(Duration::ZERO));
            let at = now.saturating_add(delay.as_micros() as u64);
            self.in_flight += 1;
            self.push(at, Scheduled::Delivery { sender, seqno });
        }

        let line = format!(
            "{LOG_PREFIX} Sending packet seqno {seqno} to {}",
            mote_address(self.settings.server_id)
        );
        SimEvent::log(now, i64::from(sender), line)
    }

    fn schedule_next_send(&mut self) {
        if self.senders.is_empty() || self.sends_scheduled >= self.settings.send_count {
            return;
        }
        self.sends_scheduled += 1;
        let at = (self.sends_scheduled as u64).saturating_mul(self.settings.send_interval_us);
        self.push(at, Scheduled::Send);
        if self.sends_scheduled == self.settings.send_count {
            debug!(sends = self.sends_scheduled, "last send scheduled");
        }
    }

    fn has_traffic(&self) -> bool {
        self.in_flight > 0 || self.queue.iter().any(|p| p.what == Scheduled::Send)
    }

    fn push(&mut self, at_us: u64, what: Scheduled) {
        self.queue.push(Pending {
            at_us,
            seq: self.next_seq,
            what,
        });
        self.next_seq += 1;
    }
}

impl Iterator for TrafficSimulator {
    type Item = SimEvent;

    fn next(&mut self) -> Option<SimEvent> {
        self.next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motewatch_attacks::descriptor::ACTIVE_SENTINEL;
    use motewatch_core::memory::write_node_byte;
    use motewatch_protocols::{CoojaLogParser, MoteEvent};

    fn settings(send_count: usize) -> TrafficSettings {
        TrafficSettings {
            node_count: 4,
            server_id: 1,
            seed: 42,
            send_count,
            send_interval_us: 1_000_000,
            latency_ms: 20,
            jitter_ms: 5,
            loss_probability: 0.0,
            compromised_loss_probability: 1.0,
            tick_interval_us: None,
        }
    }

    fn simulator(settings: TrafficSettings) -> TrafficSimulator {
        let memory = MoteMemoryBank::new(settings.node_count).into_shared();
        TrafficSimulator::new(settings, memory)
    }

    #[test]
    fn lossless_run_sends_round_robin_and_delivers_everything() {
        let parser = CoojaLogParser;
        let mut sim = simulator(settings(6));
        let mut last = 0;
        let mut senders = Vec::new();
        let mut received = 0;
        while let Some(event) = sim.next_event() {
            assert!(event.timestamp() >= last);
            last = event.timestamp();
            if let SimEvent::Log { timestamp, origin, payload } = &event {
                match parser.classify(payload, *origin, *timestamp) {
                    MoteEvent::Sent { node, .. } => senders.push(node),
                    MoteEvent::Received { .. } => received += 1,
                    MoteEvent::Ignored { reason } => panic!("unparsed line: {reason}"),
                    MoteEvent::Control { kind, .. } => panic!("unexpected {kind} line"),
                }
            }
        }
        assert_eq!(senders, vec![0, 2, 3, 0, 2, 3]);
        assert_eq!(received, 6);
        assert_eq!(sim.stats(), TrafficStats { sent: 6, dropped: 0, delivered: 6 });
        assert_eq!(sim.clock().now_us(), last);
    }

    #[test]
    fn deliveries_arrive_within_latency_and_jitter() {
        let mut sim = simulator(settings(1));
        let sent = sim.next_event().unwrap();
        let received = sim.next_event().unwrap();
        let delay = received.timestamp() - sent.timestamp();
        assert!((20_000..=25_000).contains(&delay));
        assert!(sim.next_event().is_none());
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let mut lossy = settings(50);
        lossy.loss_probability = 0.3;
        let a: Vec<SimEvent> = simulator(lossy.clone()).collect();
        let b: Vec<SimEvent> = simulator(lossy).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn compromised_sender_loses_its_packets() {
        let mut bank = MoteMemoryBank::new(4);
        bank.mote_mut(NodeId::new(2)).unwrap().define_flag("SHA_on", 1);
        write_node_byte(&mut bank, NodeId::new(2), "SHA_on", 0, ACTIVE_SENTINEL).unwrap();
        let mut sim = TrafficSimulator::new(settings(9), bank.into_shared());

        let parser = CoojaLogParser;
        let mut from_two = 0;
        for event in sim.by_ref() {
            if let SimEvent::Log { timestamp, origin, payload } = &event {
                if let MoteEvent::Received { sender: 2, .. } =
                    parser.classify(payload, *origin, *timestamp)
                {
                    from_two += 1;
                }
            }
        }
        assert_eq!(from_two, 0);
        assert_eq!(sim.stats().dropped, 3);
    }

    #[test]
    fn ticks_stop_with_the_traffic() {
        let mut ticking = settings(2);
        ticking.tick_interval_us = Some(400_000);
        let events: Vec<SimEvent> = simulator(ticking).collect();
        let last_log = events
            .iter()
            .filter(|e| e.payload().is_some())
            .map(SimEvent::timestamp)
            .max()
            .unwrap();
        let ticks: Vec<u64> = events
            .iter()
            .filter(|e| e.payload().is_none())
            .map(SimEvent::timestamp)
            .collect();
        assert_eq!(ticks.first(), Some(&400_000));
        assert!(ticks.iter().all(|t| *t <= last_log));
    }

    #[test]
    fn single_node_network_is_silent() {
        let mut lonely = settings(10);
        lonely.node_count = 1;
        lonely.server_id = 0;
        lonely.tick_interval_us = Some(1000);
        assert_eq!(simulator(lonely).count(), 0);
    }

    #[test]
    fn provisioning_defines_switch_and_program_symbols() {
        let attacks = vec![AttackConfig {
            symbol: "SYA_on".into(),
            target: 3,
            start_ms: 0,
            end_ms: 10,
            program: Some(motewatch_config::FaultProgramConfig {
                symbol: Some("fake_id".into()),
                steps: Vec::new(),
            }),
        }];
        let bank = provision_memory(4, &attacks, 1);
        use motewatch_core::memory::NodeMemory;
        let mote = bank.mote(NodeId::new(3)).unwrap();
        assert!(mote.lookup("SYA_on").is_some());
        assert!(mote.lookup("fake_id").is_some());
        assert!(bank.mote(NodeId::new(2)).unwrap().lookup("SYA_on").is_none());
    }
}
