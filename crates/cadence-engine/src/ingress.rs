//! Inbound session-event queue.
//!
//! Transport callbacks run on whatever thread the transport owns;
//! [`EventSender`] hands their events across a bounded channel to the
//! simulation thread, which drains them at the top of each update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

use cadence_core::SessionEvent;

/// Cloneable producer handle for transport threads.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<SessionEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSender {
    /// Enqueue an event without blocking.
    ///
    /// Returns `false` when the queue is full or the simulator is gone;
    /// the event is dropped and counted either way. Frame data lost
    /// here is recovered through the miss-frame protocol, so dropping
    /// is safe, just slow.
    pub fn send(&self, event: SessionEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("session event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Consumer side, owned by the simulator.
pub struct EventQueue {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventQueue {
    /// A bounded queue with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A new producer handle.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Take everything currently queued, without blocking.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.rx.try_iter().collect()
    }

    /// Total events dropped because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Roster, Tick};
    use cadence_test_utils::empty_frame;

    #[test]
    fn drain_preserves_arrival_order() {
        let queue = EventQueue::new(8);
        let sender = queue.sender();
        assert!(sender.send(SessionEvent::ServerFrames(vec![empty_frame(0, 2)])));
        assert!(sender.send(SessionEvent::AllPlayersReady));

        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::ServerFrames(_)));
        assert!(matches!(events[1], SessionEvent::AllPlayersReady));
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let queue = EventQueue::new(1);
        let sender = queue.sender();
        assert!(sender.send(SessionEvent::AllPlayersReady));
        assert!(!sender.send(SessionEvent::AllPlayersReady));
        assert_eq!(queue.dropped_events(), 1);
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn senders_are_cloneable_across_threads() {
        let queue = EventQueue::new(16);
        let sender = queue.sender();
        let handle = std::thread::spawn(move || {
            sender.send(SessionEvent::PeerHashes {
                peer: cadence_core::ActorId(1),
                first_tick: Tick(0),
                hashes: vec![1, 2, 3],
            })
        });
        assert!(handle.join().unwrap());
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn game_start_round_trips_roster() {
        let queue = EventQueue::new(4);
        let roster = Roster {
            actor_count: 2,
            local_actor: cadence_core::ActorId(0),
            players: Vec::new(),
        };
        queue.sender().send(SessionEvent::GameStart(roster.clone()));
        match queue.drain().pop() {
            Some(SessionEvent::GameStart(r)) => assert_eq!(r.actor_count, 2),
            other => panic!("expected GameStart, got {other:?}"),
        }
    }
}
