use std::sync::atomic::{AtomicU64, Ordering};

use crate::entity::EntityId;
use crate::event::EventId;

/// Issues entity and event ids for one game instance.
///
/// Both counters use fetch-and-increment, so concurrent callers never
/// observe the same value.
#[derive(Debug)]
pub struct IdAllocator {
    next_entity: AtomicU64,
    next_event: AtomicU64,
}

impl IdAllocator {
    /// Seed the entity counter one past the largest persisted id.
    pub fn new(max_persisted_entity_id: EntityId) -> Self {
        Self {
            next_entity: AtomicU64::new(max_persisted_entity_id.saturating_add(1)),
            next_event: AtomicU64::new(1),
        }
    }

    pub fn next_entity_id(&self) -> EntityId {
        self.next_entity.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_event_id(&self) -> EventId {
        self.next_event.fetch_add(1, Ordering::SeqCst)
    }

    /// Next entity id that would be minted, without consuming it.
    pub fn peek_entity_id(&self) -> EntityId {
        self.next_entity.load(Ordering::SeqCst)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn entity_counter_starts_after_persisted_max() {
        let ids = IdAllocator::new(41);
        assert_eq!(ids.next_entity_id(), 42);
        assert_eq!(ids.next_entity_id(), 43);
        assert_eq!(ids.peek_entity_id(), 44);
    }

    #[test]
    fn event_counter_starts_at_one() {
        let ids = IdAllocator::new(100);
        assert_eq!(ids.next_event_id(), 1);
        assert_eq!(ids.next_event_id(), 2);
    }

    #[test]
    fn concurrent_callers_never_share_an_id() {
        let ids = Arc::new(IdAllocator::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..500).map(|_| ids.next_entity_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let issued = handle.join().unwrap();
            // Each thread observes its own values in increasing order
            assert!(issued.windows(2).all(|w| w[0] < w[1]));
            for id in issued {
                assert!(seen.insert(id), "id {} issued twice", id);
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
