use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

use super::{Event, EventListener, StateRef};
use crate::clock::GameClock;
use crate::ids::IdAllocator;
use crate::properties::Properties;
use crate::sink::EventSink;

/// Builds events and fans them out to listeners and the transport sink.
///
/// Publishing is two-step: `stage` assigns the id and queues the event
/// (callers holding the container index lock stage while still inside it),
/// then `flush` delivers everything queued, in id order, after the lock is
/// released. Delivery is serialised by a reentrant lock so a listener may
/// itself mutate the game. A flush nested inside delivery only enqueues:
/// the outermost flush delivers the nested events after the current one,
/// so every listener sees every event in id order.
///
/// Events relayed from the transport skip the sink and carry their own ids.
pub struct EventBus {
    ids: Arc<IdAllocator>,
    clock: GameClock,
    sink: Arc<dyn EventSink>,
    /// Registration order is delivery order
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    outbox: Mutex<VecDeque<Queued>>,
    /// Set while the owning thread is inside the delivery loop
    delivery: ReentrantMutex<Cell<bool>>,
}

enum Queued {
    Local(Event),
    Relayed(Event),
}

impl EventBus {
    pub fn new(ids: Arc<IdAllocator>, clock: GameClock, sink: Arc<dyn EventSink>) -> Self {
        Self {
            ids,
            clock,
            sink,
            listeners: RwLock::new(Vec::new()),
            outbox: Mutex::new(VecDeque::new()),
            delivery: ReentrantMutex::new(Cell::new(false)),
        }
    }

    /// Begin forwarding events to `listener`. Returns false if it was already registered.
    pub fn register(&self, listener: Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Stop forwarding events to `listener`. Returns false if it was not registered.
    pub fn deregister(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn game_time(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Create and deliver an event.
    pub fn publish(
        &self,
        kind: &str,
        properties: Properties,
        updated_state: impl IntoIterator<Item = StateRef>,
    ) -> Event {
        let event = self.stage(kind, properties, updated_state);
        self.flush();
        event
    }

    /// Create an event and queue it for the next `flush`.
    pub(crate) fn stage(
        &self,
        kind: &str,
        properties: Properties,
        updated_state: impl IntoIterator<Item = StateRef>,
    ) -> Event {
        let mut outbox = self.outbox.lock();
        // Id assigned under the outbox lock, so queue order is id order
        let event = Event::new(
            self.ids.next_event_id(),
            kind,
            self.clock.elapsed_ms(),
            properties,
            updated_state,
        );
        outbox.push_back(Queued::Local(event.clone()));
        event
    }

    /// Hand an event that originated elsewhere to local listeners only.
    pub fn relay(&self, event: Event) {
        self.outbox.lock().push_back(Queued::Relayed(event));
        self.flush();
    }

    /// Deliver every queued event.
    ///
    /// Called from outside delivery, returns once the caller's own staged
    /// events have reached every listener. Called from a listener, returns
    /// at once and leaves the events to the delivery already running.
    pub(crate) fn flush(&self) {
        let delivering = self.delivery.lock();
        if delivering.replace(true) {
            return;
        }
        loop {
            let next = self.outbox.lock().pop_front();
            match next {
                Some(Queued::Local(event)) => self.deliver(&event, true),
                Some(Queued::Relayed(event)) => self.deliver(&event, false),
                None => break,
            }
        }
        delivering.set(false);
    }

    fn deliver(&self, event: &Event, to_sink: bool) {
        if to_sink {
            isolate(event, "sink", || self.sink.publish_event(event));
        }

        // Snapshot so listeners can (de)register during delivery
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            isolate(event, "listener", || listener.accept_event(event));
        }
    }
}

fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn isolate(event: &Event, target: &'static str, deliver: impl FnOnce() -> anyhow::Result<()>) {
    match panic::catch_unwind(AssertUnwindSafe(deliver)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(
                event_id = event.id(),
                event_type = %event.kind(),
                target,
                error = %e,
                "Event delivery failed"
            );
        }
        Err(_) => {
            warn!(
                event_id = event.id(),
                event_type = %event.kind(),
                target,
                "Event handler panicked"
            );
        }
    }
}
