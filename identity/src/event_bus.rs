//! Delivery of committed change events to observers.

use veil_types::ChangeEvent;

type Listener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the committing thread; keep handlers
/// fast. Only events of committed transactions ever reach the bus.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &ChangeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn emit_all(&self, events: &[ChangeEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use veil_types::{Identity, SubjectRef};

    fn revoked() -> ChangeEvent {
        ChangeEvent::Revoked {
            subject: SubjectRef::OwnedIdentity(Identity::new([1; 32])),
        }
    }

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit_all(&[revoked(), revoked()]);
        assert_eq!(counter.load(Ordering::SeqCst), 22);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        EventBus::new().emit(&revoked());
    }
}
