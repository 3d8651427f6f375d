use std::collections::VecDeque;

/// Queued notification with its emission sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<E> {
    pub seq: u64,
    pub payload: E,
}

/// FIFO of change notifications.
///
/// Renderers push notifications here instead of calling listeners inline, so
/// the owner decides when they are dispatched. Sequence numbers are global to
/// the bus and strictly increasing, also across `clear` calls.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: VecDeque<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            events: VecDeque::new(),
        }
    }

    pub fn emit(&mut self, payload: E) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.events.push_back(Event { seq, payload });
        seq
    }

    pub fn pop(&mut self) -> Option<Event<E>> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
