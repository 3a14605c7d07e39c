/// An event stamped with its position in the emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<E> {
    pub seq: u64,
    pub event: E,
}

/// Ordered outbound event queue.
///
/// Producers push while handling one input; the host drains between inputs.
/// Sequence numbers keep increasing across drains so consumers can detect
/// ordering without wall-clock time.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Envelope<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: E) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Envelope { seq, event });
        seq
    }

    pub fn events(&self) -> &[Envelope<E>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Envelope<E>> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;

    #[test]
    fn records_events_in_order() {
        let mut bus = EventBus::new();
        bus.emit("a");
        bus.emit("b");
        let seqs: Vec<u64> = bus.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(bus.events()[1].event, "b");
    }

    #[test]
    fn drain_clears_but_sequence_continues() {
        let mut bus = EventBus::new();
        bus.emit(1u8);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.is_empty());
        assert_eq!(bus.emit(2u8), 1);
    }
}
