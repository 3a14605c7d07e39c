use std::collections::BTreeMap;

/// Explicit subscription table from input topics to handlers.
///
/// Enabling or disabling an interaction mode is a subscribe/unsubscribe on
/// this table, never a dynamic connection held somewhere else.
///
/// Ordering contract:
/// - Handlers of one topic are returned in subscription order.
/// - Subscribing an already-present handler does not move it.
#[derive(Debug, Clone)]
pub struct HandlerTable<T, H> {
    table: BTreeMap<T, Vec<H>>,
}

impl<T, H> Default for HandlerTable<T, H> {
    fn default() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }
}

impl<T: Ord + Copy, H: PartialEq + Copy> HandlerTable<T, H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the table changed.
    pub fn subscribe(&mut self, topic: T, handler: H) -> bool {
        let handlers = self.table.entry(topic).or_default();
        if handlers.contains(&handler) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Returns `true` if the table changed.
    pub fn unsubscribe(&mut self, topic: T, handler: H) -> bool {
        let Some(handlers) = self.table.get_mut(&topic) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| *h != handler);
        let changed = handlers.len() != before;
        if handlers.is_empty() {
            self.table.remove(&topic);
        }
        changed
    }

    pub fn handlers(&self, topic: T) -> &[H] {
        self.table.get(&topic).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_subscribed(&self, topic: T, handler: H) -> bool {
        self.handlers(topic).contains(&handler)
    }
}

#[cfg(test)]
mod tests {
    use super::HandlerTable;

    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
    enum Topic {
        Press,
        Wheel,
    }

    #[test]
    fn keeps_subscription_order_without_duplicates() {
        let mut t = HandlerTable::new();
        assert!(t.subscribe(Topic::Press, 'a'));
        assert!(t.subscribe(Topic::Press, 'b'));
        assert!(!t.subscribe(Topic::Press, 'a'));
        assert_eq!(t.handlers(Topic::Press), &['a', 'b']);
        assert!(t.handlers(Topic::Wheel).is_empty());
    }

    #[test]
    fn unsubscribe_reports_change() {
        let mut t = HandlerTable::new();
        t.subscribe(Topic::Wheel, 1u8);
        assert!(t.unsubscribe(Topic::Wheel, 1));
        assert!(!t.unsubscribe(Topic::Wheel, 1));
        assert!(!t.is_subscribed(Topic::Wheel, 1));
    }
}
