use std::collections::VecDeque;

/// Typed event queue the host drains once per frame.
///
/// Producers `emit` in the order things actually happened; `drain` hands the
/// batch over in that same order, so observers see merges strictly after the
/// mutation that produced them.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    queue: VecDeque<E>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn emit(&mut self, event: E) {
        self.queue.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<E> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_emission_order() {
        let mut q = EventQueue::new();
        q.emit("first");
        q.emit("second");
        q.emit("third");
        assert_eq!(q.len(), 3);
        assert_eq!(q.drain(), vec!["first", "second", "third"]);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_yields_nothing() {
        let mut q: EventQueue<u32> = EventQueue::new();
        assert!(q.drain().is_empty());
    }
}
