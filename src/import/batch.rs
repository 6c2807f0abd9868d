//! Fixed-size accumulation of decoded ports.

use crate::models::Port;
use std::fmt;

/// Why a batch is being handed to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The batch reached its capacity.
    Full,
    /// The parser finished without error.
    EndOfInput,
    /// The parser reported malformed input.
    ParseError,
    /// The import was cancelled.
    Cancelled,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FlushReason::Full => "full",
            FlushReason::EndOfInput => "end of input",
            FlushReason::ParseError => "parse error",
            FlushReason::Cancelled => "cancelled",
        };
        f.write_str(reason)
    }
}

/// Ordered accumulator of at most `capacity` ports.
#[derive(Debug)]
pub struct PortBatch {
    capacity: usize,
    ports: Vec<Port>,
}

impl PortBatch {
    /// Storage grows with the ports appended, not with `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ports: Vec::new(),
        }
    }

    /// Append a port and report whether the batch is now full.
    pub fn append(&mut self, port: Port) -> bool {
        debug_assert!(!self.is_full(), "append to a full batch");
        self.ports.push(port);
        self.is_full()
    }

    /// Take the accumulated ports, leaving an empty batch behind. Returns
    /// `None` when there is nothing to flush.
    pub fn flush(&mut self, reason: FlushReason) -> Option<Vec<Port>> {
        if self.ports.is_empty() {
            return None;
        }

        log::trace!("taking {} ports from batch ({})", self.ports.len(), reason);
        Some(std::mem::take(&mut self.ports))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ports.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(id: &str) -> Port {
        Port {
            id: Some(id.to_string()),
            ..Port::default()
        }
    }

    #[test]
    fn reports_full_at_capacity() {
        let mut batch = PortBatch::new(3);
        assert!(!batch.append(port("A")));
        assert!(!batch.append(port("B")));
        assert!(batch.append(port("C")));
        assert!(batch.is_full());
    }

    #[test]
    fn flush_takes_ports_in_order_and_resets() {
        let mut batch = PortBatch::new(2);
        batch.append(port("A"));
        batch.append(port("B"));

        let flushed = batch.flush(FlushReason::Full).expect("two ports");
        let ids: Vec<_> = flushed.iter().filter_map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(batch.is_empty());
        assert!(!batch.is_full());
    }

    #[test]
    fn flushing_an_empty_batch_yields_nothing() {
        let mut batch = PortBatch::new(5);
        assert!(batch.flush(FlushReason::EndOfInput).is_none());
        assert!(batch.flush(FlushReason::Cancelled).is_none());
    }

    #[test]
    fn partial_batch_flushes_for_any_terminal_reason() {
        for reason in [
            FlushReason::EndOfInput,
            FlushReason::ParseError,
            FlushReason::Cancelled,
        ] {
            let mut batch = PortBatch::new(200);
            batch.append(port("A"));
            assert_eq!(batch.flush(reason).map(|ports| ports.len()), Some(1));
        }
    }

    #[test]
    fn huge_capacity_allocates_lazily() {
        let mut batch = PortBatch::new(usize::MAX / 2);
        assert_eq!(batch.capacity(), usize::MAX / 2);
        assert!(!batch.append(port("A")));
        assert_eq!(batch.flush(FlushReason::EndOfInput).map(|ports| ports.len()), Some(1));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut batch = PortBatch::new(0);
        assert_eq!(batch.capacity(), 1);
        assert!(batch.append(port("A")));
    }
}
