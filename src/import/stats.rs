//! Import statistics tracking.

use std::fmt;

/// Counts of what an import persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Ports handed to the repository in successful bulk upserts.
    pub ports: usize,
    /// Successful bulk upsert calls.
    pub batches: usize,
}

impl ImportStats {
    pub fn record_batch(&mut self, size: usize) {
        self.ports += size;
        self.batches += 1;
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ports in {} batches", self.ports, self.batches)
    }
}

/// How an import ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The whole document was persisted.
    Completed(ImportStats),
    /// Cancellation interrupted the import; everything decoded before it was
    /// persisted.
    Cancelled(ImportStats),
}

impl ImportOutcome {
    pub fn stats(&self) -> ImportStats {
        match self {
            ImportOutcome::Completed(stats) | ImportOutcome::Cancelled(stats) => *stats,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportOutcome::Cancelled(_))
    }
}
