//! Streaming port import.
//!
//! A parser and a coordinator run concurrently, connected by a single-slot
//! channel:
//!
//! 1. **Parsing** (`parser`) - decodes the document incrementally on the
//!    blocking pool and yields `Result<Port, PortError>` items, ending after
//!    the first error
//! 2. **Coordination** (`coordinator`) - accumulates ports into fixed-size
//!    batches (`batch`) and bulk-upserts each one through a `PortRepository`
//! 3. **Statistics** (`stats`) - counts what was persisted and how the import
//!    ended
//!
//! Records reach the repository in document order, and batch N is saved
//! before any port of batch N+1 is accepted. Cancellation flushes the partial
//! batch and returns without draining the rest of the input.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use ports_service::import::{ImportCoordinator, JsonPortParser};
//!
//! let cancel = CancellationToken::new();
//! let stream = JsonPortParser::new(File::open("ports.json")?).parse(cancel.clone());
//! let outcome = ImportCoordinator::new(repository, 200).run(stream, &cancel).await?;
//!
//! println!("Imported {}", outcome.stats());
//! ```

pub mod batch;
pub mod coordinator;
pub mod parser;
pub mod stats;

pub use batch::{FlushReason, PortBatch};
pub use coordinator::ImportCoordinator;
pub use parser::{JsonPortParser, ParsedPort, PortStream};
pub use stats::{ImportOutcome, ImportStats};
