//! Import coordination: drains a [`PortStream`] into fixed-size bulk upserts.
//!
//! Termination policy, whichever comes first:
//! - stream exhausted: flush the partial batch, report completion
//! - parse error: flush the partial batch, return the parse error
//! - cancellation: flush the partial batch, report cancellation
//! - repository failure: return it immediately
//!
//! Every received port takes part in exactly one flush attempt.

use crate::error::PortError;
use crate::import::batch::{FlushReason, PortBatch};
use crate::import::parser::PortStream;
use crate::import::stats::{ImportOutcome, ImportStats};
use crate::repository::PortRepository;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Batches decoded ports into a [`PortRepository`].
pub struct ImportCoordinator {
    repository: Arc<dyn PortRepository>,
    batch_size: usize,
}

impl ImportCoordinator {
    pub fn new(repository: Arc<dyn PortRepository>, batch_size: usize) -> Self {
        Self {
            repository,
            batch_size: batch_size.max(1),
        }
    }

    /// Drain `stream` until it ends, fails, or `cancel` fires.
    ///
    /// Returns as soon as cancellation is observed, without waiting for the
    /// parser; dropping the stream releases it.
    pub async fn run(
        &self,
        mut stream: PortStream,
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, PortError> {
        let mut batch = PortBatch::new(self.batch_size);
        let mut stats = ImportStats::default();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::info!("import cancelled with {} ports pending", batch.len());
                    self.flush(&mut batch, FlushReason::Cancelled, &mut stats).await?;
                    return Ok(ImportOutcome::Cancelled(stats));
                }
                next = stream.next() => match next {
                    Some(Ok(port)) => {
                        if batch.append(port) {
                            self.flush(&mut batch, FlushReason::Full, &mut stats).await?;
                        }
                    }
                    Some(Err(parse)) => {
                        log::warn!("import input rejected with {} ports pending: {}", batch.len(), parse);
                        if let Err(save) = self.flush(&mut batch, FlushReason::ParseError, &mut stats).await {
                            return Err(PortError::SaveAfterParse {
                                save: Box::new(save),
                                parse: Box::new(parse),
                            });
                        }
                        return Err(parse);
                    }
                    None => {
                        self.flush(&mut batch, FlushReason::EndOfInput, &mut stats).await?;
                        return Ok(ImportOutcome::Completed(stats));
                    }
                },
            }
        }
    }

    async fn flush(
        &self,
        batch: &mut PortBatch,
        reason: FlushReason,
        stats: &mut ImportStats,
    ) -> Result<(), PortError> {
        let Some(ports) = batch.flush(reason) else {
            return Ok(());
        };

        log::debug!("saving batch of {} ports ({})", ports.len(), reason);
        if let Err(err) = self.repository.save_bulk(&ports).await {
            log::error!("failed to save batch of {} ports: {}", ports.len(), err);
            return Err(err);
        }

        stats.record_batch(ports.len());
        Ok(())
    }
}
