//! Application service shared by the HTTP routes and the CLI.

use crate::config::ImportConfig;
use crate::error::PortError;
use crate::import::{ImportCoordinator, ImportOutcome, JsonPortParser};
use crate::models::Port;
use crate::repository::PortRepository;
use std::io::Read;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point for creating, looking up and importing ports.
#[derive(Clone)]
pub struct PortService {
    repository: Arc<dyn PortRepository>,
    import_config: ImportConfig,
}

impl PortService {
    pub fn new(repository: Arc<dyn PortRepository>, import_config: ImportConfig) -> Self {
        Self {
            repository,
            import_config,
        }
    }

    /// Store a single port under its derived id (first unloc, upper-cased),
    /// replacing any existing port with that id.
    pub async fn create_or_update(&self, port: Port) -> Result<Port, PortError> {
        let port = port.with_unloc_id()?;
        self.repository
            .save_bulk(std::slice::from_ref(&port))
            .await?;
        Ok(port)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Port, PortError> {
        self.repository.find_by_id(id).await.inspect_err(|err| {
            if !matches!(err, PortError::NotFound) {
                log::error!("failed to load port '{}': {}", id, err);
            }
        })
    }

    /// Stream a port document from `reader` into the repository.
    ///
    /// `cancel` interrupts the import: ports decoded so far are saved and
    /// [`ImportOutcome::Cancelled`] is returned.
    pub async fn import_ports<R>(
        &self,
        reader: R,
        cancel: CancellationToken,
    ) -> Result<ImportOutcome, PortError>
    where
        R: Read + Send + 'static,
    {
        log::info!(
            "starting port import (batch size {})",
            self.import_config.batch_size
        );

        let stream = JsonPortParser::new(reader).parse(cancel.clone());
        let outcome = ImportCoordinator::new(self.repository.clone(), self.import_config.batch_size)
            .run(stream, &cancel)
            .await?;

        match &outcome {
            ImportOutcome::Completed(stats) => log::info!("port import completed: {}", stats),
            ImportOutcome::Cancelled(stats) => {
                log::info!("port import cancelled after saving {}", stats)
            }
        }
        Ok(outcome)
    }
}
