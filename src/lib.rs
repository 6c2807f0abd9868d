#[macro_use]
extern crate rocket;

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod repository;
pub mod request_logger;
pub mod routes;
pub mod service;
pub mod shutdown;

use crate::config::{DatabaseConfig, ImportConfig, ServerConfig};
use crate::repository::PostgresPortRepository;
use crate::request_logger::RequestLogger;
use crate::service::PortService;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let server = ServerConfig::from_env();
    let figment = rocket::Config::figment()
        .merge(("address", server.address))
        .merge(("port", server.port));

    rocket::custom(figment)
        .attach(RequestLogger)
        // Connect, migrate, and hand the repository to the port service
        .attach(AdHoc::try_on_ignite(
            "Port Service",
            |rocket| async move {
                let database = DatabaseConfig::from_env();
                let pool = match db::connect(&database).await {
                    Ok(pool) => pool,
                    Err(e) => {
                        log::error!("database connection failed: {}", e);
                        return Err(rocket);
                    }
                };

                if let Err(e) = db::run_migrations(&pool).await {
                    log::error!("database migrations failed: {}", e);
                    return Err(rocket);
                }

                let repository = Arc::new(PostgresPortRepository::new(pool));
                Ok(rocket.manage(PortService::new(repository, ImportConfig::from_env())))
            },
        ))
        .mount(
            "/api/v1",
            openapi_get_routes![
                routes::health::health_check,
                routes::ports::create_port,
                routes::ports::get_port,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::error::PortError;
    use crate::models::Port;
    use crate::repository::{PortRepository, dedup_last_wins};
    use crate::config::{DEFAULT_BATCH_SIZE, ImportConfig};
    use crate::service::PortService;
    use parking_lot::Mutex;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    pub use database::{TestDatabase, TestDatabaseError};

    #[derive(Default)]
    struct InMemoryState {
        ports: BTreeMap<String, Port>,
        flushes: Vec<Vec<Port>>,
        attempts: usize,
        fail_from: Option<usize>,
    }

    /// Repository double that records every successful bulk upsert.
    #[derive(Default)]
    pub struct InMemoryPortRepository {
        state: Mutex<InMemoryState>,
    }

    impl InMemoryPortRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the `call`-th `save_bulk` (1-based) and every call after it.
        pub fn failing_from(call: usize) -> Self {
            let repository = Self::default();
            repository.state.lock().fail_from = Some(call);
            repository
        }

        /// Ids of each successfully saved batch, in call order.
        pub fn flushed_ids(&self) -> Vec<Vec<String>> {
            self.state
                .lock()
                .flushes
                .iter()
                .map(|batch| batch.iter().filter_map(|port| port.id.clone()).collect())
                .collect()
        }

        pub fn flush_sizes(&self) -> Vec<usize> {
            self.state.lock().flushes.iter().map(Vec::len).collect()
        }

        /// Number of `save_bulk` calls, failed ones included.
        pub fn attempts(&self) -> usize {
            self.state.lock().attempts
        }

        /// Current stored ports keyed by id.
        pub fn snapshot(&self) -> BTreeMap<String, Port> {
            self.state.lock().ports.clone()
        }
    }

    #[rocket::async_trait]
    impl PortRepository for InMemoryPortRepository {
        async fn save_bulk(&self, ports: &[Port]) -> Result<(), PortError> {
            let mut state = self.state.lock();
            state.attempts += 1;

            if state.fail_from.is_some_and(|call| state.attempts >= call) {
                return Err(PortError::Repository(sqlx::Error::Protocol(
                    "injected repository failure".to_string(),
                )));
            }

            for port in dedup_last_wins(ports)? {
                if let Some(id) = &port.id {
                    state.ports.insert(id.clone(), port.clone());
                }
            }
            state.flushes.push(ports.to_vec());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Port, PortError> {
            let wanted = id.to_lowercase();
            self.state
                .lock()
                .ports
                .values()
                .find(|port| {
                    port.id
                        .as_deref()
                        .is_some_and(|candidate| candidate.to_lowercase() == wanted)
                })
                .cloned()
                .ok_or(PortError::NotFound)
        }
    }

    pub mod database {
        use crate::db;
        use sqlx::PgPool;
        use sqlx::postgres::PgPoolOptions;
        use testcontainers::ImageExt;
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Disposable, migrated PostgreSQL for integration tests.
        pub struct TestDatabase {
            pool: PgPool,
            container: ContainerAsync<Postgres>,
        }

        impl TestDatabase {
            /// Launch a Postgres container and apply migrations.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().with_tag("16-alpine").start().await?;

                let host = container.get_host().await?;
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await?;

                db::run_migrations(&pool).await?;

                Ok(Self { pool, container })
            }

            pub fn pool(&self) -> &PgPool {
                &self.pool
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool.clone()
            }

            /// Close the pool, then stop and remove the container.
            pub async fn close(self) -> Result<(), TestDatabaseError> {
                self.pool.close().await;
                self.container.rm().await?;
                Ok(())
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        service: Option<PortService>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                service: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        pub fn manage_port_service(mut self, service: PortService) -> Self {
            self.service = Some(service);
            self
        }

        /// Manage a [`PortService`] over `repository` with the default batch size.
        pub fn manage_repository(self, repository: Arc<dyn PortRepository>) -> Self {
            self.manage_port_service(PortService::new(
                repository,
                ImportConfig::with_batch_size(DEFAULT_BATCH_SIZE),
            ))
        }

        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(service) = self.service {
                rocket = rocket.manage(service);
            }

            rocket
        }

        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }
    }
}
