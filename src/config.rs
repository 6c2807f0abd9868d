//! Environment-driven configuration for the database, the importer and the
//! HTTP server.
//!
//! Every struct exposes `from_env()` and a `Default` that delegates to it, so
//! binaries load configuration once and pass the values down explicitly.

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::env;
use std::str::FromStr;

/// Number of ports persisted per bulk upsert when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Largest accepted batch size; larger requests are clamped.
pub const MAX_BATCH_SIZE: usize = 10_000;

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string("DB_HOST", "localhost"),
            port: env_u16("DB_PORT", 5432),
            user: env_string("DB_USER", "postgres"),
            password: env_string("DB_PASSWORD", "postgres"),
            name: env_string("DB_NAME", "ports"),
            ssl_mode: env_string("DB_SSL_MODE", "prefer"),
            max_connections: env_u32("DB_MAX_CONNECTIONS", 10).max(1),
        }
    }

    /// Unknown SSL modes fall back to `prefer`.
    pub fn ssl_mode(&self) -> PgSslMode {
        PgSslMode::from_str(&self.ssl_mode).unwrap_or_else(|_| {
            log::warn!(
                "unsupported DB_SSL_MODE '{}', falling back to 'prefer'",
                self.ssl_mode
            );
            PgSslMode::Prefer
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(self.ssl_mode())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Settings for the streaming JSON import.
#[derive(Debug, Clone, Copy)]
pub struct ImportConfig {
    /// Ports accumulated before a bulk upsert, within `1..=MAX_BATCH_SIZE`.
    pub batch_size: usize,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self::with_batch_size(env_usize("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE))
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        if batch_size > MAX_BATCH_SIZE {
            log::warn!(
                "batch size {} exceeds the maximum, using {}",
                batch_size,
                MAX_BATCH_SIZE
            );
        }

        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Bind address for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            address: env_string("SERVER_ADDRESS", "0.0.0.0"),
            port: env_u16("SERVER_PORT", 8080),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
