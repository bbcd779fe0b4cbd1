//! # cnpjx Warehouse
//!
//! DuckDB-backed persistence for resolved registry lookups.
//!
//! The lookup core only needs a key-value view of the store: one row per
//! registry identifier holding the serialized profile and the moment it was
//! fetched. Everything is parameterized; identifiers never reach SQL text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cnpjx_warehouse::{CachedLookup, ProfileWarehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = ProfileWarehouse::open_default()?;
//!
//!     warehouse.upsert(&CachedLookup {
//!         registry_id: "11222333000181".to_string(),
//!         fetched_at: "2026-01-05T10:00:00Z".to_string(),
//!         payload: "{}".to_string(),
//!         source: Some("receitaws".to_string()),
//!     })?;
//!
//!     let cached = warehouse.get("11222333000181")?;
//!     assert!(cached.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `lookup_cache` | Latest resolved profile per registry identifier |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::ToSql;
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for cnpjx data.
    pub cnpjx_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let cnpjx_home = resolve_cnpjx_home();
        let db_path = cnpjx_home.join("cache").join("lookups.duckdb");
        Self {
            cnpjx_home,
            db_path,
            max_pool_size: 2,
        }
    }
}

impl WarehouseConfig {
    /// Configuration rooted at the default home but pointing at a specific file.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// One cached lookup row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLookup {
    /// Digits-only registry identifier (primary key).
    pub registry_id: String,
    /// Fetch timestamp exactly as it was written.
    pub fetched_at: String,
    /// Serialized profile.
    pub payload: String,
    /// Provider that produced the payload, if known.
    pub source: Option<String>,
}

/// Lookup cache stored in a `DuckDB` file.
#[derive(Clone)]
pub struct ProfileWarehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl ProfileWarehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration, creating parent
    /// directories and applying migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Configuration the warehouse was opened with.
    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Fetch the cached row for an identifier, if any.
    pub fn get(&self, registry_id: &str) -> Result<Option<CachedLookup>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT registry_id, fetched_at, payload, source FROM lookup_cache WHERE registry_id = ?",
        )?;
        let mut rows = statement.query_map([registry_id], |row| {
            Ok(CachedLookup {
                registry_id: row.get(0)?,
                fetched_at: row.get(1)?,
                payload: row.get(2)?,
                source: row.get(3)?,
            })
        })?;

        Ok(rows.next().transpose()?)
    }

    /// Insert or overwrite the row keyed by `row.registry_id`.
    pub fn upsert(&self, row: &CachedLookup) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 4] = [&row.registry_id, &row.fetched_at, &row.payload, &row.source];
        connection.execute(
            "INSERT OR REPLACE INTO lookup_cache (registry_id, fetched_at, payload, source) VALUES (?, ?, ?, ?)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Delete the row for an identifier. Returns whether a row existed.
    pub fn remove(&self, registry_id: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let removed = connection.execute(
            "DELETE FROM lookup_cache WHERE registry_id = ?",
            [registry_id],
        )?;
        Ok(removed > 0)
    }

    /// Number of cached rows, stale ones included.
    pub fn count(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM lookup_cache", [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn resolve_cnpjx_home() -> PathBuf {
    if let Some(path) = env::var_os("CNPJX_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".cnpjx");
    }

    PathBuf::from(".cnpjx")
}
