//! [`Database`]: the entry point that owns the gateway connection and
//! hands out [`BaseTable`][crate::view::base_table] views (§3, §6).

use std::rc::Rc;

use rsql_core::schema::Table;
use rsql_core::{Result, Value};
use rsql_gateway::{GatewayConfig, GatewayRow, StoreGateway};

use crate::view::{base_table, ViewRef};

/// Owns the `StoreGateway` connection a set of `BaseTable` views and
/// their descendants all share.
pub struct Database {
    gateway: Rc<StoreGateway>,
}

impl Database {
    /// In-memory database, trigger-based capture (§1.1's default
    /// `GatewayConfig`).
    pub fn open_in_memory() -> Result<Self> {
        Self::with_config(GatewayConfig::in_memory())
    }

    /// On-disk database at `path`, WAL journaling (§1.1's default
    /// on-disk `GatewayConfig`).
    pub fn open(path: &str) -> Result<Self> {
        Self::with_config_at(path, GatewayConfig::on_disk())
    }

    /// In-memory database with a caller-chosen configuration (e.g. a
    /// `Synthesis` capture strategy instead of the trigger-based
    /// default).
    pub fn with_config(config: GatewayConfig) -> Result<Self> {
        Ok(Self { gateway: Rc::new(StoreGateway::open_in_memory(config)?) })
    }

    /// On-disk database at `path` with a caller-chosen configuration.
    pub fn with_config_at(path: &str, config: GatewayConfig) -> Result<Self> {
        Ok(Self { gateway: Rc::new(StoreGateway::open(path, config)?) })
    }

    /// Registers `table` and returns its `BaseTable` view (§3).
    pub fn table(&self, table: Table) -> Result<ViewRef> {
        base_table::open(&self.gateway, table)
    }

    /// Like [`Self::table`], but the table is created with SQLite's
    /// `CREATE TEMP TABLE` and dropped when the connection closes
    /// (§1.2, supplemented from the original's `Database.temp_table`).
    pub fn temp_table(&self, mut table: Table) -> Result<ViewRef> {
        table.set_temporary(true);
        base_table::open(&self.gateway, table)
    }

    /// Runs an arbitrary mutation statement directly against the
    /// underlying connection, bypassing the view layer entirely.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        self.gateway.execute(sql, params)
    }

    /// Runs an arbitrary read query directly against the underlying
    /// connection, bypassing the view layer entirely.
    pub fn fetchall(&self, sql: &str, params: &[Value]) -> Result<Vec<GatewayRow>> {
        self.gateway.fetchall(sql, params)
    }

    /// Like [`Self::fetchall`], but returns only the first matching row.
    pub fn fetchone(&self, sql: &str, params: &[Value]) -> Result<Option<GatewayRow>> {
        self.gateway.fetchone(sql, params)
    }
}
