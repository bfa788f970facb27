//! Relational sink abstractions

use super::table::Table;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Inserts every row of `rows` into `table` in one statement, atomically.
    /// Returns the number of rows written.
    async fn insert_rows(&self, table: &str, rows: &Table) -> Result<u64>;

    /// Reads the whole table ordered by `order_by`.
    async fn fetch_all(&self, table: &str, order_by: &str) -> Result<Table>;
}
