use super::workspace::Workspace;
use crate::core::record::RUN_TIMESTAMP_COLUMN;
use crate::core::table::Table;
use crate::core::warehouse::Warehouse;
use anyhow::Result;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub rows_inserted: u64,
    /// Set when the insert was rolled back; the stage still succeeds.
    pub insert_error: Option<String>,
    /// Full table contents read back after the insert attempt.
    pub loaded: Table,
}

/// Inserts `rows` into `table`, then reads the whole table back and writes it to
/// `3_loaded_data.csv`. An insert failure is logged and reported, not returned.
/// The read-back runs regardless and does not check that the insert landed.
pub async fn load(
    warehouse: &dyn Warehouse,
    table: &str,
    rows: &Table,
    workspace: &Workspace,
) -> Result<LoadReport> {
    info!("Loading {} row(s) into {}", rows.len(), table);

    let (rows_inserted, insert_error) = match warehouse.insert_rows(table, rows).await {
        Ok(n) => (n, None),
        Err(e) => {
            error!("Error: {:#}", e);
            (0, Some(format!("{e:#}")))
        }
    };

    let loaded = warehouse.fetch_all(table, RUN_TIMESTAMP_COLUMN).await?;
    workspace.write_loaded(&loaded)?;
    info!("Table {} now holds {} row(s)", table, loaded.len());

    Ok(LoadReport {
        rows_inserted,
        insert_error,
        loaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Value;
    use crate::pipeline::workspace::LOADED_DATA_FILE;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Accepts rows only when their columns match `schema`.
    struct MemoryWarehouse {
        schema: Vec<String>,
        rows: Mutex<Vec<Vec<Value>>>,
    }

    impl MemoryWarehouse {
        fn new(schema: &[&str]) -> Self {
            Self {
                schema: schema.iter().map(|c| c.to_string()).collect(),
                rows: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Warehouse for MemoryWarehouse {
        async fn insert_rows(&self, _table: &str, rows: &Table) -> Result<u64> {
            if rows.columns != self.schema {
                return Err(anyhow!("column mismatch"));
            }
            let mut stored = self.rows.lock().unwrap();
            stored.extend(rows.rows.iter().cloned());
            Ok(rows.len() as u64)
        }

        async fn fetch_all(&self, _table: &str, _order_by: &str) -> Result<Table> {
            Ok(Table {
                columns: self.schema.clone(),
                rows: self.rows.lock().unwrap().clone(),
            })
        }
    }

    fn single_row(columns: &[&str]) -> Table {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        table
            .push_row(columns.iter().map(|c| Value::from(*c)).collect())
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_successful_load_reports_rows() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());
        let warehouse = MemoryWarehouse::new(&["chart_name", "last_update"]);

        let report = load(
            &warehouse,
            "bpi",
            &single_row(&["chart_name", "last_update"]),
            &workspace,
        )
        .await
        .unwrap();

        assert_eq!(report.rows_inserted, 1);
        assert!(report.insert_error.is_none());
        assert_eq!(report.loaded.len(), 1);
        assert!(workspace.path(LOADED_DATA_FILE).exists());
    }

    #[tokio::test]
    async fn test_insert_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path());
        let warehouse = MemoryWarehouse::new(&["chart_name", "last_update"]);

        let report = load(&warehouse, "bpi", &single_row(&["bogus"]), &workspace)
            .await
            .unwrap();

        assert_eq!(report.rows_inserted, 0);
        assert_eq!(report.insert_error.as_deref(), Some("column mismatch"));
        assert!(report.loaded.is_empty());
        assert!(workspace.path(LOADED_DATA_FILE).exists());
    }
}
