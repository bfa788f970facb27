use crate::core::record::NormalizedRecord;
use crate::core::table::{Table, Value};
use crate::core::warehouse::Warehouse;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Executor, Row, Statement};
use tracing::{debug, error};

/// A [`Warehouse`] backed by any database sqlx's `Any` driver can reach.
pub struct SqlWarehouse {
    pool: AnyPool,
}

impl SqlWarehouse {
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .with_context(|| format!("Failed to connect to database at {}", redact(url)))?;
        debug!("Connected to database at {}", redact(url));
        Ok(Self { pool })
    }

    /// Creates `table` with the record's columns if it does not exist yet.
    pub async fn create_table(&self, table: &str) -> Result<()> {
        let columns = NormalizedRecord::COLUMNS
            .iter()
            .map(|c| {
                let ty = if c.ends_with("_rate_float") {
                    "DOUBLE PRECISION"
                } else {
                    "TEXT"
                };
                format!("{c} {ty}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE IF NOT EXISTS {table} ({columns})");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create table {table}"))?;
        Ok(())
    }

    /// Result column names of `sql`, known even when it returns no rows. Empty when
    /// the driver cannot prepare the statement.
    async fn statement_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not prepare statement for column names");
                Vec::new()
            }
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Builds a single multi-row INSERT with literal values. Column names come from
/// the input and are not checked against the table.
fn build_insert(table: &str, rows: &Table) -> Result<String> {
    if rows.columns.is_empty() {
        bail!("Cannot insert rows without columns");
    }
    let values = rows
        .rows
        .iter()
        .map(|row| {
            let literals: Vec<String> = row.iter().map(Value::to_sql_literal).collect();
            format!("({})", literals.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "INSERT INTO {}({}) VALUES {}",
        table,
        rows.columns.join(","),
        values
    ))
}

fn decode_value(row: &AnyRow, index: usize) -> Result<Value> {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Text));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Real));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return Ok(v.map_or(Value::Null, |f| Value::Real(f64::from(f))));
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Integer));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return Ok(v.map_or(Value::Null, |i| Value::Integer(i64::from(i))));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return Ok(v.map_or(Value::Null, |b| Value::Integer(i64::from(b))));
    }
    Err(anyhow!(
        "Unsupported type for column {}",
        row.column(index).name()
    ))
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl Warehouse for SqlWarehouse {
    async fn insert_rows(&self, table: &str, rows: &Table) -> Result<u64> {
        let sql = build_insert(table, rows)?;
        debug!(query = %sql, "Inserting rows");

        let mut tx = self.pool.begin().await?;
        match sqlx::query(&sql).execute(&mut *tx).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                Err(anyhow!(e).context(format!("Failed to insert rows into {table}")))
            }
        }
    }

    async fn fetch_all(&self, table: &str, order_by: &str) -> Result<Table> {
        let sql = format!("SELECT * FROM {table} ORDER BY {order_by}");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read table {table}"))?;

        let mut columns = self.statement_columns(&sql).await;
        if columns.is_empty() {
            columns = rows
                .first()
                .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_default();
        }
        let mut result = Table::new(columns);
        for row in &rows {
            let values = (0..row.columns().len())
                .map(|i| decode_value(row, i))
                .collect::<Result<Vec<_>>>()?;
            result.push_row(values)?;
        }
        Ok(result)
    }
}
