//! Scratch directory holding the artifacts exchanged between stages

use crate::core::record::NormalizedRecord;
use crate::core::table::{Table, format_real};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const EXCHANGE_RATE_FILE: &str = "1_exchange_rate.txt";
pub const EXTRACTED_DATA_FILE: &str = "1_extracted_data.json";
pub const TRANSFORMED_DATA_FILE: &str = "2_transformed_data.csv";
pub const TRANSFORMED_RATE_FILE: &str = "2_transformed_exchange_rate.txt";
pub const LOADED_DATA_FILE: &str = "3_loaded_data.csv";

#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: &str) -> PathBuf {
        self.dir.join(artifact)
    }

    /// Creates the directory if missing, otherwise removes every file directly
    /// inside it. Subdirectories are left untouched.
    pub fn prepare(&self) -> Result<()> {
        info!("Preparing dump directory {}", self.dir.display());
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("Failed to create dump directory: {}", self.dir.display())
            })?;
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list dump directory: {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                debug!("Removed stale artifact {}", path.display());
            }
        }
        info!("Directory ready");
        Ok(())
    }

    fn write(&self, artifact: &str, contents: &[u8]) -> Result<()> {
        let path = self.path(artifact);
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        debug!("Wrote artifact {}", path.display());
        Ok(())
    }

    fn read(&self, artifact: &str) -> Result<String> {
        let path = self.path(artifact);
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact: {}", path.display()))
    }

    pub fn write_exchange_rate(&self, quote: &str) -> Result<()> {
        self.write(EXCHANGE_RATE_FILE, quote.as_bytes())
    }

    pub fn read_exchange_rate(&self) -> Result<String> {
        self.read(EXCHANGE_RATE_FILE)
    }

    pub fn write_extracted(&self, document: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string_pretty(document)?;
        self.write(EXTRACTED_DATA_FILE, text.as_bytes())
    }

    pub fn read_extracted(&self) -> Result<serde_json::Value> {
        let text = self.read(EXTRACTED_DATA_FILE)?;
        serde_json::from_str(&text)
            .with_context(|| format!("Malformed artifact: {EXTRACTED_DATA_FILE}"))
    }

    pub fn write_transformed(&self, record: &NormalizedRecord, exchange_rate: f64) -> Result<()> {
        self.write_table(TRANSFORMED_DATA_FILE, &record.to_table())?;
        self.write(TRANSFORMED_RATE_FILE, format_real(exchange_rate).as_bytes())
    }

    pub fn read_transformed(&self) -> Result<Table> {
        let path = self.path(TRANSFORMED_DATA_FILE);
        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to read artifact: {}", path.display()))?;
        Table::read_csv(file).with_context(|| format!("Malformed artifact: {}", path.display()))
    }

    pub fn write_loaded(&self, table: &Table) -> Result<()> {
        self.write_table(LOADED_DATA_FILE, table)
    }

    fn write_table(&self, artifact: &str, table: &Table) -> Result<()> {
        let mut buf = Vec::new();
        table.write_csv(&mut buf)?;
        self.write(artifact, &buf)
    }
}
