use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoindeskProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GoogleFinanceProviderConfig {
    pub base_url: String,
    /// Class attribute of the element holding the quoted rate.
    #[serde(default = "default_selector_class")]
    pub selector_class: String,
}

fn default_selector_class() -> String {
    "YMlKec fxKbKc".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_coindesk")]
    pub coindesk: CoindeskProviderConfig,
    #[serde(default = "default_google_finance")]
    pub google_finance: GoogleFinanceProviderConfig,
}

fn default_coindesk() -> CoindeskProviderConfig {
    CoindeskProviderConfig {
        base_url: "https://api.coindesk.com".to_string(),
    }
}

fn default_google_finance() -> GoogleFinanceProviderConfig {
    GoogleFinanceProviderConfig {
        base_url: "https://www.google.com".to_string(),
        selector_class: default_selector_class(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coindesk: default_coindesk(),
            google_finance: default_google_finance(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub table: String,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let host = self.host.as_deref().context("database.host is not set")?;
        let name = self.name.as_deref().context("database.name is not set")?;
        let user = self.user.as_deref().context("database.user is not set")?;
        let port = self.port.unwrap_or(5432);

        // Credentials and database name are percent-encoded by `Url`.
        let mut url = Url::parse(&format!("postgres://{host}:{port}"))
            .with_context(|| format!("Invalid database host: {host}"))?;
        url.set_username(user)
            .map_err(|_| anyhow!("Invalid database user: {user}"))?;
        url.set_password(self.password.as_deref())
            .map_err(|_| anyhow!("Invalid database password"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid database name: {name}"))?
            .clear()
            .push(name);
        Ok(url.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub retries: usize,
    pub retry_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval_secs: 3600,
            retries: 2,
            retry_delay_secs: 60,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub dump_dir: PathBuf,
    #[serde(default = "default_home_currency")]
    pub home_currency: String,
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_home_currency() -> String {
    "IDR".to_string()
}

fn default_fallback_rate() -> String {
    "15,000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            dump_dir: PathBuf::from("dump"),
            home_currency: default_home_currency(),
            fallback_rate: default_fallback_rate(),
            providers: ProvidersConfig::default(),
            database: DatabaseConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolves the configuration used by every command: the given file, else the
    /// default file if present, else built-in defaults. Environment overrides are
    /// applied last and the result is validated.
    pub fn resolve(config_path: Option<&str>) -> Result<Self> {
        // A missing .env is fine; values may come from the real environment.
        let _ = dotenvy::dotenv();

        let mut config = match config_path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "bpi-etl", "bpi-etl")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies `PROD_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROD_DUMP_FOLDER") {
            self.dump_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PROD_DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("PROD_HOST") {
            self.database.host = Some(v);
        }
        if let Some(v) = lookup("PROD_PORT") {
            let port = v
                .parse()
                .with_context(|| format!("PROD_PORT is not a valid port: {v}"))?;
            self.database.port = Some(port);
        }
        if let Some(v) = lookup("PROD_DB") {
            self.database.name = Some(v);
        }
        if let Some(v) = lookup("PROD_USER") {
            self.database.user = Some(v);
        }
        if let Some(v) = lookup("PROD_PASS") {
            self.database.password = Some(v);
        }
        if let Some(v) = lookup("PROD_TABLE") {
            self.database.table = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dump_dir.as_os_str().is_empty() {
            bail!("dump_dir must not be empty");
        }
        if self.database.table.trim().is_empty() {
            bail!("database.table is not set");
        }
        if self.home_currency.trim().is_empty() {
            bail!("home_currency must not be empty");
        }
        if self.schedule.interval_secs == 0 {
            bail!("schedule.interval_secs must be greater than zero");
        }
        self.database.connection_url()?;
        Ok(())
    }
}
