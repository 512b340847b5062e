//! Configuration file handling.
//!
//! The configuration file is stored at `$KOOD_HOME/config.json` and holds the platform API URL and
//! the defaults used when shaping chart data. The session token lives next to it in
//! `$KOOD_HOME/.secrets/session.json`, see [`crate::session`].

use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "kood-stats";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CONFIG_JSON: &str = "config.json";
const SESSION_JSON: &str = "session.json";

/// The platform API used when `init` is not given `--api-url`.
pub const DEFAULT_API_URL: &str = "https://01.kood.tech/api";

const TOP_N: usize = 10;
const RUN_SIZE: usize = 10;
const HISTOGRAM_WIDTH: f64 = 0.25;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$KOOD_HOME` and from there it loads `$KOOD_HOME/config.json`. It provides paths to
/// the items that are expected in a certain location within the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    api_url: Url,
}

impl Config {
    /// Creates the home directory, its `.secrets` subdirectory and an initial `config.json`
    /// pointing at `api_url`. Running it again over an existing home rewrites `config.json` but
    /// leaves a stored session alone.
    ///
    /// # Errors
    /// - Returns an error if `api_url` is not a URL or if any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, api_url: &str) -> Res<Self> {
        let api_url = parse_api_url(api_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the kood home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_private_dir(&secrets).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            api_url: api_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            api_url,
        })
    }

    /// This will
    /// - validate that `kood_home` exists and that the config file exists
    /// - load and validate the config file
    /// - validate that the secrets directory exists
    pub async fn load(kood_home: impl Into<PathBuf>) -> Res<Self> {
        let maybe_relative = kood_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The kood home directory is missing, run `kood init` first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!(
                "The config file is missing '{}', run `kood init` first",
                config_path.display()
            )
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let api_url = parse_api_url(&config_file.api_url)?;

        let secrets = root.join(SECRETS);
        if !secrets.is_dir() {
            bail!("The secrets directory is missing '{}'", secrets.display())
        }

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            api_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Where the session token is persisted.
    pub fn session_path(&self) -> PathBuf {
        self.secrets.join(SESSION_JSON)
    }

    /// How many entries bar and radar charts keep by default.
    pub fn top_n(&self) -> usize {
        self.config_file.top_n
    }

    /// How many records are averaged together when smoothing a time series by default.
    pub fn run_size(&self) -> usize {
        self.config_file.run_size
    }

    /// The default histogram bucket width for grades.
    pub fn histogram_width(&self) -> f64 {
        self.config_file.histogram_width
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "kood-stats",
///   "config_version": 1,
///   "api_url": "https://01.kood.tech/api",
///   "top_n": 10,
///   "run_size": 10,
///   "histogram_width": 0.25
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "kood-stats"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the platform API, e.g. `https://01.kood.tech/api`
    api_url: String,

    #[serde(default = "default_top_n")]
    top_n: usize,

    #[serde(default = "default_run_size")]
    run_size: usize,

    #[serde(default = "default_histogram_width")]
    histogram_width: f64,
}

fn default_top_n() -> usize {
    TOP_N
}

fn default_run_size() -> usize {
    RUN_SIZE
}

fn default_histogram_width() -> f64 {
    HISTOGRAM_WIDTH
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: DEFAULT_API_URL.to_string(),
            top_n: TOP_N,
            run_size: RUN_SIZE,
            histogram_width: HISTOGRAM_WIDTH,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if `app_name` is wrong.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let config: ConfigFile = utils::deserialize(path.as_ref()).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}

/// Parses the platform base URL. A trailing slash is removed so that endpoint paths can be
/// appended uniformly.
fn parse_api_url(s: &str) -> Res<Url> {
    let trimmed = s.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("Invalid API URL '{s}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("The API URL must use http or https, got '{}'", url.scheme())
    }
    Ok(url)
}
