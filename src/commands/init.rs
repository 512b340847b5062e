use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its `.secrets` subdirectory and an initial `config.json`.
///
/// # Arguments
/// - `kood_home` - The directory that will be the root of the data directory, e.g. `$HOME/.kood`
/// - `api_url` - The base URL of the platform API, e.g. `https://01.kood.tech/api`
///
/// # Errors
/// - Returns an error if `api_url` is not a URL or if any file operation fails.
pub async fn init(kood_home: &Path, api_url: &str) -> Result<Out<()>> {
    let config = Config::create(kood_home, api_url)
        .await
        .context("Unable to create the kood home directory and config")
        .pub_result(ErrorType::Local)?;
    Ok(format!(
        "Initialized {} for {}",
        config.root().display(),
        config.api_url()
    )
    .into())
}
