use anyhow::Context;
use clap::Parser;
use kood_stats::args::{Args, Command};
use kood_stats::api::{self, Platform};
use kood_stats::{commands, Config, Error, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with {} error: {e}", e.error_type());
            if let Error::Auth { reason } = &e {
                debug!("Sign-in failed because: {reason}");
            }
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().kood_home().path();
    let format = args.common().format();

    // This allows for testing the program without hitting the platform. When
    // KOOD_STATS_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Live.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.api_url())
            .await?
            .print(format),

        Command::Login(login_args) => {
            let config = load(home).await?;
            let password = match login_args.password() {
                Some(password) => password.to_string(),
                None => rpassword::prompt_password("Password: ")
                    .context("Unable to read the password")
                    .map_err(Error::Local)?,
            };
            let platform = connect(&config, mode)?;
            commands::login(&config, platform.as_ref(), login_args.user(), &password)
                .await?
                .print(format)
        }

        Command::Logout => commands::logout(&load(home).await?).await?.print(format),

        Command::Status => commands::status(&load(home).await?).await?.print(format),

        Command::Profile => {
            let config = load(home).await?;
            let platform = connect(&config, mode)?;
            commands::profile(&config, platform.as_ref())
                .await?
                .print(format)
        }

        Command::Xp(chart_args) => {
            let config = load(home).await?;
            let platform = connect(&config, mode)?;
            commands::xp(&config, platform.as_ref(), chart_args)
                .await?
                .print(format)
        }

        Command::Grades(chart_args) => {
            let config = load(home).await?;
            let platform = connect(&config, mode)?;
            commands::grades(&config, platform.as_ref(), chart_args)
                .await?
                .print(format)
        }

        Command::Skills(chart_args) => {
            let config = load(home).await?;
            let platform = connect(&config, mode)?;
            commands::skills(&config, platform.as_ref(), chart_args)
                .await?
                .print(format)
        }

        Command::Audits => {
            let config = load(home).await?;
            let platform = connect(&config, mode)?;
            commands::audits(&config, platform.as_ref())
                .await?
                .print(format)
        }

        Command::Dashboard(chart_args) => {
            let config = load(home).await?;
            let platform = connect(&config, mode)?;
            commands::dashboard(&config, platform.as_ref(), chart_args)
                .await?
                .print(format)
        }
    };
    Ok(())
}

async fn load(home: &std::path::Path) -> Result<Config> {
    Config::load(home).await.map_err(Error::Local)
}

/// The live platform, or the fixture platform in test mode.
fn connect(config: &Config, mode: Mode) -> Result<Box<dyn Platform>> {
    api::platform(config, mode).map_err(Error::Local)
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
