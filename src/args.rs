//! These structs provide the CLI interface for the kood CLI.

use crate::config::DEFAULT_API_URL;
use crate::metrics::BucketWidth;
use crate::render::Format;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// kood: Your progress on the kood/jõhvi learning platform, in the terminal.
///
/// Log in once with your platform username or email and password. The session token is kept in
/// $KOOD_HOME/.secrets so that later commands can query your XP, grades, skills and audits and
/// draw them as charts, or print them as JSON for another program to draw.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/.kood;
    /// pass --kood-home or set KOOD_HOME to put it somewhere else.
    Init(InitArgs),
    /// Sign in to the platform and remember the session.
    Login(LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Show whether there is a stored session and when it expires.
    Status,
    /// Show who you are and your total XP.
    Profile,
    /// XP by project, XP over time and smoothed XP over time.
    Xp(ChartArgs),
    /// Project pass/fail ratio and a histogram of grades.
    Grades(ChartArgs),
    /// The highest level reached in each skill.
    Skills(ChartArgs),
    /// Audits passed and failed, and the audit ratio.
    Audits,
    /// Everything at once.
    Dashboard(ChartArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where kood data and configuration is held. Defaults to ~/.kood
    #[arg(long, env = "KOOD_HOME", default_value_t = default_kood_home())]
    kood_home: DisplayPath,

    /// How to print command output: text charts or JSON.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

impl Common {
    pub fn new(log_level: LevelFilter, kood_home: PathBuf, format: Format) -> Self {
        Self {
            log_level,
            kood_home: kood_home.into(),
            format,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn kood_home(&self) -> &DisplayPath {
        &self.kood_home
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

/// (Not shown): Args for the `kood init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the platform API.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// (Not shown): Args for the `kood login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    /// Your platform username or email.
    #[arg(long, short)]
    user: String,

    /// Your password. If neither this nor KOOD_PASSWORD is given you will be prompted for it.
    #[arg(long, env = "KOOD_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl LoginArgs {
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// (Not shown): Args that shape the charts. Anything not given falls back to config.json.
#[derive(Debug, Default, Parser, Clone)]
pub struct ChartArgs {
    /// How many bars or radar axes to keep.
    #[arg(long)]
    top: Option<usize>,

    /// How many records are averaged together when smoothing XP over time.
    #[arg(long)]
    run_size: Option<NonZeroUsize>,

    /// The grade histogram bucket width, e.g. 0.25.
    #[arg(long)]
    width: Option<BucketWidth>,
}

impl ChartArgs {
    pub fn new(
        top: Option<usize>,
        run_size: Option<NonZeroUsize>,
        width: Option<BucketWidth>,
    ) -> Self {
        Self {
            top,
            run_size,
            width,
        }
    }

    pub fn top(&self) -> Option<usize> {
        self.top
    }

    pub fn run_size(&self) -> Option<NonZeroUsize> {
        self.run_size
    }

    pub fn width(&self) -> Option<BucketWidth> {
        self.width
    }
}

fn default_kood_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join(".kood"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --kood-home or KOOD_HOME instead of relying on the default \
                kood home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from(".kood")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dashboard_args() {
        let args = Args::try_parse_from([
            "kood",
            "--kood-home",
            "/tmp/kood",
            "--format",
            "json",
            "dashboard",
            "--top",
            "5",
            "--run-size",
            "3",
            "--width",
            "0.5",
        ])
        .unwrap();
        assert_eq!(args.common().kood_home().path(), Path::new("/tmp/kood"));
        assert_eq!(args.common().format(), Format::Json);
        let Command::Dashboard(chart) = args.command() else {
            panic!("expected dashboard, got {:?}", args.command());
        };
        assert_eq!(chart.top(), Some(5));
        assert_eq!(chart.run_size(), NonZeroUsize::new(3));
        assert_eq!(chart.width().map(|w| w.get()), Some(0.5));
    }

    #[test]
    fn rejects_bad_chart_args() {
        for bad in [["--width", "0"], ["--width", "-1"], ["--run-size", "0"]] {
            let mut argv = vec!["kood", "xp"];
            argv.extend(bad);
            assert!(Args::try_parse_from(argv).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn init_defaults_to_platform_url() {
        let args = Args::try_parse_from(["kood", "init"]).unwrap();
        let Command::Init(init) = args.command() else {
            panic!("expected init");
        };
        assert_eq!(init.api_url(), DEFAULT_API_URL);
    }
}
