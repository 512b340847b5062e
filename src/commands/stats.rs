//! Handlers for the commands that fetch data and turn it into charts.

use crate::api::{self, Platform, Resource};
use crate::args::ChartArgs;
use crate::charts::{
    self, AuditsView, ChartOptions, Dashboard, GradesView, Profile, SkillsView, XpView,
};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::metrics::BucketWidth;
use crate::session::{Session, SessionGate, SessionStore};
use crate::{Config, Result};
use anyhow::{anyhow, Context};
use std::num::NonZeroUsize;
use tracing::debug;

/// Command-line values win over config.json.
fn chart_options(config: &Config, args: &ChartArgs) -> Result<ChartOptions> {
    let run_size = match args.run_size() {
        Some(run_size) => run_size,
        None => NonZeroUsize::new(config.run_size())
            .ok_or_else(|| {
                anyhow!(
                    "run_size in {} must be at least 1",
                    config.config_path().display()
                )
            })
            .pub_result(ErrorType::Local)?,
    };
    let width = match args.width() {
        Some(width) => width,
        None => BucketWidth::new(config.histogram_width())
            .with_context(|| format!("Bad histogram_width in {}", config.config_path().display()))
            .pub_result(ErrorType::Local)?,
    };
    Ok(ChartOptions {
        top_n: args.top().unwrap_or(config.top_n()),
        run_size,
        width,
    })
}

/// The stored session. Fails with [`crate::Error::NotLoggedIn`] before anything is sent if there
/// is none.
async fn connect(config: &Config, platform: &dyn Platform) -> Result<Session> {
    SessionGate::new(SessionStore::new(config.session_path()), platform)
        .require()
        .await
}

async fn user_id(platform: &dyn Platform, session: &Session) -> Result<i64> {
    let user = api::fetch_user(platform, session)
        .await
        .pub_result(ErrorType::Query)?;
    debug!("Fetching data for {} (id {})", user.login, user.id);
    Ok(user.id)
}

/// Handles `kood profile`.
pub async fn profile(config: &Config, platform: &dyn Platform) -> Result<Out<Profile>> {
    let session = connect(config, platform).await?;
    let user = api::fetch_user(platform, &session)
        .await
        .pub_result(ErrorType::Query)?;
    let xp = api::fetch_transactions(platform, &session, Resource::Xp, Some(user.id))
        .await
        .pub_result(ErrorType::Query)?;
    let profile = charts::profile(&user, &xp, session.token().claims());
    Ok(Out::new(format!("Profile of {}", user.login), profile))
}

/// Handles `kood xp`.
pub async fn xp(
    config: &Config,
    platform: &dyn Platform,
    args: &ChartArgs,
) -> Result<Out<XpView>> {
    let options = chart_options(config, args)?;
    let session = connect(config, platform).await?;
    let id = user_id(platform, &session).await?;
    let xp = api::fetch_transactions(platform, &session, Resource::Xp, Some(id))
        .await
        .pub_result(ErrorType::Query)?;
    Ok(Out::new(
        format!("{} XP transactions", xp.len()),
        charts::xp(&xp, &options),
    ))
}

/// Handles `kood grades`.
pub async fn grades(
    config: &Config,
    platform: &dyn Platform,
    args: &ChartArgs,
) -> Result<Out<GradesView>> {
    let options = chart_options(config, args)?;
    let session = connect(config, platform).await?;
    let id = user_id(platform, &session).await?;
    let results = api::fetch_results(platform, &session, Some(id))
        .await
        .pub_result(ErrorType::Query)?;
    Ok(Out::new(
        format!("{} results", results.len()),
        charts::grades(&results, &options),
    ))
}

/// Handles `kood skills`.
pub async fn skills(
    config: &Config,
    platform: &dyn Platform,
    args: &ChartArgs,
) -> Result<Out<SkillsView>> {
    let options = chart_options(config, args)?;
    let session = connect(config, platform).await?;
    let id = user_id(platform, &session).await?;
    let skills = api::fetch_transactions(platform, &session, Resource::Skills, Some(id))
        .await
        .pub_result(ErrorType::Query)?;
    Ok(Out::new(
        format!("{} skill transactions", skills.len()),
        charts::skills(&skills, &options),
    ))
}

/// Handles `kood audits`.
pub async fn audits(config: &Config, platform: &dyn Platform) -> Result<Out<AuditsView>> {
    let session = connect(config, platform).await?;
    let id = Some(user_id(platform, &session).await?);
    let (audits, audit_xp) = tokio::try_join!(
        api::fetch_audits(platform, &session, id),
        api::fetch_transactions(platform, &session, Resource::AuditXp, id),
    )
    .pub_result(ErrorType::Query)?;
    Ok(Out::new(
        format!("{} audits", audits.len()),
        charts::audits(&audits, &audit_xp),
    ))
}

/// Handles `kood dashboard`. Either every query succeeds and every view is built, or the command
/// fails.
pub async fn dashboard(
    config: &Config,
    platform: &dyn Platform,
    args: &ChartArgs,
) -> Result<Out<Dashboard>> {
    let options = chart_options(config, args)?;
    let session = connect(config, platform).await?;
    let data = api::fetch_student_data(platform, &session)
        .await
        .context("Unable to load the dashboard")
        .pub_result(ErrorType::Query)?;
    let dashboard = charts::dashboard(&data, session.token().claims(), &options);
    Ok(Out::new(
        format!("Dashboard of {}", data.user().login),
        dashboard,
    ))
}
