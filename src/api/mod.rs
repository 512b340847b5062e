//! The seam between the program and the learning platform.
//!
//! [`Platform`] has two implementations: [`HttpPlatform`] talks to the real API and
//! [`FixturePlatform`] answers from in-memory seed data. Which one is used is decided by [`Mode`].

mod fixture;
mod http;
mod queries;

pub use fixture::FixturePlatform;
pub use http::HttpPlatform;
pub use queries::{GraphQuery, Resource};

use crate::error::Res;
use crate::model::{Audit, GradeResult, StudentData, Transaction, User};
use crate::session::Session;
use crate::Config;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Setting this to a non-empty value runs the whole program against [`FixturePlatform`].
const TEST_MODE_ENV: &str = "KOOD_STATS_IN_TEST_MODE";

/// Whether we are talking to the live platform or to in-memory fixtures.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Live,
    Test,
}

impl Mode {
    /// `Mode::Test` when `KOOD_STATS_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Live`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Live,
        }
    }
}

/// The two calls the platform offers.
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Signs in with HTTP Basic credentials and returns the raw response body, which should hold
    /// the token. Errors for any non-2xx response.
    async fn sign_in(&self, identifier: &str, secret: &str) -> Res<String>;

    /// Runs a GraphQL query and returns its `data` object.
    async fn query(&self, session: &Session, query: &GraphQuery) -> Res<serde_json::Value>;
}

/// Creates the platform implementation for `mode`.
pub fn platform(config: &Config, mode: Mode) -> Res<Box<dyn Platform>> {
    Ok(match mode {
        Mode::Live => Box::new(HttpPlatform::new(config.api_url().clone())?),
        Mode::Test => {
            debug!("Using fixture data instead of {}", config.api_url());
            Box::new(FixturePlatform::default())
        }
    })
}

/// Runs `query` and deserializes the array found under its root field.
async fn fetch_rows<T>(
    platform: &dyn Platform,
    session: &Session,
    query: &GraphQuery,
) -> Res<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut data = platform.query(session, query).await?;
    let root = query.resource().root();
    let rows = match data.get_mut(root) {
        Some(rows) => rows.take(),
        None => bail!("The {} response has no '{root}' field", query.resource()),
    };
    serde_json::from_value(rows)
        .with_context(|| format!("Unexpected shape of the {} response", query.resource()))
}

/// The signed-in user. The platform scopes the `user` table to the token's owner.
pub async fn fetch_user(platform: &dyn Platform, session: &Session) -> Res<User> {
    let users: Vec<User> = fetch_rows(platform, session, &GraphQuery::user()).await?;
    match users.into_iter().next() {
        Some(user) => Ok(user),
        None => bail!("The platform returned no user for this session"),
    }
}

/// Transactions of the kinds selected by `resource`, which must be one of the transaction
/// resources.
pub async fn fetch_transactions(
    platform: &dyn Platform,
    session: &Session,
    resource: Resource,
    user_id: Option<i64>,
) -> Res<Vec<Transaction>> {
    fetch_rows(platform, session, &GraphQuery::new(resource, user_id)).await
}

pub async fn fetch_results(
    platform: &dyn Platform,
    session: &Session,
    user_id: Option<i64>,
) -> Res<Vec<GradeResult>> {
    fetch_rows(platform, session, &GraphQuery::new(Resource::Results, user_id)).await
}

pub async fn fetch_audits(
    platform: &dyn Platform,
    session: &Session,
    user_id: Option<i64>,
) -> Res<Vec<Audit>> {
    fetch_rows(platform, session, &GraphQuery::new(Resource::Audits, user_id)).await
}

/// Fetches the user, then everything else scoped to that user, concurrently. If any query fails
/// the whole fetch fails; there is no partial result.
pub async fn fetch_student_data(platform: &dyn Platform, session: &Session) -> Res<StudentData> {
    let user = fetch_user(platform, session).await?;
    let id = Some(user.id);
    let (xp, skills, audit_xp, results, audits) = tokio::try_join!(
        fetch_transactions(platform, session, Resource::Xp, id),
        fetch_transactions(platform, session, Resource::Skills, id),
        fetch_transactions(platform, session, Resource::AuditXp, id),
        fetch_results(platform, session, id),
        fetch_audits(platform, session, id),
    )?;
    debug!(
        "Fetched {} xp, {} skill, {} audit xp transactions, {} results, {} audits for {}",
        xp.len(),
        skills.len(),
        audit_xp.len(),
        results.len(),
        audits.len(),
        user.login
    );
    Ok(StudentData {
        user,
        xp,
        results,
        skills,
        audits,
        audit_xp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransactionKind;

    async fn fixture_session(platform: &FixturePlatform) -> Session {
        let body = platform.sign_in("student", "secret").await.unwrap();
        Session::new(crate::session::parse_sign_in_body(&body).unwrap())
    }

    #[tokio::test]
    async fn fetch_student_data_from_fixtures() {
        let platform = FixturePlatform::default();
        let session = fixture_session(&platform).await;
        let data = fetch_student_data(&platform, &session).await.unwrap();
        assert_eq!(data.user().login, "student");
        assert!(!data.xp().is_empty());
        assert!(data.xp().iter().all(|t| t.kind == TransactionKind::Xp));
        assert!(data
            .skills()
            .iter()
            .all(|t| matches!(t.kind, TransactionKind::Skill(_))));
        assert!(data
            .audit_xp()
            .iter()
            .all(|t| matches!(t.kind, TransactionKind::Up | TransactionKind::Down)));
        assert!(!data.results().is_empty());
        assert!(!data.audits().is_empty());
    }

    #[tokio::test]
    async fn one_failing_query_fails_everything() {
        let platform = FixturePlatform::default().with_failing(Resource::Audits);
        let session = fixture_session(&platform).await;
        let err = fetch_student_data(&platform, &session).await.unwrap_err();
        assert!(format!("{err:#}").contains("audits"), "{err:#}");
    }

    #[test]
    fn mode_default_is_live() {
        assert_eq!(Mode::default(), Mode::Live);
    }
}
