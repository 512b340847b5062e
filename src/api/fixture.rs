//! Implements the `Platform` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without talking to the real platform. See [`crate::api::Mode`].

use crate::api::{GraphQuery, Platform, Resource};
use crate::error::Res;
use crate::model::{Audit, AuditGroup, GradeResult, Transaction, TransactionKind};
use crate::session::Session;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// The only credentials the fixture platform accepts.
pub(crate) const FIXTURE_LOGIN: &str = "student";
pub(crate) const FIXTURE_PASSWORD: &str = "secret";

/// A well-formed but unsigned token: `{"sub":"4242","iat":1704067200,"exp":4102444800}`.
pub(crate) const FIXTURE_TOKEN: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
    eyJzdWIiOiI0MjQyIiwiaWF0IjoxNzA0MDY3MjAwLCJleHAiOjQxMDI0NDQ4MDB9.\
    Zml4dHVyZS1zaWduYXR1cmU";

const FIXTURE_USER_ID: i64 = 4242;

/// An implementation of the `Platform` trait that does not use the network. It answers every query
/// from the seed data in this module and can be told to misbehave for testing.
#[derive(Debug, Clone, Default)]
pub struct FixturePlatform {
    /// Replaces the body returned by a successful sign-in.
    sign_in_body: Option<String>,
    /// Queries for this resource fail.
    failing: Option<Resource>,
}

impl FixturePlatform {
    /// Returns `body` from a successful sign-in instead of the fixture token.
    pub fn with_sign_in_body(mut self, body: impl Into<String>) -> Self {
        self.sign_in_body = Some(body.into());
        self
    }

    /// Makes every query for `resource` fail.
    pub fn with_failing(mut self, resource: Resource) -> Self {
        self.failing = Some(resource);
        self
    }
}

#[async_trait::async_trait]
impl Platform for FixturePlatform {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Res<String> {
        if identifier != FIXTURE_LOGIN || secret != FIXTURE_PASSWORD {
            bail!("Sign-in was rejected with status 401 Unauthorized")
        }
        Ok(match &self.sign_in_body {
            Some(body) => body.clone(),
            None => format!("\"{FIXTURE_TOKEN}\""),
        })
    }

    async fn query(&self, session: &Session, query: &GraphQuery) -> Res<Value> {
        if session.token().secret() != FIXTURE_TOKEN {
            bail!("Could not verify JWT: JWSInvalidSignature")
        }
        let resource = query.resource();
        if self.failing == Some(resource) {
            bail!("The platform failed the {resource} query")
        }
        let rows = match resource {
            Resource::User => user(),
            Resource::Xp => transactions(|k| *k == TransactionKind::Xp)?,
            Resource::Skills => transactions(|k| matches!(k, TransactionKind::Skill(_)))?,
            Resource::AuditXp => {
                transactions(|k| matches!(k, TransactionKind::Up | TransactionKind::Down))?
            }
            Resource::Results => {
                serde_json::to_value(load_csv::<GradeResult>(RESULT_DATA)?)?
            }
            Resource::Audits => serde_json::to_value(audits()?)?,
        };
        Ok(json!({ (resource.root()): rows }))
    }
}

fn user() -> Value {
    json!([{
        "id": FIXTURE_USER_ID,
        "login": FIXTURE_LOGIN,
        "email": "student@example.com",
        "campus": "johvi",
        "auditRatio": 1.2,
        "totalUp": 30000,
        "totalDown": 25000
    }])
}

fn transactions(keep: impl Fn(&TransactionKind) -> bool) -> Res<Value> {
    let rows: Vec<Transaction> = load_csv::<Transaction>(TRANSACTION_DATA)?
        .into_iter()
        .filter(|t| keep(&t.kind))
        .collect();
    Ok(serde_json::to_value(rows)?)
}

/// The audit seed data is flat; the endpoint nests the path under `group`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatAudit {
    grade: Option<f64>,
    path: String,
    created_at: DateTime<Utc>,
}

fn audits() -> Res<Vec<Audit>> {
    Ok(load_csv::<FlatAudit>(AUDIT_DATA)?
        .into_iter()
        .map(|a| Audit {
            grade: a.grade,
            created_at: a.created_at,
            group: Some(AuditGroup { path: a.path }),
        })
        .collect())
}

/// Loads rows from a CSV-formatted string with a header row.
fn load_csv<T>(csv_data: &str) -> Res<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());
    rdr.deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .context("Invalid fixture data")
}

/// Seed transaction data.
const TRANSACTION_DATA: &str = r##"amount,type,path,createdAt
5000,xp,/johvi/piscine-go/quest-01,2023-09-04T09:12:00Z
7500,xp,/johvi/piscine-go/quest-02,2023-09-05T16:40:00Z
9000,xp,/johvi/piscine-go/quest-03,2023-09-07T11:05:00Z
12000,xp,/johvi/piscine-go/checkpoint-01,2023-09-09T15:30:00Z
13500,xp,/johvi/div-01/go-reloaded,2023-10-12T10:00:00Z
24500,xp,/johvi/div-01/ascii-art,2023-10-30T13:45:00Z
9800,xp,/johvi/div-01/ascii-art-web,2023-11-14T08:20:00Z
34375,xp,/johvi/div-01/groupie-tracker,2023-12-18T17:10:00Z
92000,xp,/johvi/div-01/forum,2024-02-26T12:00:00Z
18400,xp,/johvi/div-01/forum-security,2024-03-20T09:35:00Z
147000,xp,/johvi/div-01/make-your-game,2024-05-08T14:50:00Z
25000,xp,/johvi/div-01/graphql,2024-06-19T10:25:00Z
50000,xp,/johvi/div-01/real-time-forum,2024-07-30T16:15:00Z
5000,xp,/johvi/div-01/checkpoint,2024-08-14T11:00:00Z
5000,xp,/johvi/div-01/checkpoint,2024-09-11T11:00:00Z
10,skill_go,/johvi/div-01/go-reloaded,2023-10-12T10:00:00Z
25,skill_go,/johvi/div-01/groupie-tracker,2023-12-18T17:10:00Z
15,skill_algo,/johvi/div-01/ascii-art,2023-10-30T13:45:00Z
20,skill_front-end,/johvi/div-01/ascii-art-web,2023-11-14T08:20:00Z
35,skill_back-end,/johvi/div-01/forum,2024-02-26T12:00:00Z
40,skill_prog,/johvi/div-01/forum,2024-02-26T12:00:00Z
30,skill_js,/johvi/div-01/make-your-game,2024-05-08T14:50:00Z
45,skill_front-end,/johvi/div-01/make-your-game,2024-05-08T14:50:00Z
50,skill_prog,/johvi/div-01/real-time-forum,2024-07-30T16:15:00Z
12000,up,/johvi/div-01/ascii-art,2023-11-02T10:00:00Z
8500,up,/johvi/div-01/forum,2024-03-04T15:00:00Z
9500,up,/johvi/div-01/make-your-game,2024-05-20T12:30:00Z
10000,down,/johvi/div-01/forum,2024-02-24T10:00:00Z
15000,down,/johvi/div-01/make-your-game,2024-05-06T09:30:00Z
"##;

/// Seed result data. An empty grade is an attempt that has not been graded yet.
const RESULT_DATA: &str = r##"grade,path,createdAt
1,/johvi/piscine-go/quest-01,2023-09-04T09:12:00Z
0,/johvi/piscine-go/quest-02,2023-09-05T10:00:00Z
1,/johvi/piscine-go/quest-02,2023-09-05T16:40:00Z
1,/johvi/piscine-go/quest-03,2023-09-07T11:05:00Z
0,/johvi/piscine-go/checkpoint-01,2023-09-08T15:30:00Z
1.25,/johvi/piscine-go/checkpoint-01,2023-09-09T15:30:00Z
1,/johvi/div-01/go-reloaded,2023-10-12T10:00:00Z
1.5,/johvi/div-01/ascii-art,2023-10-30T13:45:00Z
0.4,/johvi/div-01/ascii-art-web,2023-11-10T08:20:00Z
1,/johvi/div-01/ascii-art-web,2023-11-14T08:20:00Z
1.2,/johvi/div-01/groupie-tracker,2023-12-18T17:10:00Z
1,/johvi/div-01/forum,2024-02-26T12:00:00Z
0,/johvi/div-01/forum-security,2024-03-18T09:35:00Z
1,/johvi/div-01/forum-security,2024-03-20T09:35:00Z
1.75,/johvi/div-01/make-your-game,2024-05-08T14:50:00Z
1,/johvi/div-01/graphql,2024-06-19T10:25:00Z
,/johvi/div-01/social-network,2024-09-30T10:00:00Z
"##;

/// Seed audit data.
const AUDIT_DATA: &str = r##"grade,path,createdAt
1,/johvi/div-01/ascii-art,2023-11-02T10:00:00Z
0,/johvi/div-01/ascii-art-web,2023-11-20T14:00:00Z
1,/johvi/div-01/forum,2024-03-04T15:00:00Z
1,/johvi/div-01/make-your-game,2024-05-20T12:30:00Z
0,/johvi/div-01/graphql,2024-06-25T09:00:00Z
1,/johvi/div-01/real-time-forum,2024-08-05T13:20:00Z
,/johvi/div-01/social-network,2024-10-02T10:00:00Z
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{parse_sign_in_body, Token};

    #[test]
    fn seed_data_parses() {
        let transactions: Vec<Transaction> = load_csv(TRANSACTION_DATA).unwrap();
        assert_eq!(transactions.len(), 29);
        let results: Vec<GradeResult> = load_csv(RESULT_DATA).unwrap();
        assert_eq!(results.len(), 17);
        assert_eq!(results.last().unwrap().grade, None);
        assert_eq!(audits().unwrap().len(), 7);
    }

    #[test]
    fn fixture_token_is_well_formed() {
        let token = Token::parse(FIXTURE_TOKEN).unwrap();
        let claims = token.claims().unwrap();
        assert_eq!(claims.sub.as_deref(), Some("4242"));
    }

    #[tokio::test]
    async fn sign_in_and_query() {
        let platform = FixturePlatform::default();
        assert!(platform.sign_in("student", "nope").await.is_err());

        let body = platform.sign_in("student", "secret").await.unwrap();
        let session = Session::new(parse_sign_in_body(&body).unwrap());
        let data = platform
            .query(&session, &GraphQuery::new(Resource::Skills, Some(4242)))
            .await
            .unwrap();
        let rows = data["transaction"].as_array().unwrap();
        assert_eq!(rows.len(), 9);
        assert!(rows
            .iter()
            .all(|r| r["type"].as_str().unwrap().starts_with("skill_")));
    }

    #[tokio::test]
    async fn query_rejects_foreign_token() {
        let platform = FixturePlatform::default();
        let session = Session::new(Token::parse("a.b.c").unwrap());
        assert!(platform.query(&session, &GraphQuery::user()).await.is_err());
    }
}
