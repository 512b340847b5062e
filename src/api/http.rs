//! Implements the `Platform` trait over HTTP with `reqwest`.

use crate::api::{GraphQuery, Platform};
use crate::error::Res;
use crate::session::Session;
use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

const SIGN_IN: &str = "auth/signin";
const GRAPHQL: &str = "graphql-engine/v1/graphql";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Talks to the live platform API rooted at `api_url`, e.g. `https://01.kood.tech/api`.
pub struct HttpPlatform {
    api_url: Url,
    client: reqwest::Client,
}

impl HttpPlatform {
    pub fn new(api_url: Url) -> Res<Self> {
        Self::with_builder(api_url, reqwest::Client::builder())
    }

    /// Talks to a server on this machine, ignoring any proxy settings in the environment.
    #[cfg(test)]
    pub(crate) fn local(api_url: Url) -> Res<Self> {
        Self::with_builder(api_url, reqwest::Client::builder().no_proxy())
    }

    fn with_builder(api_url: Url, builder: reqwest::ClientBuilder) -> Res<Self> {
        let client = builder
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create the HTTP client")?;
        Ok(Self { api_url, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl Platform for HttpPlatform {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Res<String> {
        let url = self.endpoint(SIGN_IN);
        debug!("Signing in at {url}");
        let response = self
            .client
            .post(&url)
            .basic_auth(identifier, Some(secret))
            .send()
            .await
            .with_context(|| format!("Unable to reach {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("Sign-in was rejected with status {status}")
        }
        response
            .text()
            .await
            .context("Unable to read the sign-in response")
    }

    async fn query(&self, session: &Session, query: &GraphQuery) -> Res<Value> {
        let url = self.endpoint(GRAPHQL);
        trace!("Running the {} query at {url}", query.resource());
        let response = self
            .client
            .post(&url)
            .bearer_auth(session.token().secret())
            .json(&query.body())
            .send()
            .await
            .with_context(|| format!("Unable to reach {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("The {} query failed with status {status}", query.resource())
        }
        let envelope: Envelope = response
            .json()
            .await
            .with_context(|| format!("The {} response is not JSON", query.resource()))?;
        envelope
            .into_data()
            .with_context(|| format!("The {} query failed", query.resource()))
    }
}

/// A GraphQL response. The endpoint answers `200 OK` even when the query failed, in which case
/// `errors` is filled in.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

impl Envelope {
    fn into_data(self) -> Res<Value> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            bail!("{}", messages.join("; "))
        }
        match self.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => bail!("The response has no data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn envelope_with_data() {
        let data = envelope(json!({ "data": { "user": [] } })).into_data().unwrap();
        assert_eq!(data, json!({ "user": [] }));
    }

    #[test]
    fn envelope_with_errors() {
        let e = envelope(json!({
            "errors": [
                { "message": "field 'foo' not found in type: 'transaction'" },
                { "message": "second" }
            ]
        }))
        .into_data()
        .unwrap_err();
        assert_eq!(
            e.to_string(),
            "field 'foo' not found in type: 'transaction'; second"
        );
    }

    #[test]
    fn envelope_without_data() {
        assert!(envelope(json!({})).into_data().is_err());
        assert!(envelope(json!({ "data": null })).into_data().is_err());
    }

    #[test]
    fn endpoints() {
        let platform = HttpPlatform::new(Url::parse("https://01.kood.tech/api").unwrap()).unwrap();
        assert_eq!(
            platform.endpoint(SIGN_IN),
            "https://01.kood.tech/api/auth/signin"
        );
        let platform = HttpPlatform::new(Url::parse("https://example.com").unwrap()).unwrap();
        assert_eq!(
            platform.endpoint(GRAPHQL),
            "https://example.com/graphql-engine/v1/graphql"
        );
    }
}
