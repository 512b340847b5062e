//! The session gate.
//!
//! A [`Session`] holds the token the platform handed out at sign-in. It is mirrored to a small
//! key-value file so that it survives between invocations, and it is passed explicitly to every
//! query rather than read from storage by the transport.

use crate::api::Platform;
use crate::error::{Error, Res};
use crate::utils;
use anyhow::{bail, Context};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// The fixed key the token is stored under.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// A token that passed the structural check: exactly three dot-delimited segments, like a JWT.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    pub fn parse(raw: impl Into<String>) -> Res<Self> {
        let raw = raw.into();
        let segments = raw.split('.').count();
        if segments != 3 {
            bail!("Expected a token with 3 segments, found {segments}")
        }
        Ok(Self(raw))
    }

    /// The raw token, for the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Decodes the claims in the middle segment without verifying the signature. Returns `None`
    /// if the payload is not base64url JSON; that does not make the token invalid.
    pub fn claims(&self) -> Option<Claims> {
        let payload = self.0.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl TryFrom<String> for Token {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Token::parse(value)
    }
}

impl From<Token> for String {
    fn from(value: Token) -> Self {
        value.0
    }
}

/// Tokens are credentials, keep them out of logs.
impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token(..{} chars)", self.0.len())
    }
}

/// The parts of the token payload worth showing to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the platform's user id as a string.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at, seconds since the epoch.
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|s| DateTime::from_timestamp(s, 0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

/// An authenticated session. The only state that outlives a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Token,
}

impl Session {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }
}

/// Turns whatever the sign-in endpoint returned into a token. The body is either the bare token
/// or the token as a JSON string literal.
pub(crate) fn parse_sign_in_body(body: &str) -> Res<Token> {
    let trimmed = body.trim();
    let raw = if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed).context("Sign-in body is not a JSON string")?
    } else {
        trimmed.to_string()
    };
    if raw.is_empty() {
        bail!("Sign-in returned an empty body")
    }
    Token::parse(raw)
}

/// Durable key-value storage for the session, a JSON object in a file only the user can read.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores the stored session. A missing file or a missing key means there is no session.
    /// A stored value that fails the token check is an error rather than silently ignored.
    pub async fn restore(&self) -> Res<Option<Session>> {
        let entries = self.entries().await?;
        match entries.get(AUTH_TOKEN_KEY) {
            None => Ok(None),
            Some(raw) => {
                let token = Token::parse(raw.as_str()).with_context(|| {
                    format!(
                        "The stored session in {} is corrupt, run `kood logout`",
                        self.path.display()
                    )
                })?;
                Ok(Some(Session::new(token)))
            }
        }
    }

    pub async fn save(&self, session: &Session) -> Res<()> {
        let mut entries = self.entries().await?;
        entries.insert(
            AUTH_TOKEN_KEY.to_string(),
            session.token().secret().to_string(),
        );
        self.write(&entries).await?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    /// Removes the token. Returns whether there was one.
    pub async fn clear(&self) -> Res<bool> {
        let mut entries = self.entries().await?;
        let existed = entries.remove(AUTH_TOKEN_KEY).is_some();
        if entries.is_empty() {
            utils::remove(&self.path).await?;
        } else {
            self.write(&entries).await?;
        }
        Ok(existed)
    }

    async fn entries(&self) -> Res<BTreeMap<String, String>> {
        if !self.path.is_file() {
            trace!("No session file at {}", self.path.display());
            return Ok(BTreeMap::new());
        }
        utils::deserialize(&self.path).await
    }

    async fn write(&self, entries: &BTreeMap<String, String>) -> Res<()> {
        let json = serde_json::to_string_pretty(entries).context("Unable to serialize session")?;
        utils::write_private(&self.path, json).await
    }
}

/// Decides between "show the login" and "show the data": holds the store and the platform used
/// to sign in.
pub struct SessionGate<'a> {
    store: SessionStore,
    platform: &'a dyn Platform,
}

impl<'a> SessionGate<'a> {
    pub fn new(store: SessionStore, platform: &'a dyn Platform) -> Self {
        Self { store, platform }
    }

    /// Signs in and persists the token. Any failure, whether rejected credentials, a transport
    /// problem or a malformed token, is reported as [`Error::Auth`]. There is no retry.
    pub async fn login(&self, identifier: &str, secret: &str) -> crate::Result<Session> {
        let body = self
            .platform
            .sign_in(identifier, secret)
            .await
            .map_err(|e| Error::auth(format!("{e:#}")))?;
        let token = parse_sign_in_body(&body).map_err(|e| Error::auth(format!("{e:#}")))?;
        let session = Session::new(token);
        self.store.save(&session).await.map_err(Error::Local)?;
        Ok(session)
    }

    /// Forgets the stored session. Returns whether there was one.
    pub async fn logout(&self) -> crate::Result<bool> {
        self.store.clear().await.map_err(Error::Local)
    }

    /// The stored session, or [`Error::NotLoggedIn`].
    pub async fn require(&self) -> crate::Result<Session> {
        self.restore().await?.ok_or(Error::NotLoggedIn)
    }

    pub async fn restore(&self) -> crate::Result<Option<Session>> {
        self.store.restore().await.map_err(Error::Local)
    }
}
