//! Session command handlers.
//!
//! - `kood login` signs in and stores the token
//! - `kood logout` forgets it
//! - `kood status` shows whether there is a session

use crate::api::Platform;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::session::{Claims, SessionGate, SessionStore};
use crate::{Config, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Handles `kood login`: signs in with `identifier` (username or email) and `secret`, and stores
/// the token for later commands.
///
/// # Errors
/// Returns [`crate::Error::Auth`] if the platform rejects the credentials or returns something
/// that is not a token. Nothing is stored in that case.
pub async fn login(
    config: &Config,
    platform: &dyn Platform,
    identifier: &str,
    secret: &str,
) -> Result<Out<()>> {
    let gate = SessionGate::new(SessionStore::new(config.session_path()), platform);
    let session = gate.login(identifier, secret).await?;
    debug!("Stored {:?}", session.token());
    Ok(format!("Logged in as {identifier}").into())
}

/// Handles `kood logout`. Not being logged in is not an error.
pub async fn logout(config: &Config) -> Result<Out<()>> {
    let store = SessionStore::new(config.session_path());
    let existed = store.clear().await.pub_result(ErrorType::Local)?;
    Ok(if existed {
        "Logged out".into()
    } else {
        "Not logged in, nothing to do".into()
    })
}

/// What `kood status` reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub logged_in: bool,
    /// Decoded from the token without verifying it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    pub expired: bool,
}

/// Handles `kood status`. Only reads the stored session; it does not contact the platform.
pub async fn status(config: &Config) -> Result<Out<Status>> {
    let store = SessionStore::new(config.session_path());
    let session = store.restore().await.pub_result(ErrorType::Local)?;
    let status = match session {
        None => Status {
            logged_in: false,
            claims: None,
            expired: false,
        },
        Some(session) => {
            let claims = session.token().claims();
            let expired = claims.as_ref().is_some_and(|c| c.is_expired(Utc::now()));
            Status {
                logged_in: true,
                claims,
                expired,
            }
        }
    };
    let message = match (status.logged_in, status.expired) {
        (false, _) => "Not logged in",
        (true, false) => "Logged in",
        (true, true) => "Logged in, but the session has expired",
    };
    Ok(Out::new(message, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FixturePlatform;
    use crate::test::TestEnv;
    use crate::Error;

    #[tokio::test]
    async fn login_status_logout() {
        let env = TestEnv::new().await;
        let config = env.config();

        let out = status(&config).await.unwrap();
        assert!(!out.structure().unwrap().logged_in);

        let platform = FixturePlatform::default();
        let err = login(&config, &platform, "student", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));

        let out = login(&config, &platform, "student", "secret").await.unwrap();
        assert_eq!(out.message(), "Logged in as student");

        let out = status(&config).await.unwrap();
        let s = out.structure().unwrap();
        assert!(s.logged_in);
        assert!(!s.expired);
        assert_eq!(s.claims.as_ref().unwrap().sub.as_deref(), Some("4242"));

        assert_eq!(logout(&config).await.unwrap().message(), "Logged out");
        assert_eq!(
            logout(&config).await.unwrap().message(),
            "Not logged in, nothing to do"
        );
    }
}
