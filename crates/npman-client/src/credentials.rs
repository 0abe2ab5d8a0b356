//! Bearer credential issued by the token endpoint.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Hours after issuance at which a token is refreshed.
///
/// Tokens are documented to live 24 hours; refreshing an hour early avoids
/// sending a token that expires mid-request.
const REFRESH_AFTER_HOURS: i64 = 23;

/// Body of `POST /api/tokens`.
#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub identity: &'a str,
    pub secret: &'a str,
}

/// Successful token-endpoint response. Extra fields (`expires`, ...) are
/// ignored; the refresh deadline is computed client-side.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

/// A bearer token plus the instant after which it must be replaced.
///
/// Owned exclusively by the client; never revoked, only superseded.
#[derive(Clone)]
pub(crate) struct Credential {
    token: SecretString,
    refresh_after: DateTime<Utc>,
}

impl Credential {
    pub(crate) fn issued_now(token: String) -> Self {
        Self::issued_at(token, Utc::now())
    }

    pub(crate) fn issued_at(token: String, issued: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token),
            refresh_after: issued + Duration::hours(REFRESH_AFTER_HOURS),
        }
    }

    /// Whether the refresh deadline has passed as of `now`.
    pub(crate) fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_after
    }

    pub(crate) const fn token(&self) -> &SecretString {
        &self.token
    }
}

// The token never appears in debug output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("refresh_after", &self.refresh_after)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_credential_is_valid() {
        let credential = Credential::issued_now("tok".to_string());
        assert!(!credential.needs_refresh(Utc::now()));
    }

    #[test]
    fn refresh_deadline_is_23_hours_after_issuance() {
        let issued = Utc::now();
        let credential = Credential::issued_at("tok".to_string(), issued);

        assert!(!credential.needs_refresh(issued + Duration::hours(22)));
        assert!(credential.needs_refresh(issued + Duration::hours(23)));
        assert!(credential.needs_refresh(issued + Duration::hours(24)));
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let credential = Credential::issued_now("super-secret".to_string());
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
