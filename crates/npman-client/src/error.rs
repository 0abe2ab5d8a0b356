//! Error types for the client library.

use serde::Deserialize;
use thiserror::Error;

/// Longest raw-body excerpt carried into an error message when the server's
/// error body is not parseable JSON.
const BODY_EXCERPT_CHARS: usize = 500;

/// Errors surfaced by the client.
///
/// Callers are expected to match on the kind: bad credentials
/// ([`Error::Auth`]) are a different failure from a rejected resource
/// operation ([`Error::Api`]). No variant is ever retried internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Credential acquisition or refresh failed.
    ///
    /// Covers transport failures against the token endpoint, non-success
    /// responses, and token responses missing the token field.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A resource operation failed.
    ///
    /// Carries the HTTP status for non-success responses; `status` is `None`
    /// when transport failed before a status line arrived.
    #[error("API request failed{}: {message}", status_suffix(.status))]
    Api {
        /// HTTP status code, when the response got that far.
        status: Option<u16>,
        /// Server-supplied error detail, or the transport error text.
        message: String,
    },

    /// The request was invalid before it reached the network.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A success response carried a body that does not decode.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |status| format!(" with status {status}"))
}

impl Error {
    /// Whether this error came from credential acquisition or refresh.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Whether this error came from a rejected or failed resource operation.
    #[must_use]
    pub const fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// The HTTP status attached to an API error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Api {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}

/// Error envelope used by the API.
///
/// The server reports failures as `{"error": {"message": ...}}`, sometimes as
/// a bare `{"error": "..."}` or `{"message": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detail { message: String },
    Text(String),
}

/// Extract the most specific error detail from a response body.
///
/// Falls back to a truncated excerpt of the raw text when the body is not the
/// expected JSON envelope. May return an empty string for an empty body.
pub(crate) fn extract_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        match envelope.error {
            Some(ErrorField::Detail { message }) | Some(ErrorField::Text(message)) => {
                return message;
            }
            None => {
                if let Some(message) = envelope.message {
                    return message;
                }
            }
        }
    }
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
