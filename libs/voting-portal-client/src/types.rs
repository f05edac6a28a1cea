//! Request and response bodies exchanged with the voting backend.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Where the login endpoint lives, relative to the API base URL.
pub const LOGIN_PATH: &str = "/login";

/// The voter's identifier and password, read from the login form.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub voter_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(voter_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("voter_id", &self.voter_id)
            .field("password", &"********")
            .finish()
    }
}

/// Response to `POST /login`. Every field is optional on the wire; the
/// backend sends `detail` instead of the others on HTTP errors.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    pub token: Option<String>,
    pub role: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    /// Usually a string. Validation failures carry a list here instead, which
    /// we don't surface.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The detail message, if it is a non-empty string.
    pub fn detail_message(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .filter(|detail| !detail.is_empty())
    }
}

/// Response to `GET /profile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub message: String,
}

/// A candidate to put on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub party: String,
}

/// The window during which voting is open. Dates are passed through to the
/// backend as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingDates {
    pub start_date: String,
    pub end_date: String,
}

/// Response to the administrator endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

/// Treats empty strings the same as missing ones.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
