use std::fmt::Debug;

use base64::Engine;
use serde::Deserialize;

/// Storage key for the token used by every authenticated request.
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the token of an administrator session.
pub const ADMIN_TOKEN_KEY: &str = "jwtTokenAdmin";

/// Storage key holding the token of a voter session.
pub const VOTER_TOKEN_KEY: &str = "jwtTokenVoter";

/// What the logged-in user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Voter,
}

impl Role {
    /// Interprets the role string returned by the server. Only `"admin"` is
    /// special; anything else, including no role at all, is a voter.
    #[must_use]
    pub fn from_server(role: Option<&str>) -> Self {
        match role {
            Some("admin") => Self::Admin,
            _ => Self::Voter,
        }
    }

    /// The role-specific key the token is stored under.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Admin => ADMIN_TOKEN_KEY,
            Self::Voter => VOTER_TOKEN_KEY,
        }
    }

    /// The page to show after logging in.
    #[must_use]
    pub const fn destination(self) -> Destination {
        match self {
            Self::Admin => Destination::AdminPage,
            Self::Voter => Destination::VoterPage,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Voter => write!(f, "voter"),
        }
    }
}

/// Pages the login form can redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    AdminPage,
    VoterPage,
}

impl Destination {
    /// Path of the page, relative to the frontend root.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::AdminPage => "admin.html",
            Self::VoterPage => "index.html",
        }
    }
}

/// Claims the backend puts in its tokens. Tokens are treated as opaque, so
/// these are only available when the token happens to be a readable JWT.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub voter_id: Option<String>,
    pub role: Option<String>,
    pub exp: Option<i64>,
}

impl Claims {
    /// Reads the payload segment of a JWT without verifying the signature.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return None;
        };
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&payload).ok()
    }

    /// When the token stops being accepted, if it says so.
    #[must_use]
    pub fn expires_at(&self) -> Option<time::OffsetDateTime> {
        self.exp
            .and_then(|exp| time::OffsetDateTime::from_unix_timestamp(exp).ok())
    }
}

/// An authenticated session. Created by logging in and destroyed by logging
/// out or by its token expiring.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    role: Role,
    claims: Option<Claims>,
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("claims", &self.claims)
            .finish()
    }
}

impl Session {
    #[must_use]
    pub fn new(token: String, role: Role) -> Self {
        let claims = Claims::decode(&token);
        Self {
            token,
            role,
            claims,
        }
    }

    /// The bearer token to send with requests.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// The voter ID the token was issued to, if the token is readable.
    #[must_use]
    pub fn voter_id(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|c| c.voter_id.as_deref())
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<time::OffsetDateTime> {
        self.claims.as_ref().and_then(Claims::expires_at)
    }

    /// Whether the session is known to have expired at `now`. Opaque tokens
    /// never expire from the client's point of view.
    #[must_use]
    pub fn is_expired_at(&self, now: time::OffsetDateTime) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(time::OffsetDateTime::now_utc())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::jwt;
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert_eq, proptest};

    #[test]
    fn admin_role_routes_to_admin_page() {
        let role = Role::from_server(Some("admin"));
        assert_eq!(role, Role::Admin);
        assert_eq!(role.storage_key(), ADMIN_TOKEN_KEY);
        assert_eq!(role.destination().path(), "admin.html");
    }

    #[test]
    fn missing_role_is_a_voter() {
        let role = Role::from_server(None);
        assert_eq!(role, Role::Voter);
        assert_eq!(role.storage_key(), VOTER_TOKEN_KEY);
        assert_eq!(role.destination().path(), "index.html");
    }

    proptest! {
        #[test]
        fn any_other_role_is_a_voter(role in "\\PC*") {
            if role != "admin" {
                prop_assert_eq!(Role::from_server(Some(&role)), Role::Voter);
            }
        }
    }

    #[test]
    fn decodes_jwt_claims() {
        let token = jwt("V-1001", "voter", 1_900_000_000);
        let session = Session::new(token.clone(), Role::Voter);
        assert_eq!(session.token(), token);
        assert_eq!(session.voter_id(), Some("V-1001"));
        assert_eq!(
            session.expires_at(),
            Some(time::OffsetDateTime::from_unix_timestamp(1_900_000_000).unwrap())
        );
    }

    #[test]
    fn opaque_tokens_never_expire() {
        let session = Session::new("not-a-jwt".to_owned(), Role::Voter);
        assert_eq!(session.claims(), None);
        assert_eq!(session.expires_at(), None);
        assert!(!session.is_expired());
    }

    #[test]
    fn expiry_is_inclusive() {
        let session = Session::new(jwt("V-1", "admin", 1_000), Role::Admin);
        let at = |secs| time::OffsetDateTime::from_unix_timestamp(secs).unwrap();
        assert!(!session.is_expired_at(at(999)));
        assert!(session.is_expired_at(at(1_000)));
        assert!(session.is_expired());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let session = Session::new("secret-token".to_owned(), Role::Admin);
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
