use reqwest::{header::AUTHORIZATION, Url};
use serde::de::DeserializeOwned;

use crate::request::{RequestBody, RequestOptions};
use crate::result::{Error, Result};
use crate::session::{Claims, Role, Session, TOKEN_KEY};
use crate::store::TokenStore;
use crate::types::{
    non_empty, AdminResponse, Candidate, Credentials, ErrorBody, LoginResponse, Profile,
    VotingDates, LOGIN_PATH,
};

/// A client for the voting backend.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client with the given base URL.
    ///
    /// # Example
    ///
    /// ```
    /// # use voting_portal_client::Client;
    /// let base_url = "http://127.0.0.1:8000".parse().unwrap();
    /// let client = Client::new(base_url);
    /// ```
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Create a new client to connect to the backend running on localhost.
    #[must_use]
    pub fn localhost() -> Self {
        Self::new(
            "http://127.0.0.1:8000"
                .parse()
                .expect("hardcoded URL is valid"),
        )
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange credentials for a session. Sends a single form-encoded
    /// `POST /login`; nothing is stored here.
    ///
    /// # Errors
    ///
    /// - [`Error::HttpStatus`] for non-2xx responses, carrying the server's
    ///   `detail` or `Server error: <code>`.
    /// - [`Error::Rejected`] when the server answers `success: false`.
    /// - [`Error::MalformedResponse`] when a successful login has no token.
    /// - [`Error::Transport`] when the request fails or the body isn't JSON.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let url = self.base_url.join(LOGIN_PATH)?;
        tracing::debug!("POST {url} voter_id={}", credentials.voter_id);

        let response = self.http.post(url).form(credentials).send().await?;
        let status_code = response.status();

        if !status_code.is_success() {
            let body: LoginResponse = response.json().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status_code,
                message: non_empty(body.detail.as_deref()).map_or_else(
                    || format!("Server error: {}", status_code.as_u16()),
                    str::to_owned,
                ),
            });
        }

        let body: LoginResponse = response.json().await?;

        if !body.success {
            return Err(Error::Rejected(
                non_empty(body.message.as_deref())
                    .unwrap_or("Login failed")
                    .to_owned(),
            ));
        }

        let Some(token) = non_empty(body.token.as_deref()) else {
            return Err(Error::MalformedResponse(
                "Login response did not include a token".to_owned(),
            ));
        };

        let role = Role::from_server(body.role.as_deref());
        tracing::info!("logged in as {role}");
        Ok(Session::new(token.to_owned(), role))
    }

    /// Perform a request authenticated with the token stored under
    /// [`TOKEN_KEY`], returning the JSON response body.
    ///
    /// Fails with [`Error::MissingToken`] without touching the network when
    /// no token is stored, and with [`Error::SessionExpired`] when the token
    /// says it has expired.
    pub async fn auth_fetch<S>(
        &self,
        store: &S,
        url: &str,
        options: RequestOptions,
    ) -> Result<serde_json::Value>
    where
        S: TokenStore + ?Sized,
    {
        let token = store.get(TOKEN_KEY)?.ok_or(Error::MissingToken)?;
        ensure_not_expired(Claims::decode(&token).and_then(|c| c.expires_at()))?;
        self.fetch_with_token(&token, url, options).await
    }

    /// Like [`Client::auth_fetch`], deserializing the body as `T`.
    pub async fn auth_fetch_json<S, T>(
        &self,
        store: &S,
        url: &str,
        options: RequestOptions,
    ) -> Result<T>
    where
        S: TokenStore + ?Sized,
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(
            self.auth_fetch(store, url, options).await?,
        )?)
    }

    /// Perform a request authenticated with an in-memory session.
    pub async fn fetch_with_session(
        &self,
        session: &Session,
        url: &str,
        options: RequestOptions,
    ) -> Result<serde_json::Value> {
        ensure_not_expired(session.expires_at())?;
        self.fetch_with_token(session.token(), url, options).await
    }

    /// Get the profile greeting for the logged-in user.
    pub async fn profile<S: TokenStore + ?Sized>(&self, store: &S) -> Result<Profile> {
        self.auth_fetch_json(store, "/profile", RequestOptions::get())
            .await
    }

    /// Add a candidate to the ballot. Requires an administrator session.
    pub async fn add_candidate<S: TokenStore + ?Sized>(
        &self,
        store: &S,
        candidate: &Candidate,
    ) -> Result<AdminResponse<Candidate>> {
        self.auth_fetch_json(store, "/add-candidate", RequestOptions::post_json(candidate)?)
            .await
    }

    /// Set the voting window. Requires an administrator session.
    pub async fn set_voting_dates<S: TokenStore + ?Sized>(
        &self,
        store: &S,
        dates: &VotingDates,
    ) -> Result<AdminResponse<VotingDates>> {
        self.auth_fetch_json(store, "/set-dates", RequestOptions::post_json(dates)?)
            .await
    }

    async fn fetch_with_token(
        &self,
        token: &str,
        url: &str,
        options: RequestOptions,
    ) -> Result<serde_json::Value> {
        let url = self.normalize_url(url)?;
        let RequestOptions {
            method,
            mut headers,
            body,
        } = options;

        if headers.remove(AUTHORIZATION).is_some() {
            tracing::warn!("replacing caller-supplied Authorization header for {method} {url}");
        }

        tracing::debug!("{method} {url}");
        let mut request = self.http.request(method, url).headers(headers);
        request = match body {
            Some(RequestBody::Json(value)) => request.json(&value),
            Some(RequestBody::Form(fields)) => request.form(&fields),
            Some(RequestBody::Text(text)) => request.body(text),
            None => request,
        };

        let response = request.bearer_auth(token).send().await?;
        let status_code = response.status();

        if !status_code.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status_code,
                message: body.detail_message().map_or_else(
                    || format!("Request failed with status {}", status_code.as_u16()),
                    str::to_owned,
                ),
            });
        }

        Ok(response.json().await?)
    }

    fn normalize_url(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(self.base_url.join(url)?),
            Err(e) => Err(e.into()),
        }
    }
}

fn ensure_not_expired(expires_at: Option<time::OffsetDateTime>) -> Result<()> {
    match expires_at {
        Some(expires_at) if time::OffsetDateTime::now_utc() >= expires_at => {
            tracing::warn!("session token expired at {expires_at}");
            Err(Error::SessionExpired(expires_at))
        }
        _ => Ok(()),
    }
}
