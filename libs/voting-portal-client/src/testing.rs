//! In-process stand-in for the voting backend, used by tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::session::{test_support::jwt, Claims};
use crate::Client;

/// Expiry far enough out that tokens using it never expire during tests.
pub(crate) const FAR_FUTURE: i64 = 4_102_444_800;

#[derive(Debug, Default)]
pub(crate) struct StubState {
    /// Number of requests that reached a handler.
    pub(crate) hits: AtomicUsize,

    /// Holds `POST /login` for the `slow` voter until notified.
    pub(crate) release_slow_login: Notify,
}

pub(crate) struct StubServer {
    pub(crate) base_url: Url,
    pub(crate) state: Arc<StubState>,
}

impl StubServer {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/login", post(login))
            .route("/profile", get(profile))
            .route("/add-candidate", post(add_candidate))
            .route("/set-dates", post(set_dates))
            .route("/echo-auth", get(echo_auth))
            .route("/teapot", get(teapot))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/").parse().unwrap(),
            state,
        }
    }

    pub(crate) fn client(&self) -> Client {
        Client::new(self.base_url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    voter_id: String,
    password: String,
}

fn granted(voter_id: &str, role: &str) -> Response {
    Json(json!({
        "success": true,
        "token": jwt(voter_id, role, FAR_FUTURE),
        "role": role,
    }))
    .into_response()
}

async fn login(State(state): State<Arc<StubState>>, Form(form): Form<LoginForm>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match (form.voter_id.as_str(), form.password.as_str()) {
        ("admin-1", "pw") => granted("admin-1", "admin"),
        ("voter-1", "pw") | ("a&b=c d", "p%ss+w=rd&") => granted(&form.voter_id, "voter"),
        ("slow", _) => {
            state.release_slow_login.notified().await;
            granted("slow", "voter")
        }
        ("rejected", _) => Json(json!({ "success": false, "message": "Account locked" }))
            .into_response(),
        ("rejected-silent", _) => Json(json!({ "success": false })).into_response(),
        ("no-token", _) => Json(json!({ "success": true, "role": "voter" })).into_response(),
        ("broken", _) => (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
        ("html", _) => Html("<html>maintenance</html>").into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid voter ID or password" })),
        )
            .into_response(),
    }
}

fn claims(headers: &HeaderMap) -> Result<Claims, Response> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(Claims::decode)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Invalid authorization token" })),
            )
                .into_response()
        })
}

fn require_admin(headers: &HeaderMap) -> Result<Claims, Response> {
    let claims = claims(headers)?;
    if claims.role.as_deref() == Some("admin") {
        Ok(claims)
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "detail": "Admin privileges required" })),
        )
            .into_response())
    }
}

async fn profile(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match claims(&headers) {
        Ok(claims) => Json(json!({
            "message": format!(
                "Hello {}, your role is {}",
                claims.voter_id.unwrap_or_default(),
                claims.role.unwrap_or_default()
            )
        }))
        .into_response(),
        Err(response) => response,
    }
}

async fn add_candidate(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match require_admin(&headers) {
        Ok(_) => Json(json!({ "success": true, "message": "Candidate added", "data": payload }))
            .into_response(),
        Err(response) => response,
    }
}

async fn set_dates(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match require_admin(&headers) {
        Ok(_) => Json(json!({ "success": true, "message": "Voting dates set", "data": payload }))
            .into_response(),
        Err(response) => response,
    }
}

async fn echo_auth(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let values: Vec<&str> = headers
        .get_all(AUTHORIZATION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    Json(json!({ "authorization": values }))
}

async fn teapot(State(state): State<Arc<StubState>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::IM_A_TEAPOT, "<html>short and stout</html>").into_response()
}
