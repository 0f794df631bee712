// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process stand-in for the hosted backend: token, sign-up and logout
//! endpoints plus the two tables, with switches to make each of them fail.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskearn::config::{Config, LogFormat};
use taskearn::AppContext;
use tokio::task::JoinHandle;

pub const ANON_KEY: &str = "test-anon-key";

#[allow(dead_code)]
pub const PASSWORD: &str = "correct horse";

struct Account {
    id: String,
    email: String,
    password: String,
}

/// Backend state and failure switches, shared with the handlers.
pub struct BackendState {
    accounts: Mutex<Vec<Account>>,
    /// access token -> user id
    access_tokens: Mutex<HashMap<String, String>>,
    /// refresh token -> user id
    refresh_tokens: Mutex<HashMap<String, String>>,
    next_token: AtomicUsize,

    pub offers: Mutex<Vec<Value>>,
    pub clicks: Mutex<Vec<Value>>,

    /// Lifetime of issued access tokens
    pub token_ttl_secs: AtomicI64,
    /// Sign-up returns a session instead of asking for confirmation
    pub autoconfirm: AtomicBool,

    pub fail_offers: AtomicBool,
    pub fail_count: AtomicBool,
    pub fail_insert: AtomicBool,

    pub offer_requests: AtomicUsize,
    pub count_requests: AtomicUsize,
    pub refresh_requests: AtomicUsize,
    pub logout_requests: AtomicUsize,
}

impl BackendState {
    fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            access_tokens: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            next_token: AtomicUsize::new(1),
            offers: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            token_ttl_secs: AtomicI64::new(3600),
            autoconfirm: AtomicBool::new(true),
            fail_offers: AtomicBool::new(false),
            fail_count: AtomicBool::new(false),
            fail_insert: AtomicBool::new(false),
            offer_requests: AtomicUsize::new(0),
            count_requests: AtomicUsize::new(0),
            refresh_requests: AtomicUsize::new(0),
            logout_requests: AtomicUsize::new(0),
        }
    }

    /// Register an account that can sign in with [`PASSWORD`].
    #[allow(dead_code)]
    pub fn add_user(&self, id: &str, email: &str) {
        self.accounts.lock().unwrap().push(Account {
            id: id.to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
        });
    }

    /// Add an offer row created `age_days` ago.
    #[allow(dead_code)]
    pub fn add_offer(&self, id: &str, active: bool, age_days: i64) {
        let created_at = chrono::Utc::now() - chrono::Duration::days(age_days);
        self.offers.lock().unwrap().push(json!({
            "id": id,
            "title": format!("Offer {id}"),
            "description": format!("Description of offer {id}"),
            "icon_url": null,
            "link": format!("https://partner.example.com/{id}"),
            "steps": ["Sign up", "Play for a week"],
            "terms": null,
            "is_active": active,
            "created_at": created_at.to_rfc3339(),
        }));
    }

    /// Seed `n` completion records for `user_id`.
    #[allow(dead_code)]
    pub fn add_clicks(&self, user_id: &str, n: usize) {
        let mut clicks = self.clicks.lock().unwrap();
        for i in 0..n {
            clicks.push(json!({
                "id": format!("seed-{user_id}-{i}"),
                "offer_id": "seeded",
                "user_id": user_id,
                "clicked_at": "2026-01-01T00:00:00.000Z",
            }));
        }
    }

    /// Invalidate every outstanding refresh token.
    #[allow(dead_code)]
    pub fn revoke_refresh_tokens(&self) {
        self.refresh_tokens.lock().unwrap().clear();
    }

    #[allow(dead_code)]
    pub fn clicks_for(&self, user_id: &str) -> Vec<Value> {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c["user_id"] == user_id)
            .cloned()
            .collect()
    }

    fn issue_session(&self, user_id: &str, email: &str) -> Value {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        self.access_tokens
            .lock()
            .unwrap()
            .insert(access.clone(), user_id.to_string());
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh.clone(), user_id.to_string());

        let ttl = self.token_ttl_secs.load(Ordering::SeqCst);
        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": ttl,
            "expires_at": chrono::Utc::now().timestamp() + ttl,
            "refresh_token": refresh,
            "user": { "id": user_id, "email": email, "aud": "authenticated" },
        })
    }

    fn email_of(&self, user_id: &str) -> String {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == user_id)
            .map(|a| a.email.clone())
            .unwrap_or_default()
    }

    /// User behind the bearer token, if it is a session token.
    fn caller(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get("authorization")?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.access_tokens.lock().unwrap().get(token).cloned()
    }
}

/// A running fake backend. The server stops when this is dropped.
pub struct FakeBackend {
    pub url: String,
    pub state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::new());
        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .route("/rest/v1/offers", get(list_offers))
            .route("/rest/v1/offer_clicks", get(count_clicks).post(insert_clicks))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("No local address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend failed");
        });

        Self {
            url: format!("http://{addr}"),
            state,
            server,
        }
    }

    /// Client configuration pointing at this backend.
    pub fn config(&self, session_file: Option<PathBuf>) -> Config {
        Config {
            supabase_url: self.url.clone(),
            anon_key: ANON_KEY.to_string(),
            session_file,
            http_timeout: Duration::from_secs(5),
            log_format: LogFormat::Pretty,
        }
    }

    /// Fully wired client without session persistence.
    #[allow(dead_code)]
    pub fn context(&self) -> AppContext {
        AppContext::new(self.config(None)).expect("Failed to build context")
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn auth_error(status: StatusCode, code: &str, description: &str) -> Response {
    (
        status,
        Json(json!({ "error": code, "error_description": description })),
    )
        .into_response()
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

async fn token(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_api_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }

    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            let user_id = state
                .accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.email == email && a.password == password)
                .map(|a| a.id.clone());
            match user_id {
                Some(id) => Json(state.issue_session(&id, email)).into_response(),
                None => auth_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "Invalid login credentials",
                ),
            }
        }
        Some("refresh_token") => {
            state.refresh_requests.fetch_add(1, Ordering::SeqCst);
            let presented = body["refresh_token"].as_str().unwrap_or_default();
            // Refresh tokens are single use.
            let user_id = state.refresh_tokens.lock().unwrap().remove(presented);
            match user_id {
                Some(id) => {
                    let email = state.email_of(&id);
                    Json(state.issue_session(&id, &email)).into_response()
                }
                None => auth_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "Invalid Refresh Token: Refresh Token Not Found",
                ),
            }
        }
        _ => error(StatusCode::BAD_REQUEST, "unsupported grant type"),
    }
}

async fn signup(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    if password.len() < 6 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "msg": "Password should be at least 6 characters" })),
        )
            .into_response();
    }

    let id = {
        let mut accounts = state.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.email == email) {
            return error(StatusCode::UNPROCESSABLE_ENTITY, "User already registered");
        }
        let id = format!("user-{}", accounts.len() + 1);
        accounts.push(Account {
            id: id.clone(),
            email: email.clone(),
            password,
        });
        id
    };

    if state.autoconfirm.load(Ordering::SeqCst) {
        Json(state.issue_session(&id, &email)).into_response()
    } else {
        Json(json!({ "id": id, "email": email, "confirmation_sent_at": "2026-01-01T00:00:00Z" }))
            .into_response()
    }
}

async fn logout(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.logout_requests.fetch_add(1, Ordering::SeqCst);
    match state.caller(&headers) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::UNAUTHORIZED, "invalid JWT"),
    }
}

async fn list_offers(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.offer_requests.fetch_add(1, Ordering::SeqCst);
    if !has_api_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    if state.fail_offers.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "offers unavailable");
    }

    let mut offers: Vec<Value> = state.offers.lock().unwrap().clone();
    if let Some(filter) = params.get("is_active") {
        let wanted = filter == "eq.true";
        offers.retain(|o| o["is_active"] == wanted);
    }
    match params.get("order").map(String::as_str) {
        Some("created_at.desc") => offers.sort_by(|a, b| {
            b["created_at"]
                .as_str()
                .cmp(&a["created_at"].as_str())
        }),
        Some("created_at.asc") => offers.sort_by(|a, b| {
            a["created_at"]
                .as_str()
                .cmp(&b["created_at"].as_str())
        }),
        _ => {}
    }
    Json(offers).into_response()
}

/// Serves both GET and HEAD; axum drops the body for HEAD.
async fn count_clicks(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.count_requests.fetch_add(1, Ordering::SeqCst);
    if state.fail_count.load(Ordering::SeqCst) {
        return error(StatusCode::SERVICE_UNAVAILABLE, "count unavailable");
    }
    let Some(caller) = state.caller(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "invalid JWT");
    };

    // Row-level policy: callers only ever see their own records.
    let requested = params
        .get("user_id")
        .and_then(|f| f.strip_prefix("eq."))
        .unwrap_or(caller.as_str())
        .to_string();
    let rows: Vec<Value> = if requested == caller {
        state.clicks_for(&caller)
    } else {
        Vec::new()
    };

    let exact = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("count=exact"));
    let range = if exact {
        format!("*/{}", rows.len())
    } else {
        "*/*".to_string()
    };

    let mut response = Json(rows).into_response();
    if let Ok(value) = HeaderValue::from_str(&range) {
        response.headers_mut().insert("content-range", value);
    }
    response
}

async fn insert_clicks(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(rows): Json<Vec<Value>>,
) -> Response {
    if state.fail_insert.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "insert failed");
    }
    let Some(caller) = state.caller(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "invalid JWT");
    };
    if rows.iter().any(|r| r["user_id"] != caller.as_str()) {
        return error(
            StatusCode::FORBIDDEN,
            "new row violates row-level security policy",
        );
    }

    let mut clicks = state.clicks.lock().unwrap();
    for mut row in rows {
        let id = format!("click-{}", clicks.len() + 1);
        row["id"] = Value::String(id);
        clicks.push(row);
    }
    StatusCode::CREATED.into_response()
}
