//! In-process stub of the Nexus backend for integration tests.
//!
//! Implements the auth, healthdata and ai endpoints over in-memory state and
//! binds to an ephemeral port. Insight responses can be delayed to set up
//! out-of-order arrivals.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use nexus_client::{ClientConfig, NexusClient, Session};
use nexus_core::validation::RegistrationForm;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

pub const EMAIL: &str = "user@test.com";
pub const PASSWORD: &str = "secret1";

/// Client logs go to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const FIXED_TIMESTAMP: &str = "2025-03-16T12:00:00";

struct User {
    id: u64,
    password: String,
}

struct StoredEntry {
    id: i64,
    owner: u64,
    weight: f64,
    bp: String,
    glucose: f64,
}

impl StoredEntry {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "weight": self.weight,
            "bp": self.bp,
            "glucose": self.glucose,
            "timestamp": FIXED_TIMESTAMP,
        })
    }
}

#[derive(Default)]
struct Backend {
    users: HashMap<String, User>,
    tokens: HashMap<String, u64>,
    entries: Vec<StoredEntry>,
    next_user_id: u64,
    next_entry_id: i64,
    insight_delays: VecDeque<Duration>,
    insight_calls: u64,
    list_delays: VecDeque<Duration>,
    list_failures: u32,
}

type Shared = Arc<Mutex<Backend>>;

/// Error body in the backend's `{"detail": ...}` shape.
struct ApiError(StatusCode, &'static str);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, Backend> {
    state.lock().expect("stub state poisoned")
}

fn current_user(headers: &HeaderMap, backend: &Backend) -> Result<u64, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(ApiError(StatusCode::UNAUTHORIZED, "Token missing"))?;
    backend
        .tokens
        .get(token)
        .copied()
        .ok_or(ApiError(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct EntryBody {
    weight: f64,
    bp: String,
    glucose: f64,
}

async fn register(
    State(state): State<Shared>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    if body.first_name.is_empty() || body.last_name.is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "Name is required"));
    }
    if backend.users.contains_key(&body.email) {
        return Err(ApiError(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    backend.next_user_id += 1;
    let id = backend.next_user_id;
    backend.users.insert(
        body.email,
        User {
            id,
            password: body.password,
        },
    );
    Ok(Json(json!({ "message": "User registered successfully" })))
}

async fn login(
    State(state): State<Shared>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let user_id = match backend.users.get(&body.email) {
        Some(user) if user.password == body.password => user.id,
        _ => return Err(ApiError(StatusCode::UNAUTHORIZED, "Invalid email or password")),
    };
    let token: String = rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    backend.tokens.insert(token.clone(), user_id);
    Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
}

async fn list_entries(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let (entries, delay, fail) = {
        let mut backend = lock(&state);
        let user = current_user(&headers, &backend)?;
        let entries: Vec<Value> = backend
            .entries
            .iter()
            .filter(|e| e.owner == user)
            .map(StoredEntry::to_json)
            .collect();
        let delay = backend.list_delays.pop_front().unwrap_or_default();
        let fail = backend.list_failures > 0;
        if fail {
            backend.list_failures -= 1;
        }
        (entries, delay, fail)
    };
    tokio::time::sleep(delay).await;
    if fail {
        return Err(ApiError(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"));
    }
    Ok(Json(Value::Array(entries)))
}

async fn create_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<EntryBody>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let owner = current_user(&headers, &backend)?;
    backend.next_entry_id += 1;
    let id = backend.next_entry_id;
    backend.entries.push(StoredEntry {
        id,
        owner,
        weight: body.weight,
        bp: body.bp,
        glucose: body.glucose,
    });
    Ok(Json(json!({ "message": "Health data recorded", "data_id": id })))
}

async fn update_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<EntryBody>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let owner = current_user(&headers, &backend)?;
    let entry = backend
        .entries
        .iter_mut()
        .find(|e| e.id == id && e.owner == owner)
        .ok_or(ApiError(StatusCode::NOT_FOUND, "Health data not found"))?;
    entry.weight = body.weight;
    entry.bp = body.bp;
    entry.glucose = body.glucose;
    Ok(Json(entry.to_json()))
}

async fn delete_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut backend = lock(&state);
    let owner = current_user(&headers, &backend)?;
    let before = backend.entries.len();
    backend.entries.retain(|e| !(e.id == id && e.owner == owner));
    if backend.entries.len() == before {
        return Err(ApiError(StatusCode::NOT_FOUND, "Health data not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn insights(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let (text, delay) = {
        let mut backend = lock(&state);
        let user = current_user(&headers, &backend)?;
        backend.insight_calls += 1;
        let call = backend.insight_calls;
        let count = backend.entries.iter().filter(|e| e.owner == user).count();
        let delay = backend.insight_delays.pop_front().unwrap_or_default();
        let text = if count == 0 {
            "No health data found to generate insights.".to_string()
        } else {
            format!("Insight #{call} over {count} entries")
        };
        (text, delay)
    };
    tokio::time::sleep(delay).await;
    Ok(Json(json!({ "insights": text })))
}

/// Running stub backend.
#[derive(Clone)]
pub struct StubServer {
    pub addr: SocketAddr,
    state: Shared,
}

impl StubServer {
    pub async fn start() -> Self {
        init_tracing();
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/healthdata/", post(create_entry).get(list_entries))
            .route("/healthdata/{id}", put(update_entry).delete(delete_entry))
            .route("/ai/", post(insights))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self { addr, state }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&format!("http://{}", self.addr)).expect("stub url")
    }

    pub fn client(&self) -> NexusClient {
        NexusClient::new(&self.config()).expect("client")
    }

    /// Delay the next insight response by `delay`.
    pub fn push_insight_delay(&self, delay: Duration) {
        lock(&self.state).insight_delays.push_back(delay);
    }

    pub fn insight_calls(&self) -> u64 {
        lock(&self.state).insight_calls
    }

    /// Delay the next entry listing by `delay`.
    pub fn push_list_delay(&self, delay: Duration) {
        lock(&self.state).list_delays.push_back(delay);
    }

    /// Answer the next `count` entry listings with a 500.
    pub fn fail_next_lists(&self, count: u32) {
        lock(&self.state).list_failures += count;
    }

    pub fn entry_count(&self) -> usize {
        lock(&self.state).entries.len()
    }

    /// Forget every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        lock(&self.state).tokens.clear();
    }
}

pub fn registration(email: &str, password: &str) -> RegistrationForm {
    RegistrationForm {
        first_name: "Test".into(),
        last_name: "User".into(),
        email: email.into(),
        password: password.into(),
        confirm_password: password.into(),
    }
}

/// Register `user@test.com` and log in.
pub async fn signed_in(server: &StubServer) -> (NexusClient, Session) {
    let client = server.client();
    let session = sign_up(&client, EMAIL).await;
    (client, session)
}

/// Register `email` with the shared test password and log in on `client`.
pub async fn sign_up(client: &NexusClient, email: &str) -> Session {
    client
        .sessions
        .register(&registration(email, PASSWORD))
        .await
        .expect("register");
    client.sessions.login(email, PASSWORD).await.expect("login")
}
