//! In-process stand-in for the expense-tracker API.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use spendwise_core::auth::{MemoryTokenStore, TokenStore};
use spendwise_core::ApiClient;

pub const VALID_TOKEN: &str = "valid-token";
pub const VALID_PASSWORD: &str = "secret1";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
pub struct MockServer {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests().last().cloned().expect("no request recorded")
    }
}

pub fn expense_json(id: &str, amount: f64, category: &str, description: &str) -> Value {
    json!({
        "id": id,
        "user_id": "u1",
        "amount": amount,
        "category": category,
        "description": description,
        "original_prompt": format!("Spent {} on {}", amount, description),
        "created_at": "2024-01-05T10:30:00"
    })
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({"detail": "Invalid authentication credentials"}))
}

async fn handle(
    State(server): State<MockServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let authorization = header_str(header::AUTHORIZATION);
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    server.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        content_type: header_str(header::CONTENT_TYPE),
        body: body.clone(),
    });

    let field = |name: &str| {
        body.as_ref()
            .and_then(|b| b.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match (method.as_str(), uri.path()) {
        ("POST", "/auth/login") => {
            if field("password") == VALID_PASSWORD {
                reply(StatusCode::OK, json!({"access_token": VALID_TOKEN, "token_type": "bearer"}))
            } else {
                reply(StatusCode::UNAUTHORIZED, json!({"detail": "Incorrect username or password"}))
            }
        }
        ("POST", "/auth/signup") => match field("username").as_str() {
            "taken" => reply(StatusCode::BAD_REQUEST, json!({"detail": "Username already registered"})),
            "legacy" => reply(StatusCode::OK, json!({"token": "legacy-token"})),
            _ => reply(StatusCode::OK, json!({"message": "User created successfully", "user_id": "u2"})),
        },
        ("GET", "/slow") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            reply(StatusCode::OK, json!({}))
        }
        ("GET", "/broken") => (StatusCode::OK, "not json").into_response(),
        ("GET", "/boom") => (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response(),
        ("PUT", "/echo") => reply(StatusCode::OK, body.unwrap_or(Value::Null)),
        (_, path) if path.starts_with("/expenses") => {
            let expected = format!("Bearer {}", VALID_TOKEN);
            if authorization.as_deref() != Some(expected.as_str()) {
                return unauthorized();
            }
            expenses(&method, path, field("prompt"))
        }
        _ => reply(StatusCode::NOT_FOUND, json!({"detail": "Not Found"})),
    }
}

fn expenses(method: &Method, path: &str, prompt: String) -> Response {
    match (method.as_str(), path) {
        ("GET", "/expenses/") => reply(
            StatusCode::OK,
            json!([
                expense_json("e2", 40.0, "Transport", "auto"),
                expense_json("e1", 250.0, "Food", "groceries"),
            ]),
        ),
        ("POST", "/expenses/") => {
            let mut created = expense_json("e3", 250.0, "Food", "groceries");
            created["original_prompt"] = Value::String(prompt);
            reply(StatusCode::OK, created)
        }
        ("GET", "/expenses/categories") => reply(
            StatusCode::OK,
            json!([
                {"category": "Food", "total": 250.0, "count": 1},
                {"category": "Transport", "total": 40.0, "count": 1}
            ]),
        ),
        ("GET", "/expenses/monthly-summary") => reply(
            StatusCode::OK,
            json!([{"month": 1, "year": 2024, "total_amount": 290.0, "expense_count": 2, "unique_categories": 2}]),
        ),
        ("DELETE", "/expenses/e1") | ("DELETE", "/expenses/e2") => {
            reply(StatusCode::OK, json!({"message": "Expense deleted successfully"}))
        }
        ("DELETE", _) => reply(StatusCode::NOT_FOUND, json!({"detail": "Expense not found"})),
        _ => reply(StatusCode::NOT_FOUND, json!({"detail": "Not Found"})),
    }
}

/// Start the mock API on an ephemeral port and return its base URL
pub async fn spawn_server() -> (String, MockServer) {
    let server = MockServer::default();
    let app = Router::new().fallback(handle).with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), server)
}

/// Client against the mock API with a memory store holding `token`
pub async fn client_with_token(token: Option<&str>) -> (ApiClient, Arc<dyn TokenStore>, MockServer) {
    let (base_url, server) = spawn_server().await;
    let store: Arc<dyn TokenStore> = match token {
        Some(token) => Arc::new(MemoryTokenStore::with_token(token)),
        None => Arc::new(MemoryTokenStore::new()),
    };
    let client = ApiClient::with_base_url(&base_url, Duration::from_secs(2), store.clone()).unwrap();
    (client, store, server)
}
