//! In-memory imitation of the TalentLMS `/api/v1` endpoints the client's
//! integration tests exercise.
//!
//! Requests must carry `Authorization: Basic base64(api_key ":" ...)`.
//! Failures are answered with the service's error envelope
//! `{"error": {"type": ..., "message": ...}}` and a 4xx status.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const INVALID_API_KEY: &str = "Invalid API key provided";
pub const INVALID_ARGUMENTS: &str = "Invalid arguments provided";
pub const UNKNOWN_ACTION: &str = "The requested API action does not exist";
pub const USER_NOT_FOUND: &str = "The requested user does not exist";
pub const DUPLICATE_EMAIL: &str = "A user with the same email address already exists";
pub const DUPLICATE_LOGIN: &str = "A user with the same login already exists";
pub const WRONG_PASSWORD: &str =
    "Your login or password is incorrect. Please try again, making sure that CAPS LOCK key is off";
pub const WEAK_PASSWORD: &str = "Password is not strong enough (should have at least (1) upper case letter, at least (1) lower case letter, at least (1) number, at least (8) characters in length)";

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(flatten)]
    pub custom_fields: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct Store {
    api_key: String,
    next_id: u64,
    users: BTreeMap<u64, User>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app(api_key: impl Into<String>) -> Router {
    let db: Db = Arc::new(RwLock::new(Store {
        api_key: api_key.into(),
        next_id: 1,
        users: BTreeMap::new(),
    }));

    Router::new()
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users/{filter}", get(find_user))
        .route("/api/v1/user/signup", post(signup))
        .route("/api/v1/userlogin", post(user_login))
        .route("/api/v1/deleteuser", post(delete_user))
        .route("/api/v1/usersetstatus/{filter}", get(set_status))
        .route("/api/v1/siteinfo", get(site_info))
        .route("/api/v1/ratelimit", get(rate_limit))
        .fallback(unknown_action)
        .layer(middleware::from_fn_with_state(db.clone(), require_api_key))
        .with_state(db)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

fn envelope(status: StatusCode, message: &str) -> Response {
    let body = json!({"error": {"type": "invalid_request_error", "message": message}});
    (status, Json(body)).into_response()
}

async fn require_api_key(State(db): State<Db>, request: Request, next: Next) -> Response {
    let username = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| base64_simd::STANDARD.decode_to_vec(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|credentials| credentials.split_once(':').map(|(user, _)| user.to_string()));

    let authorized = match username {
        Some(username) => db.read().await.api_key == username,
        None => false,
    };
    if !authorized {
        return envelope(StatusCode::FORBIDDEN, INVALID_API_KEY);
    }
    next.run(request).await
}

/// Parse the `name:value,name:value` read-parameter segment.
pub fn parse_filter(segment: &str) -> HashMap<String, String> {
    segment
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(key, value)| (key.to_string(), value.replace('+', " ")))
        .collect()
}

fn field<'a>(form: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    form.get(name).map(String::as_str).filter(|value| !value.is_empty())
}

fn strong_enough(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let store = db.read().await;
    Json(store.users.values().cloned().collect())
}

async fn find_user(State(db): State<Db>, Path(filter): Path<String>) -> Response {
    let filter = parse_filter(&filter);
    let store = db.read().await;
    let found = store.users.values().find(|user| {
        filter.get("id").is_some_and(|id| *id == user.id.to_string())
            || filter.get("email").is_some_and(|email| *email == user.email)
            || filter.get("username").is_some_and(|login| *login == user.login)
    });
    match found {
        Some(user) => Json(user.clone()).into_response(),
        None => envelope(StatusCode::NOT_FOUND, USER_NOT_FOUND),
    }
}

const SIGNUP_FIELDS: [&str; 5] = ["first_name", "last_name", "email", "login", "password"];

async fn signup(State(db): State<Db>, Form(form): Form<HashMap<String, String>>) -> Response {
    if SIGNUP_FIELDS.iter().any(|name| field(&form, name).is_none()) {
        return envelope(StatusCode::BAD_REQUEST, INVALID_ARGUMENTS);
    }
    let mut form = form;
    let mut take = |name: &str| form.remove(name).unwrap_or_default();
    let (first_name, last_name, email, login, password) = (
        take("first_name"),
        take("last_name"),
        take("email"),
        take("login"),
        take("password"),
    );

    if !strong_enough(&password) {
        return envelope(StatusCode::BAD_REQUEST, WEAK_PASSWORD);
    }

    let mut store = db.write().await;
    if store.users.values().any(|user| user.email == email) {
        return envelope(StatusCode::BAD_REQUEST, DUPLICATE_EMAIL);
    }
    if store.users.values().any(|user| user.login == login) {
        return envelope(StatusCode::BAD_REQUEST, DUPLICATE_LOGIN);
    }

    let id = store.next_id;
    store.next_id += 1;
    let custom_fields = form
        .into_iter()
        .filter(|(key, _)| key.starts_with("custom_field_"))
        .collect();
    let user = User {
        id,
        login,
        first_name,
        last_name,
        email,
        status: "active".to_string(),
        password,
        custom_fields,
    };
    store.users.insert(id, user.clone());
    Json(user).into_response()
}

async fn user_login(State(db): State<Db>, Form(form): Form<HashMap<String, String>>) -> Response {
    let (Some(login), Some(password)) = (field(&form, "login"), field(&form, "password")) else {
        return envelope(StatusCode::BAD_REQUEST, INVALID_ARGUMENTS);
    };

    let store = db.read().await;
    let Some(user) = store.users.values().find(|user| user.login == login) else {
        return envelope(StatusCode::NOT_FOUND, USER_NOT_FOUND);
    };
    if user.password != password {
        return envelope(StatusCode::BAD_REQUEST, WRONG_PASSWORD);
    }

    Json(json!({
        "user_id": user.id.to_string(),
        "login_key": format!("http://localhost/index/autologin/key:{}", Uuid::new_v4().simple()),
    }))
    .into_response()
}

async fn delete_user(State(db): State<Db>, Form(form): Form<HashMap<String, String>>) -> Response {
    let Some(id) = field(&form, "user_id").and_then(|id| id.parse::<u64>().ok()) else {
        return envelope(StatusCode::BAD_REQUEST, INVALID_ARGUMENTS);
    };
    match db.write().await.users.remove(&id) {
        Some(_) => Json(json!({"message": "Operation completed successfully"})).into_response(),
        None => envelope(StatusCode::NOT_FOUND, USER_NOT_FOUND),
    }
}

async fn set_status(State(db): State<Db>, Path(filter): Path<String>) -> Response {
    let filter = parse_filter(&filter);
    let id = filter.get("user_id").and_then(|id| id.parse::<u64>().ok());
    let status = filter.get("status").filter(|s| *s == "active" || *s == "inactive");
    let (Some(id), Some(status)) = (id, status) else {
        return envelope(StatusCode::BAD_REQUEST, INVALID_ARGUMENTS);
    };

    let mut store = db.write().await;
    match store.users.get_mut(&id) {
        Some(user) => {
            user.status = status.clone();
            Json(json!({"user_id": id.to_string(), "status": status})).into_response()
        }
        None => envelope(StatusCode::NOT_FOUND, USER_NOT_FOUND),
    }
}

async fn site_info(State(db): State<Db>) -> Json<Value> {
    let total_users = db.read().await.users.len();
    Json(json!({
        "total_users": total_users.to_string(),
        "total_courses": "0",
        "total_categories": "0",
        "total_groups": "0",
        "total_branches": "0",
        "monthly_active_users": 0,
        "signup_method": "manual",
        "paypal_email": "",
        "domain_map": "",
        "date_format": "DDMMYYYY",
    }))
}

async fn rate_limit() -> Json<Value> {
    Json(json!({"limit": "2000", "remaining": "1999", "reset": "1598371200", "formatted_reset": "25/08/2020, 16:00:00"}))
}

async fn unknown_action() -> Response {
    envelope(StatusCode::BAD_REQUEST, UNKNOWN_ACTION)
}
