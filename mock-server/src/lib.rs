use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub name: String,
    pub is_complete: bool,
    pub category: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// POST body. The client's `id` is ignored; the server assigns one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub name: String,
    #[serde(default)]
    pub is_complete: bool,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CreateTodo {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_complete: false,
            category: None,
            priority: None,
            due_date: None,
            created_at: None,
        }
    }
}

/// PUT body. Fields that are present replace the stored ones; `createdAt`
/// is never changed. An explicit `"dueDate": null` clears the due date.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodo {
    pub name: Option<String>,
    pub is_complete: Option<bool>,
    pub category: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

type Failure = (StatusCode, Json<Message>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (
        status,
        Json(Message {
            message: message.to_string(),
        }),
    )
}

#[derive(Debug, Default)]
pub struct Store {
    todos: BTreeMap<i64, Todo>,
    last_id: i64,
}

impl Store {
    fn insert(&mut self, input: CreateTodo) -> Todo {
        self.last_id += 1;
        let todo = Todo {
            id: self.last_id,
            name: input.name,
            is_complete: input.is_complete,
            category: input.category.unwrap_or_else(|| "Work".to_string()),
            priority: input.priority.unwrap_or_else(|| "Medium".to_string()),
            due_date: input.due_date.filter(|d| !d.is_empty()),
            created_at: input.created_at.unwrap_or_else(Utc::now),
        };
        self.todos.insert(todo.id, todo.clone());
        todo
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub token: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOutput {
    pub username: String,
    pub full_name: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullNameInput {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordInput {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    full_name: String,
    profile_image: Option<String>,
}

/// Registered users and the tokens issued to them by login.
#[derive(Debug, Default)]
pub struct Accounts {
    users: BTreeMap<String, Account>,
    sessions: HashMap<String, String>,
    issued: u64,
}

impl Accounts {
    fn register(&mut self, username: &str, password: &str) -> bool {
        if self.users.contains_key(username) {
            return false;
        }
        self.users.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                full_name: String::new(),
                profile_image: None,
            },
        );
        true
    }

    fn login(&mut self, username: &str, password: &str) -> Option<String> {
        let account = self.users.get(username)?;
        if account.password != password {
            return None;
        }
        self.issued += 1;
        let token = format!("mock-{}-{username}", self.issued);
        self.sessions.insert(token.clone(), username.to_string());
        Some(token)
    }

    fn profile(&self, username: &str) -> Option<ProfileOutput> {
        let account = self.users.get(username)?;
        Some(ProfileOutput {
            username: username.to_string(),
            full_name: account.full_name.clone(),
            profile_image: account.profile_image.clone(),
        })
    }
}

#[derive(Clone)]
struct AppState {
    db: Db,
    accounts: Arc<RwLock<Accounts>>,
    token: Option<Arc<str>>,
}

/// Builder for a mock todo API, optionally pre-seeded and locked to a token.
#[derive(Debug, Default)]
pub struct MockApi {
    store: Store,
    accounts: Accounts,
    token: Option<String>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept this exact bearer token, or one issued by login. Without
    /// it any non-blank token is accepted.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_todo(mut self, input: CreateTodo) -> Self {
        self.store.insert(input);
        self
    }

    /// Register a user that can log in straight away.
    pub fn with_account(mut self, username: &str, password: &str) -> Self {
        self.accounts.register(username, password);
        self
    }

    pub fn router(self) -> Router {
        let state = AppState {
            db: Arc::new(RwLock::new(self.store)),
            accounts: Arc::new(RwLock::new(self.accounts)),
            token: self.token.map(Arc::from),
        };
        let open = Router::new()
            .route("/api/account/register", post(register))
            .route("/api/account/login", post(login));
        Router::new()
            .route("/api/todo", get(list_todos).post(create_todo))
            .route("/api/todo/{id}", put(update_todo).delete(delete_todo))
            .route("/api/account/profile", get(get_profile).put(update_profile))
            .route("/api/account/change-password", put(change_password))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
            .merge(open)
            .with_state(state)
    }
}

pub fn app() -> Router {
    MockApi::new().router()
}

pub fn app_with_token(token: &str) -> Router {
    MockApi::new().with_token(token).router()
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "undefined")
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = match (bearer(request.headers()), state.token.as_deref()) {
        (None, _) => false,
        (Some(given), Some(expected)) => {
            given == expected || state.accounts.read().await.sessions.contains_key(given)
        }
        (Some(_), None) => true,
    };
    if !authorized {
        tracing::warn!(path = %request.uri().path(), "rejected request without valid bearer token");
        return failure(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(request).await
}

/// The user a login token was issued to.
async fn session_user(state: &AppState, headers: &HeaderMap) -> Result<String, Failure> {
    let token = bearer(headers).unwrap_or_default();
    let username = state.accounts.read().await.sessions.get(token).cloned();
    username.ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Token does not belong to a logged-in user"))
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<Message>, Failure> {
    let username = input.username.trim();
    if username.is_empty() || input.password_hash.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Username and password are required"));
    }
    if !state.accounts.write().await.register(username, &input.password_hash) {
        return Err(failure(StatusCode::BAD_REQUEST, "Username is already taken"));
    }
    tracing::info!(username, "account registered");
    Ok(Json(Message {
        message: "User registered successfully".to_string(),
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginOutput>, Failure> {
    let token = state
        .accounts
        .write()
        .await
        .login(input.username.trim(), &input.password)
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid username or password"))?;
    tracing::info!(username = %input.username.trim(), "logged in");
    Ok(Json(LoginOutput { token }))
}

async fn get_profile(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<ProfileOutput>, Failure> {
    let username = session_user(&state, &headers).await?;
    let profile = state.accounts.read().await.profile(&username);
    profile
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Profile not found"))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<FullNameInput>,
) -> Result<Json<ProfileOutput>, Failure> {
    let username = session_user(&state, &headers).await?;
    let full_name = input.full_name.trim();
    if full_name.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Full name is required"));
    }
    let mut accounts = state.accounts.write().await;
    let account = accounts
        .users
        .get_mut(&username)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Profile not found"))?;
    account.full_name = full_name.to_string();
    let profile = accounts
        .profile(&username)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Profile not found"))?;
    Ok(Json(profile))
}

async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PasswordInput>,
) -> Result<Json<Message>, Failure> {
    let username = session_user(&state, &headers).await?;
    if input.new_password != input.confirm_password {
        return Err(failure(StatusCode::BAD_REQUEST, "Passwords do not match"));
    }
    let mut accounts = state.accounts.write().await;
    let account = accounts
        .users
        .get_mut(&username)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Profile not found"))?;
    if account.password != input.current_password {
        return Err(failure(StatusCode::BAD_REQUEST, "Current password is incorrect"));
    }
    account.password = input.new_password;
    tracing::info!(%username, "password changed");
    Ok(Json(Message {
        message: "Password changed successfully".to_string(),
    }))
}

async fn list_todos(State(state): State<AppState>) -> Json<Vec<Todo>> {
    let store = state.db.read().await;
    Json(store.todos.values().cloned().collect())
}

async fn create_todo(
    State(state): State<AppState>,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), Failure> {
    if input.name.trim().is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Name is required"));
    }
    let todo = state.db.write().await.insert(input);
    tracing::info!(id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, Failure> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(failure(StatusCode::BAD_REQUEST, "Name is required"));
    }
    let mut store = state.db.write().await;
    let todo = store
        .todos
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Todo not found"))?;
    if let Some(name) = input.name {
        todo.name = name;
    }
    if let Some(is_complete) = input.is_complete {
        todo.is_complete = is_complete;
    }
    if let Some(category) = input.category {
        todo.category = category;
    }
    if let Some(priority) = input.priority {
        todo.priority = priority;
    }
    if let Some(due_date) = input.due_date {
        todo.due_date = due_date.filter(|d| !d.is_empty());
    }
    tracing::info!(id, "todo updated");
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Failure> {
    let mut store = state.db.write().await;
    store
        .todos
        .remove(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Todo not found"))?;
    tracing::info!(id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
