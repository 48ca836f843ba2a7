//! Full session lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives a `TodoSession` over
//! real HTTP through `UreqTransport`. Validates that request building,
//! response parsing and the reload-after-write flow work end-to-end.

use std::net::SocketAddr;

use mock_server::{CreateTodo, MockApi};
use chrono::Utc;
use todo_core::{
    AccountClient, AccountSession, ApiError, Category, DeleteOutcome, PasswordChange, Priority,
    StaticToken, SyncError, TodoClient, TodoSession, TokenFile, UreqTransport,
};

/// Serve `api` on a random local port from a background thread.
fn spawn_server(api: MockApi) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let router = api.router();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, router).await
        })
        .unwrap();
    });

    addr
}

fn session(addr: SocketAddr, token: &str) -> TodoSession<UreqTransport, StaticToken> {
    TodoSession::new(
        TodoClient::new(&format!("http://{addr}/api")),
        UreqTransport::new(),
        StaticToken::new(token),
    )
}

#[test]
fn session_lifecycle() {
    let addr = spawn_server(
        MockApi::new()
            .with_token("secret")
            .with_todo(CreateTodo::named("Item 1")),
    );
    let mut s = session(addr, "secret");

    // Step 1: load; the seed record is hidden.
    s.load().unwrap();
    assert!(s.list().is_empty(), "placeholder should be filtered out");

    // Step 2: blank add is skipped.
    s.draft_mut().name = "  ".to_string();
    assert!(matches!(s.add(), Err(SyncError::Validation(_))));

    // Step 3: add two todos.
    s.draft_mut().name = "Buy milk".to_string();
    s.draft_mut().category = Category::Personal;
    s.draft_mut().priority = Priority::Low;
    s.add().unwrap();
    assert_eq!(s.draft().name, "");
    assert_eq!(s.draft().category, Category::Work);

    s.draft_mut().name = "Walk dog".to_string();
    s.add().unwrap();
    assert_eq!(s.list().len(), 2);

    let milk = s.list().items()[0].clone();
    assert_eq!(milk.name, "Buy milk");
    assert_eq!(milk.category, Some(Category::Personal));
    assert_eq!(milk.priority, Some(Priority::Low));
    assert!(milk.due_date.is_none());

    // Step 4: search.
    let hits: Vec<_> = s.filtered("MILK").map(|t| t.id).collect();
    assert_eq!(hits, vec![milk.id]);

    // Step 5: toggle.
    s.toggle_complete(milk.id).unwrap();
    let toggled = s.list().get(milk.id).unwrap();
    assert!(toggled.is_complete);
    assert_eq!(toggled.name, milk.name);
    assert!(milk.created_at.is_some());
    assert_eq!(toggled.created_at, milk.created_at);

    // Step 6: edit, cancel, then edit and save.
    s.begin_edit(milk.id).unwrap();
    s.edit_mut().unwrap().name = "Discarded".to_string();
    assert!(s.cancel_edit());
    assert_eq!(s.list().get(milk.id).unwrap().name, "Buy milk");

    s.begin_edit(milk.id).unwrap();
    s.edit_mut().unwrap().name = "Buy oat milk".to_string();
    s.save_edit().unwrap();
    let edited = s.list().get(milk.id).unwrap();
    assert_eq!(edited.name, "Buy oat milk");
    assert!(edited.is_complete, "edit must not reset completion");

    // Step 7: delete, declined then confirmed.
    assert_eq!(s.delete(milk.id, |_| false).unwrap(), DeleteOutcome::Declined);
    assert_eq!(s.list().len(), 2);
    assert_eq!(s.delete(milk.id, |_| true).unwrap(), DeleteOutcome::Deleted);
    let names: Vec<_> = s.list().items().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Walk dog"]);
    assert!(s.error().is_none());
}

#[test]
fn wrong_token_surfaces_http_401_and_keeps_list() {
    let addr = spawn_server(MockApi::new().with_token("secret").with_todo(CreateTodo::named("Keep me")));

    let mut good = session(addr, "secret");
    good.load().unwrap();
    assert_eq!(good.list().len(), 1);

    let mut bad = session(addr, "stale");
    let err = bad.load().unwrap_err();
    assert!(matches!(err, SyncError::Api(ApiError::Http { status: 401, .. })));
    assert_eq!(bad.error(), Some("Failed to fetch todos: HTTP 401: Unauthorized"));
    assert!(bad.list().is_empty());
}

#[test]
fn stale_id_reports_not_found() {
    let addr = spawn_server(MockApi::new().with_todo(CreateTodo::named("Shared")));
    let mut first = session(addr, "t");
    let mut second = session(addr, "t");
    first.load().unwrap();
    second.load().unwrap();
    let id = first.list().items()[0].id;

    first.delete(id, |_| true).unwrap();
    let err = second.toggle_complete(id).unwrap_err();

    assert!(matches!(err, SyncError::Api(ApiError::Http { status: 404, .. })));
    assert_eq!(second.error(), Some("Failed to update: HTTP 404: Todo not found"));
    // Second session still shows its last good snapshot until it reloads.
    assert_eq!(second.list().len(), 1);
    second.load().unwrap();
    assert!(second.list().is_empty());
}

#[test]
fn unreachable_server_is_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut s = session(addr, "t");
    let err = s.load().unwrap_err();
    assert!(matches!(err, SyncError::Api(ApiError::Network(_))));
    assert!(s.error().unwrap().starts_with("Failed to fetch todos: network failure"));
}

#[test]
fn login_stores_token_that_todo_session_reads() {
    let addr = spawn_server(MockApi::new().with_token("not-handed-out"));
    let base = format!("http://{addr}/api");
    let dir = tempfile::tempdir().unwrap();
    let token_file = TokenFile::new(dir.path().join("token.json"));

    // Step 1: register and log in; the host keeps the token on disk.
    let mut account = AccountSession::new(AccountClient::new(&base), UreqTransport::new(), &token_file);
    account.register("ana", "hunter22").unwrap();
    let token = account.login("ana", "hunter22").unwrap();
    token_file.store(&token, Utc::now()).unwrap();

    // Step 2: the todo session picks the stored token up.
    let mut todos = TodoSession::new(TodoClient::new(&base), UreqTransport::new(), &token_file);
    todos.draft_mut().name = "Pay rent".to_string();
    todos.add().unwrap();
    assert_eq!(todos.list().len(), 1);

    // Step 3: profile round-trip and password change.
    account.update_full_name("Ana Lima").unwrap();
    let profile = account.fetch_profile().unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Ana Lima"));
    account
        .change_password(&PasswordChange {
            current_password: "hunter22".to_string(),
            new_password: "fresh-pass".to_string(),
            confirm_password: "fresh-pass".to_string(),
        })
        .unwrap();
    assert!(account.login("ana", "hunter22").is_err());
    assert!(account.login("ana", "fresh-pass").is_ok());

    // Step 4: logging out removes the token; nothing is sent after that.
    assert!(token_file.clear().unwrap());
    let err = todos.load().unwrap_err();
    assert!(matches!(err, SyncError::Api(ApiError::MissingToken)));
    assert_eq!(todos.list().len(), 1);
}
