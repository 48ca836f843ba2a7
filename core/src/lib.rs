//! Client-side synchronization for a remote todo API.
//!
//! # Overview
//! Keeps a local list of todo items that mirrors the server and runs add,
//! edit, delete and toggle operations against it. After every successful
//! write the whole list is fetched again, so local state never drifts from
//! the server by more than one round trip.
//!
//! # Design
//! - `TodoClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. It never touches the network.
//! - A `Transport` performs the round-trip (`UreqTransport` by default), and
//!   a `TokenSource` supplies the bearer token at call time.
//! - `TodoSession` owns the `TodoList` and is the only thing that writes it.
//! - `ProfileImageStore` is the host-wide profile image, passed around
//!   explicitly.
//! - `AccountSession` covers register, login and the profile endpoints; the
//!   token it hands back is kept by the host, typically in a `TokenFile`.

pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod list;
pub mod profile;
pub mod session;
pub mod token;
pub mod transport;
pub mod types;

pub use account::{AccountClient, AccountSession, PasswordChange, Profile};
pub use client::TodoClient;
pub use config::ClientConfig;
pub use error::{ApiError, SyncError, ValidationSkip};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use list::{Filtered, TodoList};
pub use profile::{FileStorage, MemoryStorage, ProfileError, ProfileImageStore, ProfileStorage};
pub use session::{DeleteOutcome, Op, OpStatus, StatusObserver, TodoSession};
pub use token::{EnvToken, Fallback, StaticToken, TokenFile, TokenFileError, TokenSource};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{format_display_date, Category, NewTodo, Priority, TodoItem};
