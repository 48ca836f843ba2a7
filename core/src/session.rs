//! Mutation operations over a `TodoList`, kept in step with the server.
//!
//! # Design
//! Every write goes idle -> in flight -> settled. A successful write is
//! always followed by a full `load()`, and the list is only ever replaced
//! from a successful `load()`. Nothing is patched locally, so what the host
//! displays is always some past server snapshot and never a guess.
//!
//! Operations take `&mut self` and block until the server has answered: a
//! session runs one operation at a time, so overlapping writes on the same
//! session cannot interleave. A host that shows a loading indicator learns
//! about each transition through the observer set with
//! `with_status_observer`, which is called as the operation starts and again
//! as it settles. Failures are turned into a message kept on the session for
//! display; the list stays at its last good snapshot.

use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::TodoClient;
use crate::error::{ApiError, SyncError, ValidationSkip};
use crate::http::{HttpRequest, HttpResponse};
use crate::list::{Filtered, TodoList};
use crate::token::TokenSource;
use crate::transport::Transport;
use crate::types::{NewTodo, TodoItem};

/// The operation a session is running or last ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Load,
    Add,
    Edit,
    Delete,
    Toggle,
}

impl Op {
    fn failure_prefix(self) -> &'static str {
        match self {
            Op::Load => "Failed to fetch todos",
            Op::Add => "Failed to add todo",
            Op::Edit => "Failed to update todo",
            Op::Delete => "Failed to delete todo",
            Op::Toggle => "Failed to update",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Op::Load => "load",
            Op::Add => "add",
            Op::Edit => "edit",
            Op::Delete => "delete",
            Op::Toggle => "toggle",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Idle,
    InFlight(Op),
    Succeeded(Op),
    Failed(Op),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirm step said no. Nothing was sent.
    Declined,
}

/// Called with every status transition of a session.
pub type StatusObserver = Box<dyn FnMut(OpStatus)>;

/// Holds the todo list for one user and runs operations against the API.
pub struct TodoSession<T, S> {
    client: TodoClient,
    transport: T,
    tokens: S,
    list: TodoList,
    draft: NewTodo,
    editing: Option<TodoItem>,
    error: Option<String>,
    status: OpStatus,
    observer: Option<StatusObserver>,
}

impl<T: Transport, S: TokenSource> TodoSession<T, S> {
    pub fn new(client: TodoClient, transport: T, tokens: S) -> Self {
        Self {
            client,
            transport,
            tokens,
            list: TodoList::new(),
            draft: NewTodo::default(),
            editing: None,
            error: None,
            status: OpStatus::Idle,
            observer: None,
        }
    }

    /// Report every `InFlight` and settled status to `observer` while the
    /// operation runs.
    pub fn with_status_observer(mut self, observer: impl FnMut(OpStatus) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn list(&self) -> &TodoList {
        &self.list
    }

    pub fn filtered<'a>(&'a self, query: &str) -> Filtered<'a> {
        self.list.filtered(query)
    }

    /// The message of the last failed operation, cleared when the next one
    /// starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> OpStatus {
        self.status
    }

    pub fn draft(&self) -> &NewTodo {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NewTodo {
        &mut self.draft
    }

    /// The record being edited, with any edits accumulated so far.
    pub fn editing(&self) -> Option<&TodoItem> {
        self.editing.as_ref()
    }

    pub fn edit_mut(&mut self) -> Option<&mut TodoItem> {
        self.editing.as_mut()
    }

    /// Fetch the full collection and replace the local list with it.
    ///
    /// On failure the previously loaded items stay in place.
    pub fn load(&mut self) -> Result<(), SyncError> {
        self.begin(Op::Load);
        let result = self.call(
            |client, token| Ok(client.build_list_todos(token)),
            |client, response| client.parse_list_todos(response),
        );
        let snapshot = self.settle(Op::Load, result)?;
        self.list.replace(snapshot);
        debug!(count = self.list.len(), "todo list replaced");
        Ok(())
    }

    /// Submit the add form. A blank name is rejected without a request.
    ///
    /// On success the form resets to its defaults and the list reloads; on
    /// failure the form keeps what was typed.
    pub fn add(&mut self) -> Result<(), SyncError> {
        if self.draft.is_blank() {
            debug!("add skipped: blank name");
            return Err(ValidationSkip::BlankName.into());
        }
        let item = self.draft.to_item(Utc::now());
        self.begin(Op::Add);
        let result = self.call(
            |client, token| client.build_create_todo(token, &item),
            |client, response| client.parse_create_todo(response),
        );
        self.settle(Op::Add, result)?;
        self.draft = NewTodo::default();
        self.load()
    }

    /// Delete `id` once `confirm` agrees. Declining sends nothing.
    ///
    /// The item is not removed locally; it disappears with the reload.
    pub fn delete<F>(&mut self, id: i64, confirm: F) -> Result<DeleteOutcome, SyncError>
    where
        F: FnOnce(&TodoItem) -> bool,
    {
        let item = self.list.get(id).ok_or(ValidationSkip::UnknownId(id))?;
        if !confirm(item) {
            debug!(id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        self.begin(Op::Delete);
        let result = self.call(
            |client, token| Ok(client.build_delete_todo(token, id)),
            |client, response| client.parse_delete_todo(response),
        );
        self.settle(Op::Delete, result)?;
        self.load()?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Enter edit mode for `id` with a copy of its current record.
    ///
    /// Starting an edit replaces any edit already in progress.
    pub fn begin_edit(&mut self, id: i64) -> Result<(), SyncError> {
        let item = self.list.get(id).ok_or(ValidationSkip::UnknownId(id))?;
        self.editing = Some(item.clone());
        Ok(())
    }

    /// Leave edit mode, dropping accumulated edits. Returns whether an edit
    /// was in progress.
    pub fn cancel_edit(&mut self) -> bool {
        self.editing.take().is_some()
    }

    /// PUT the accumulated record. On success leave edit mode and reload; on
    /// failure stay in edit mode so the user can retry.
    pub fn save_edit(&mut self) -> Result<(), SyncError> {
        let item = self.editing.clone().ok_or(ValidationSkip::NotEditing)?;
        if item.name.trim().is_empty() {
            debug!(id = item.id, "save skipped: blank name");
            return Err(ValidationSkip::BlankName.into());
        }
        self.begin(Op::Edit);
        let result = self.call(
            |client, token| client.build_update_todo(token, &item),
            |client, response| client.parse_update_todo(response),
        );
        self.settle(Op::Edit, result)?;
        self.editing = None;
        self.load()
    }

    /// PUT `id` with `is_complete` flipped. The list only changes once the
    /// reload confirms it.
    pub fn toggle_complete(&mut self, id: i64) -> Result<(), SyncError> {
        let item = self.list.get(id).ok_or(ValidationSkip::UnknownId(id))?.toggled();
        self.begin(Op::Toggle);
        let result = self.call(
            |client, token| client.build_update_todo(token, &item),
            |client, response| client.parse_update_todo(response),
        );
        self.settle(Op::Toggle, result)?;
        self.load()
    }

    fn begin(&mut self, op: Op) {
        self.error = None;
        self.set_status(OpStatus::InFlight(op));
        debug!(%op, "operation started");
    }

    fn set_status(&mut self, status: OpStatus) {
        self.status = status;
        if let Some(observer) = self.observer.as_mut() {
            observer(status);
        }
    }

    /// One round-trip: read the token, build, execute, parse.
    fn call<R, B, P>(&self, build: B, parse: P) -> Result<R, ApiError>
    where
        B: FnOnce(&TodoClient, &str) -> Result<HttpRequest, ApiError>,
        P: FnOnce(&TodoClient, HttpResponse) -> Result<R, ApiError>,
    {
        let token = self.tokens.token().ok_or(ApiError::MissingToken)?;
        let request = build(&self.client, &token)?;
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "response received");
        parse(&self.client, response)
    }

    fn settle<R>(&mut self, op: Op, result: Result<R, ApiError>) -> Result<R, SyncError> {
        match result {
            Ok(value) => {
                self.set_status(OpStatus::Succeeded(op));
                info!(%op, "operation succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(%op, error = %err, "operation failed");
                self.error = Some(format!("{}: {err}", op.failure_prefix()));
                self.set_status(OpStatus::Failed(op));
                Err(err.into())
            }
        }
    }
}

impl<T, S> fmt::Debug for TodoSession<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoSession")
            .field("client", &self.client)
            .field("list", &self.list)
            .field("draft", &self.draft)
            .field("editing", &self.editing)
            .field("error", &self.error)
            .field("status", &self.status)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
