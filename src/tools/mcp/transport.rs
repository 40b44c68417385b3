//! Transport seam between the MCP client and a server connection

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::McpError;

/// Moves JSON-RPC messages to and from one server
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for the response with the same id
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError>;

    /// Send a notification
    async fn notify(&self, notification: JsonRpcNotification) -> Result<(), McpError>;

    /// Release the connection
    async fn close(&self) {}
}

/// Routes responses read by a background task to the requests waiting on them
///
/// Responses that arrive before their request registered are held until it
/// does.
#[derive(Default)]
pub(crate) struct Inbox {
    state: Mutex<InboxState>,
}

#[derive(Default)]
struct InboxState {
    waiting: HashMap<u64, oneshot::Sender<JsonRpcResponse>>,
    early: HashMap<u64, JsonRpcResponse>,
    closed: Option<String>,
}

impl Inbox {
    /// Register interest in the response to `id`
    pub(crate) fn expect(&self, id: u64) -> Result<oneshot::Receiver<JsonRpcResponse>, McpError> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        if let Some(response) = state.early.remove(&id) {
            let _ = tx.send(response);
            return Ok(rx);
        }
        if let Some(reason) = &state.closed {
            return Err(McpError::Transport(reason.clone()));
        }
        state.waiting.insert(id, tx);
        Ok(rx)
    }

    /// Stop waiting for `id`
    pub(crate) fn forget(&self, id: u64) {
        self.lock().waiting.remove(&id);
    }

    /// Hand a response to its waiter
    pub(crate) fn deliver(&self, response: JsonRpcResponse) {
        let Some(id) = response.id else {
            return;
        };
        let mut state = self.lock();
        match state.waiting.remove(&id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => {
                state.early.insert(id, response);
            }
        }
    }

    /// Fail every pending and future request
    pub(crate) fn close(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        state.closed.get_or_insert_with(|| reason.into());
        state.waiting.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Wait for a registered response, mapping a closed channel to a transport error
pub(crate) async fn await_response(
    rx: oneshot::Receiver<JsonRpcResponse>,
) -> Result<JsonRpcResponse, McpError> {
    rx.await
        .map_err(|_| McpError::Transport("connection closed before the response arrived".into()))
}
