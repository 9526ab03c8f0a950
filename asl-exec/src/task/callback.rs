use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Success(JsonValue),
    Failure { error: String, cause: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallbackError {
    #[error("task token '{0}' is not pending")]
    UnknownToken(String),
    #[error("task token '{0}' was dropped before completion")]
    Dropped(String),
}

/// Token-based completion channel for `.waitForTaskToken` tasks.
///
/// A token is registered before the backend call is dispatched, so a
/// completion that arrives while the call is still in flight is not lost.
#[async_trait]
pub trait CallbackChannel: Send + Sync {
    fn register(&self, token: &str);
    async fn wait(&self, token: &str) -> Result<CallbackOutcome, CallbackError>;
    /// Forgets a token whose waiter gave up.
    fn discard(&self, token: &str);
}

#[derive(Default)]
struct Pending {
    senders: HashMap<String, oneshot::Sender<CallbackOutcome>>,
    receivers: HashMap<String, oneshot::Receiver<CallbackOutcome>>,
}

/// In-process callback channel.
#[derive(Default)]
pub struct CallbackPool {
    pending: Mutex<Pending>,
}

impl CallbackPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_success(&self, token: &str, output: JsonValue) -> Result<(), CallbackError> {
        self.complete(token, CallbackOutcome::Success(output))
    }

    pub fn send_failure(
        &self,
        token: &str,
        error: impl Into<String>,
        cause: impl Into<String>,
    ) -> Result<(), CallbackError> {
        self.complete(
            token,
            CallbackOutcome::Failure {
                error: error.into(),
                cause: cause.into(),
            },
        )
    }

    pub fn pending_tokens(&self) -> Vec<String> {
        let pending = self.lock();
        let mut tokens: Vec<String> = pending.senders.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    fn complete(&self, token: &str, outcome: CallbackOutcome) -> Result<(), CallbackError> {
        let sender = self
            .lock()
            .senders
            .remove(token)
            .ok_or_else(|| CallbackError::UnknownToken(token.to_string()))?;
        debug!(token, "task token completed");
        sender
            .send(outcome)
            .map_err(|_| CallbackError::Dropped(token.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CallbackChannel for CallbackPool {
    fn register(&self, token: &str) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.lock();
        pending.senders.insert(token.to_string(), tx);
        pending.receivers.insert(token.to_string(), rx);
    }

    async fn wait(&self, token: &str) -> Result<CallbackOutcome, CallbackError> {
        let receiver = self
            .lock()
            .receivers
            .remove(token)
            .ok_or_else(|| CallbackError::UnknownToken(token.to_string()))?;
        receiver
            .await
            .map_err(|_| CallbackError::Dropped(token.to_string()))
    }

    fn discard(&self, token: &str) {
        let mut pending = self.lock();
        pending.senders.remove(token);
        pending.receivers.remove(token);
    }
}
