//! Request-scoped context passed to every trait method
//!
//! Each RPC gets a `Context` carrying its deadline, cancellation signal and
//! any request-scoped values. Handlers should check `is_cancelled` (or await
//! `done`) around long-running work so Terraform's stop request takes effect.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time;

/// Cheaply cloneable handle; clones observe the same cancellation state
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
    cancelled: watch::Receiver<bool>,
    cancel_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (cancel_tx, cancelled) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                values: RwLock::new(HashMap::new()),
                cancelled,
                cancel_tx,
            }),
        }
    }

    /// Derive a context that cancels itself once `timeout` elapses
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let (cancel_tx, cancelled) = watch::channel(false);

        let timer_tx = cancel_tx.clone();
        tokio::spawn(async move {
            time::sleep_until(deadline.into()).await;
            let _ = timer_tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                values: RwLock::new(HashMap::new()),
                cancelled,
                cancel_tx,
            }),
        }
    }

    /// Attach a request-scoped value under `key`
    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        self.inner
            .values
            .write()
            .await
            .insert(key.to_string(), Box::new(value));
        self
    }

    /// Typed lookup of a value stored with `with_value`; wrong types read as absent
    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.inner.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Channel that flips to `true` when the context is cancelled; await
    /// `changed()` on it to race cancellation against work
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.cancelled.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.cancel_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
