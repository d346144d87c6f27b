// executor.rs: The resource executor boundary.
//
// Handlers perform the actual mutation (restart a service, resolve an
// alert). The gateway only ever talks to `dyn Executor`, and only after a
// call has been authorized and its parameters checked against the schema.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ActionError, ExecutorError, HandlerError};
use crate::plan::Params;

/// A single resource handler.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(&self, params: &Params) -> Result<Value, HandlerError>;
}

/// Dispatches a named action to whatever performs it.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, action: &str, params: &Params) -> Result<Value, ExecutorError>;
}

/// Name → handler table. Duplicate names are rejected at registration time.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        action: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), ActionError> {
        let action = action.into();
        if self.handlers.contains_key(&action) {
            return Err(ActionError::DuplicateHandler(action));
        }
        self.handlers.insert(action, handler);
        Ok(())
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl Executor for HandlerRegistry {
    async fn execute(&self, action: &str, params: &Params) -> Result<Value, ExecutorError> {
        let handler = self
            .handlers
            .get(action)
            .ok_or_else(|| ExecutorError::UnknownAction(action.to_string()))?;
        handler
            .run(params)
            .await
            .map_err(|source| ExecutorError::Handler {
                action: action.to_string(),
                source,
            })
    }
}

/// Closures are handlers, which keeps test and demo wiring short.
///
/// The closure runs inline on the calling task with no await point, so a
/// caller's timeout cannot interrupt it. Wrap anything that may block in
/// [`BlockingHandler`].
#[async_trait]
impl<F> ActionHandler for F
where
    F: Fn(&Params) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn run(&self, params: &Params) -> Result<Value, HandlerError> {
        self(params)
    }
}

/// Runs a synchronous handler on tokio's blocking pool.
///
/// The caller awaits a join handle, so a timeout around `run` fires on
/// schedule. The abandoned call keeps running to completion on its thread.
pub struct BlockingHandler<F> {
    f: Arc<F>,
}

impl<F> BlockingHandler<F>
where
    F: Fn(&Params) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> ActionHandler for BlockingHandler<F>
where
    F: Fn(&Params) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    async fn run(&self, params: &Params) -> Result<Value, HandlerError> {
        let f = self.f.clone();
        let params = params.clone();
        tokio::task::spawn_blocking(move || f(&params))
            .await
            .map_err(|e| HandlerError::Failed(format!("handler did not finish: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::params;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn echo(p: &Params) -> Result<Value, HandlerError> {
        Ok(Value::Object(p.clone()))
    }

    fn always_missing(p: &Params) -> Result<Value, HandlerError> {
        Err(HandlerError::NotFound {
            kind: "service".into(),
            id: p.get("service_id").and_then(Value::as_str).unwrap_or("").into(),
        })
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let mut handlers = HandlerRegistry::new();
        handlers.register("test.echo", Arc::new(echo)).unwrap();

        let out = handlers
            .execute("test.echo", &params(json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_action_is_an_error() {
        let handlers = HandlerRegistry::new();
        let err = handlers
            .execute("test.nope", &Params::new())
            .await
            .unwrap_err();
        assert_eq!(err, ExecutorError::UnknownAction("test.nope".into()));
    }

    #[tokio::test]
    async fn handler_errors_are_wrapped_with_the_action() {
        let mut handlers = HandlerRegistry::new();
        handlers
            .register("infra.restart", Arc::new(always_missing))
            .unwrap();

        let err = handlers
            .execute("infra.restart", &params(json!({"service_id": "ghost"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "infra.restart failed: service 'ghost' not found");
    }

    #[tokio::test]
    async fn blocking_handler_returns_output_and_errors() {
        let mut handlers = HandlerRegistry::new();
        handlers
            .register("test.echo", Arc::new(BlockingHandler::new(echo)))
            .unwrap();
        handlers
            .register("infra.restart", Arc::new(BlockingHandler::new(always_missing)))
            .unwrap();

        let out = handlers
            .execute("test.echo", &params(json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1}));
        assert!(matches!(
            handlers.execute("infra.restart", &Params::new()).await,
            Err(ExecutorError::Handler { .. })
        ));
    }

    #[tokio::test]
    async fn timeout_interrupts_a_blocked_sync_handler() {
        let slow = BlockingHandler::new(|_: &Params| -> Result<Value, HandlerError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Value::Null)
        });
        let params = Params::new();

        let started = Instant::now();
        let outcome = tokio::time::timeout(Duration::from_millis(20), slow.run(&params)).await;
        assert!(outcome.is_err());
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[test]
    fn duplicate_handler_rejected() {
        let mut handlers = HandlerRegistry::new();
        handlers.register("test.echo", Arc::new(echo)).unwrap();
        let err = handlers.register("test.echo", Arc::new(echo)).unwrap_err();
        assert_eq!(err, ActionError::DuplicateHandler("test.echo".into()));
    }
}
