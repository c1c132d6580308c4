//! Request pipeline driver
//!
//! Runs a [`SessionHandler`] with its [`LifecycleHook`]s around it:
//! 1. `on_request` for every hook, in registration order
//! 2. the handler
//! 3. `on_response` (or `on_error` on failure) for every hook, in reverse order
//!
//! Hook failures on the error path are logged; the original error is returned.

use crate::hook::LifecycleHook;
use crate::message::Payload;
use crate::session::WebSocketSession;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a handler, carried into the closing hooks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub payload: Option<Payload>,
}

impl Response {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: Some(Payload::Text(text.into())),
        }
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Some(Payload::Binary(data.into())),
        }
    }

    /// Renders an error as a JSON text payload: `{"error": "<message>"}`
    pub fn from_error(error: &anyhow::Error) -> Self {
        let body = serde_json::json!({ "error": error.to_string() });
        Self::text(body.to_string())
    }
}

impl From<Payload> for Response {
    fn from(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

/// Application code that runs on an accepted session
///
/// # Example
/// ```
/// use websocket_session::{Response, SessionHandler, WebSocketSession};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl SessionHandler for Echo {
///     async fn handle(&self, session: &mut WebSocketSession) -> anyhow::Result<Response> {
///         if let Some(payload) = session.receive().await? {
///             session.send(payload).await?;
///         }
///         Ok(Response::text("done"))
///     }
/// }
/// ```
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn handle(&self, session: &mut WebSocketSession) -> Result<Response>;
}

type HookCollection = Vec<Arc<dyn LifecycleHook>>;

/// A handler with its lifecycle hooks
#[derive(Clone)]
pub struct Pipeline {
    hooks: Arc<HookCollection>,
    handler: Arc<dyn SessionHandler>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn builder<H>(handler: H) -> PipelineBuilder
    where
        H: SessionHandler + 'static,
    {
        PipelineBuilder::new(handler)
    }

    /// Runs the hooks and the handler for one session.
    pub async fn run(&self, session: &mut WebSocketSession) -> Result<Response> {
        match self.dispatch(session).await {
            Ok(response) => {
                for hook in self.hooks.iter().rev() {
                    hook.on_response(session, &response).await?;
                }
                debug!("Pipeline finished for {}", session.scope().path);
                Ok(response)
            }
            Err(error) => {
                debug!("Pipeline failed for {}: {}", session.scope().path, error);
                let response = Response::from_error(&error);
                for hook in self.hooks.iter().rev() {
                    if let Err(hook_error) = hook.on_error(session, &response).await {
                        warn!("Hook {:?} failed on error path: {}", hook, hook_error);
                    }
                }
                Err(error)
            }
        }
    }

    async fn dispatch(&self, session: &mut WebSocketSession) -> Result<Response> {
        for hook in self.hooks.iter() {
            hook.on_request(session).await?;
        }
        self.handler.handle(session).await
    }
}

/// Builder for a [`Pipeline`]
pub struct PipelineBuilder {
    hooks: HookCollection,
    handler: Arc<dyn SessionHandler>,
}

impl PipelineBuilder {
    pub fn new<H>(handler: H) -> Self
    where
        H: SessionHandler + 'static,
    {
        Self {
            hooks: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_hook<K>(mut self, hook: K) -> Self
    where
        K: LifecycleHook + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn with_arc_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            hooks: Arc::new(self.hooks),
            handler: self.handler,
        }
    }
}
