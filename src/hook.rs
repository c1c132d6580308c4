use crate::error::SessionError;
use crate::pipeline::Response;
use crate::session::WebSocketSession;
use crate::status::CloseCode;
use async_trait::async_trait;

/// Callbacks the request pipeline invokes around a handler.
///
/// * `on_request` runs before the handler
/// * `on_response` runs after the handler succeeded
/// * `on_error` runs after the handler, or an earlier hook, failed
///
/// # Example
/// ```
/// use websocket_session::{LifecycleHook, Response, SessionError, WebSocketSession};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct AuditHook;
///
/// #[async_trait]
/// impl LifecycleHook for AuditHook {
///     async fn on_request(&self, session: &mut WebSocketSession) -> Result<(), SessionError> {
///         println!("request on {}", session.scope().path);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait LifecycleHook: Send + Sync + std::fmt::Debug {
    async fn on_request(&self, _session: &mut WebSocketSession) -> Result<(), SessionError> {
        Ok(())
    }

    async fn on_response(
        &self,
        _session: &mut WebSocketSession,
        _response: &Response,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn on_error(
        &self,
        _session: &mut WebSocketSession,
        _response: &Response,
    ) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Accepts websocket requests before the handler runs and closes them
/// afterwards.
///
/// Requests whose scope is not websocket are left untouched. The close only
/// happens while the transport still reports the connection open, and it
/// carries the response payload with a normal closure code.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConnectHook;

impl AutoConnectHook {
    async fn close_if_open(
        session: &mut WebSocketSession,
        response: &Response,
    ) -> Result<(), SessionError> {
        if session.scope().is_websocket() && session.is_open() {
            session
                .close(CloseCode::Normal, response.payload.clone())
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LifecycleHook for AutoConnectHook {
    async fn on_request(&self, session: &mut WebSocketSession) -> Result<(), SessionError> {
        if session.scope().is_websocket() {
            session.connect().await?;
        }
        Ok(())
    }

    async fn on_response(
        &self,
        session: &mut WebSocketSession,
        response: &Response,
    ) -> Result<(), SessionError> {
        Self::close_if_open(session, response).await
    }

    async fn on_error(
        &self,
        session: &mut WebSocketSession,
        response: &Response,
    ) -> Result<(), SessionError> {
        Self::close_if_open(session, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;
    use crate::message::{Message, MessageType, Payload};
    use crate::scope::Scope;

    #[tokio::test]
    async fn test_on_request_connects_websocket_scope() {
        let (gateway, peer) = channel::pair(None);
        let mut session = WebSocketSession::new(Scope::websocket("/"), gateway);
        peer.push(Message::connect()).unwrap();

        AutoConnectHook.on_request(&mut session).await.unwrap();
        assert!(session.is_open());
        assert_eq!(peer.drain_outbound(), vec![Message::accept()]);
    }

    #[tokio::test]
    async fn test_http_scope_is_ignored_at_every_stage() {
        let (gateway, peer) = channel::pair(None);
        let mut session = WebSocketSession::new(Scope::http("/"), gateway);
        peer.push(Message::connect()).unwrap();

        let hook = AutoConnectHook;
        let response = Response::text("body");
        hook.on_request(&mut session).await.unwrap();
        hook.on_response(&mut session, &response).await.unwrap();
        hook.on_error(&mut session, &response).await.unwrap();

        assert_eq!(peer.pending_inbound(), 1);
        assert!(peer.drain_outbound().is_empty());
    }

    #[tokio::test]
    async fn test_on_error_closes_with_error_payload() {
        let (gateway, peer) = channel::pair(None);
        let mut session = WebSocketSession::new(Scope::websocket("/"), gateway);
        peer.push(Message::connect()).unwrap();
        AutoConnectHook.on_request(&mut session).await.unwrap();
        peer.drain_outbound();

        let response = Response::binary(vec![7u8]);
        AutoConnectHook
            .on_error(&mut session, &response)
            .await
            .unwrap();

        let sent = peer.drain_outbound();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, MessageType::Disconnect);
        assert_eq!(sent[0].code, Some(1000));
        assert_eq!(
            sent[0].clone().into_payload(),
            Some(Payload::Binary(vec![7]))
        );
    }

    #[tokio::test]
    async fn test_closed_connection_is_not_closed_again() {
        let (gateway, peer) = channel::pair(None);
        let mut session = WebSocketSession::new(Scope::websocket("/"), gateway);
        peer.push(Message::connect()).unwrap();
        AutoConnectHook.on_request(&mut session).await.unwrap();
        peer.drain_outbound();
        peer.close_transport();

        AutoConnectHook
            .on_response(&mut session, &Response::empty())
            .await
            .unwrap();
        assert!(peer.drain_outbound().is_empty());
    }
}
