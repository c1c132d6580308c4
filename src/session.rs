//! WebSocket session handle
//!
//! A per-connection view over the gateway supplied by the server runtime.
//! The session translates connect/send/receive/close calls into gateway
//! messages and back. It keeps no connection state of its own: `is_open`
//! always asks the transport.

use crate::error::SessionError;
use crate::message::{Message, MessageType, Payload};
use crate::scope::Scope;
use crate::status::CloseCode;
use crate::transport::{ConnectionStatus, Gateway, GatewaySink, GatewayStream, TransportState};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

/// Session handle for one connection-oriented request
pub struct WebSocketSession {
    scope: Scope,
    sink: Box<dyn GatewaySink>,
    stream: Box<dyn GatewayStream>,
    status: Box<dyn ConnectionStatus>,
}

impl std::fmt::Debug for WebSocketSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSession")
            .field("scope", &self.scope)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl WebSocketSession {
    pub fn new<G: Gateway>(scope: Scope, gateway: G) -> Self {
        let (sink, stream, status) = gateway.split();
        Self {
            scope,
            sink: Box::new(sink),
            stream: Box::new(stream),
            status: Box::new(status),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Current transport state, queried on every call
    pub fn state(&self) -> TransportState {
        self.status.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    /// Waits for the peer's connection request and accepts it.
    ///
    /// Fails with [`SessionError::Protocol`] without sending anything when the
    /// first inbound message is not `websocket.connect`. Must be called at
    /// most once per connection.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        let msg = self.next_inbound().await?;

        if !msg.is(&MessageType::Connect) {
            warn!(
                "Rejecting connection on {}: expected websocket.connect, got {}",
                self.scope.path, msg.kind
            );
            return Err(SessionError::protocol(format!(
                "Expected websocket connection but got: {}",
                msg.kind
            )));
        }

        self.sink.send(Message::accept()).await?;
        debug!("Accepted websocket connection on {}", self.scope.path);
        Ok(())
    }

    /// Sends a data frame. An empty payload sends a frame with no content.
    pub async fn send(&mut self, payload: impl Into<Payload>) -> Result<(), SessionError> {
        self.send_with(Some(payload.into()), Map::new()).await
    }

    /// Sends a data frame with extra fields merged into the message.
    ///
    /// Returns once the gateway accepted the message, not when the peer
    /// received it.
    pub async fn send_with(
        &mut self,
        payload: Option<Payload>,
        extra: Map<String, Value>,
    ) -> Result<(), SessionError> {
        let msg = Message::new(MessageType::Send)
            .with_extra(extra)
            .with_payload(payload);
        trace!(
            "Sending message (text: {}, bytes: {})",
            msg.text.is_some(),
            msg.bytes.is_some()
        );
        self.sink.send(msg).await?;
        Ok(())
    }

    /// Waits for the next inbound message and returns its payload.
    ///
    /// Text wins over bytes; a message with neither yields `None`. A
    /// `websocket.disconnect` from the peer yields [`SessionError::Closed`]
    /// with the peer's code (1005 when it sent none), and a runtime that
    /// stops delivering messages yields `Closed` with 1006.
    pub async fn receive(&mut self) -> Result<Option<Payload>, SessionError> {
        let msg = self.next_inbound().await?;

        if msg.is(&MessageType::Disconnect) {
            let code = msg.code.unwrap_or(CloseCode::NoStatus.as_u16());
            debug!("Peer closed websocket on {} with code {}", self.scope.path, code);
            return Err(SessionError::closed(code));
        }

        trace!("Received {} message", msg.kind);
        Ok(msg.into_payload())
    }

    /// Sends a close message with the given code and optional payload.
    ///
    /// Closing an already closed connection is left to the transport, which
    /// may reject it.
    pub async fn close(
        &mut self,
        code: CloseCode,
        payload: Option<Payload>,
    ) -> Result<(), SessionError> {
        let msg = Message::disconnect(code).with_payload(payload);
        self.sink.send(msg).await?;
        debug!("Closed websocket on {} with code {}", self.scope.path, code);
        Ok(())
    }

    async fn next_inbound(&mut self) -> Result<Message, SessionError> {
        match self.stream.next().await {
            Some(Ok(msg)) => Ok(msg),
            Some(Err(e)) => Err(e.into()),
            None => Err(SessionError::closed(CloseCode::Abnormal)),
        }
    }
}
