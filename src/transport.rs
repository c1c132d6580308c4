//! Gateway trait abstraction
//!
//! A server runtime hands each connection to the session as three pieces: a
//! sink for outbound messages, a stream of inbound messages, and a status
//! query reporting the transport's own view of the connection.

use crate::message::Message;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;

/// Transport-level connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Waiting for the application to accept
    #[default]
    Connecting,
    Open,
    Closed,
}

/// Error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Unsupported message type: {0}")]
    Unsupported(String),
}

/// Trait for the outbound half of a gateway
#[async_trait]
pub trait GatewaySink: Send {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError>;
}

/// Future type for stream next operation
pub type GatewayStreamFuture<'a> = Pin<
    Box<dyn std::future::Future<Output = Option<Result<Message, TransportError>>> + Send + 'a>,
>;

/// Trait for the inbound half of a gateway
///
/// `None` means the runtime will deliver no more messages.
pub trait GatewayStream: Send {
    fn next(&mut self) -> GatewayStreamFuture<'_>;
}

/// Live connection status as seen by the transport
pub trait ConnectionStatus: Send + Sync {
    fn state(&self) -> TransportState;
}

/// Trait for a per-connection gateway that can be split into its parts
pub trait Gateway: Send {
    type Sink: GatewaySink + 'static;
    type Stream: GatewayStream + 'static;
    type Status: ConnectionStatus + 'static;

    fn split(self) -> (Self::Sink, Self::Stream, Self::Status);
}

/// Connection state shared between the halves of one transport
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<TransportState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: TransportState) {
        *self.inner.lock() = state;
    }

    /// Moves from `Connecting` to `Open`; any other state is left alone.
    pub fn mark_open(&self) -> bool {
        let mut state = self.inner.lock();
        if *state == TransportState::Connecting {
            *state = TransportState::Open;
            true
        } else {
            false
        }
    }

    pub fn mark_closed(&self) {
        self.set(TransportState::Closed);
    }
}

impl ConnectionStatus for SharedState {
    fn state(&self) -> TransportState {
        *self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_state_transitions() {
        let state = SharedState::new();
        let view = state.clone();
        assert_eq!(view.state(), TransportState::Connecting);

        assert!(state.mark_open());
        assert_eq!(view.state(), TransportState::Open);
        assert!(!state.mark_open());

        state.mark_closed();
        assert_eq!(view.state(), TransportState::Closed);
        assert!(!state.mark_open());
        assert_eq!(view.state(), TransportState::Closed);
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::ConnectionClosed.to_string(),
            "Connection closed"
        );
        assert!(TransportError::Transport("reset".into())
            .to_string()
            .contains("reset"));
        assert!(TransportError::Unsupported("websocket.http".into())
            .to_string()
            .contains("websocket.http"));
    }
}
