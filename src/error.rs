use crate::status::CloseCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Errors surfaced by [`WebSocketSession`](crate::WebSocketSession) operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The first inbound message was not a connection request
    #[error("{detail}")]
    Protocol { detail: String, code: CloseCode },

    /// The connection closed, either by the peer or because the runtime
    /// stopped delivering messages
    #[error("WebSocket has closed (code {code})")]
    Closed { code: u16 },

    /// Failure reported by the underlying transport, passed through as is
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SessionError {
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol {
            detail: detail.into(),
            code: CloseCode::ProtocolError,
        }
    }

    pub fn closed(code: impl Into<u16>) -> Self {
        Self::Closed { code: code.into() }
    }

    /// Close status associated with this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Protocol { code, .. } => Some(code.as_u16()),
            Self::Closed { code } => Some(*code),
            Self::Transport(_) => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Closed { .. } | Self::Transport(TransportError::ConnectionClosed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_carries_1002() {
        let err = SessionError::protocol("Expected websocket connection but got: x");
        assert_eq!(err.status_code(), Some(1002));
        assert_eq!(err.to_string(), "Expected websocket connection but got: x");
        assert!(!err.is_closed());
    }

    #[test]
    fn test_closed_error_carries_real_code() {
        let err = SessionError::closed(CloseCode::GoingAway);
        assert_eq!(err.status_code(), Some(1001));
        assert!(err.is_closed());
        assert!(err.to_string().contains("1001"));

        let app_defined = SessionError::closed(4001u16);
        assert_eq!(app_defined.status_code(), Some(4001));
    }

    #[test]
    fn test_transport_errors_pass_through() {
        let err: SessionError = TransportError::Transport("broken pipe".into()).into();
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Transport error: broken pipe");

        let closed: SessionError = TransportError::ConnectionClosed.into();
        assert!(closed.is_closed());
    }
}
