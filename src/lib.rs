#[cfg(feature = "axum")]
pub mod axum;
pub mod channel;
pub mod error;
pub mod hook;
pub mod message;
pub mod pipeline;
pub mod scope;
pub mod session;
pub mod status;
pub mod transport;

#[cfg(feature = "axum")]
pub use crate::axum::{scope_from_parts, serve_upgrade, AxumGateway};
pub use error::SessionError;
pub use hook::{AutoConnectHook, LifecycleHook};
pub use message::{Message, MessageType, Payload};
pub use pipeline::{Pipeline, PipelineBuilder, Response, SessionHandler};
pub use scope::{Scope, ScopeType};
pub use session::WebSocketSession;
pub use status::{CloseCode, InvalidCloseCode};
pub use transport::{
    ConnectionStatus, Gateway, GatewaySink, GatewayStream, GatewayStreamFuture, SharedState,
    TransportError, TransportState,
};
