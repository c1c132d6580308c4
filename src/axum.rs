//! Axum integration
//!
//! Serves sessions over axum's upgraded websockets. [`AxumGateway`] turns an
//! upgraded socket into gateway messages, `Scope` can be extracted from any
//! request, and [`serve_upgrade`] runs a [`Pipeline`] on the upgraded
//! connection.

use crate::error::SessionError;
use crate::message::{Message, MessageType, Payload};
use crate::pipeline::Pipeline;
use crate::scope::{Scope, ScopeType};
use crate::session::WebSocketSession;
use crate::status::CloseCode;
use crate::transport::{
    ConnectionStatus, Gateway, GatewaySink, GatewayStream, GatewayStreamFuture, SharedState,
    TransportError, TransportState,
};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{CloseFrame, Message as WsFrame, WebSocket, WebSocketUpgrade},
        ConnectInfo, FromRequestParts,
    },
    http::{header, request::Parts},
    response::Response,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, error, trace};

/// Largest close reason that fits a control frame after the two code bytes
const MAX_CLOSE_REASON: usize = 123;

/// Gateway over an upgraded axum websocket
///
/// The HTTP upgrade has already completed when axum hands over the socket, so
/// the stream opens with a synthetic `websocket.connect` and the accept
/// message only flips the transport state to open.
pub struct AxumGateway {
    socket: WebSocket,
}

impl AxumGateway {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

/// Outbound half of an [`AxumGateway`]
pub struct AxumSink {
    sink: SplitSink<WebSocket, WsFrame>,
    state: SharedState,
}

/// Inbound half of an [`AxumGateway`]
pub struct AxumStream {
    stream: SplitStream<WebSocket>,
    state: SharedState,
    connect_delivered: bool,
}

impl Gateway for AxumGateway {
    type Sink = AxumSink;
    type Stream = AxumStream;
    type Status = SharedState;

    fn split(self) -> (Self::Sink, Self::Stream, Self::Status) {
        let (sink, stream) = self.socket.split();
        let state = SharedState::new();
        (
            AxumSink {
                sink,
                state: state.clone(),
            },
            AxumStream {
                stream,
                state: state.clone(),
                connect_delivered: false,
            },
            state,
        )
    }
}

#[async_trait]
impl GatewaySink for AxumSink {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        if self.state.state() == TransportState::Closed {
            return Err(TransportError::ConnectionClosed);
        }

        let kind = msg.kind.clone();
        match kind {
            MessageType::Accept => {
                self.state.mark_open();
                Ok(())
            }
            MessageType::Send => {
                let frame = match msg.into_payload() {
                    Some(Payload::Text(text)) => WsFrame::Text(text.into()),
                    Some(Payload::Binary(data)) => WsFrame::Binary(data.into()),
                    None => WsFrame::Text(String::new().into()),
                };
                self.write(frame).await
            }
            MessageType::Disconnect => {
                let code = msg.code.unwrap_or(CloseCode::Normal.as_u16());
                let reason = match msg.into_payload() {
                    Some(Payload::Text(text)) => text,
                    Some(Payload::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
                    None => String::new(),
                };
                let result = self
                    .write(WsFrame::Close(Some(CloseFrame {
                        code,
                        reason: truncate_reason(reason).into(),
                    })))
                    .await;
                self.state.mark_closed();
                result
            }
            other => Err(TransportError::Unsupported(other.to_string())),
        }
    }
}

/// Cuts `reason` to at most [`MAX_CLOSE_REASON`] bytes on a char boundary.
fn truncate_reason(mut reason: String) -> String {
    if reason.len() > MAX_CLOSE_REASON {
        debug!(
            "Truncating close reason from {} to {} bytes",
            reason.len(),
            MAX_CLOSE_REASON
        );
        let mut end = MAX_CLOSE_REASON;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

impl AxumSink {
    async fn write(&mut self, frame: WsFrame) -> Result<(), TransportError> {
        self.sink
            .send(frame)
            .await
            .map_err(|e| TransportError::Transport(e.to_string()))
    }
}

impl GatewayStream for AxumStream {
    fn next(&mut self) -> GatewayStreamFuture<'_> {
        Box::pin(async move {
            if !self.connect_delivered {
                self.connect_delivered = true;
                return Some(Ok(Message::connect()));
            }

            loop {
                match self.stream.next().await {
                    Some(Ok(WsFrame::Text(text))) => {
                        return Some(Ok(Message::receive(text.as_str())));
                    }
                    Some(Ok(WsFrame::Binary(data))) => {
                        return Some(Ok(Message::receive(data.to_vec())));
                    }
                    Some(Ok(WsFrame::Close(frame))) => {
                        debug!("Received close frame: {:?}", frame);
                        self.state.mark_closed();
                        let msg = Message::new(MessageType::Disconnect);
                        return Some(Ok(match frame {
                            Some(frame) => msg.with_code(frame.code),
                            None => msg,
                        }));
                    }
                    Some(Ok(WsFrame::Ping(_) | WsFrame::Pong(_))) => {
                        // Axum answers pings itself
                        trace!("Skipping ping/pong");
                    }
                    Some(Err(e)) => {
                        return Some(Err(TransportError::Transport(e.to_string())));
                    }
                    None => {
                        self.state.mark_closed();
                        return None;
                    }
                }
            }
        })
    }
}

/// Builds a [`Scope`] from request parts.
///
/// The scope is `websocket` when the request carries `Upgrade: websocket`.
pub fn scope_from_parts(parts: &Parts) -> Scope {
    let is_upgrade = parts
        .headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"));
    let kind = if is_upgrade {
        ScopeType::Websocket
    } else {
        ScopeType::Http
    };

    let mut scope = Scope::new(kind, parts.uri.path());
    scope.query_string = parts.uri.query().unwrap_or_default().to_owned();
    scope.headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect();
    scope.subprotocols = parts
        .headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|protocol| protocol.trim().to_owned())
        .filter(|protocol| !protocol.is_empty())
        .collect();
    scope.client = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    scope
}

impl<S> FromRequestParts<S> for Scope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(scope_from_parts(parts))
    }
}

/// Upgrades the request and runs `pipeline` on the resulting session.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::ws::WebSocketUpgrade, routing::get, Router};
/// use websocket_session::{serve_upgrade, AutoConnectHook, Pipeline, Response, Scope};
/// use websocket_session::{SessionHandler, WebSocketSession};
///
/// struct Greeter;
///
/// #[async_trait::async_trait]
/// impl SessionHandler for Greeter {
///     async fn handle(&self, session: &mut WebSocketSession) -> anyhow::Result<Response> {
///         session.send("hello").await?;
///         Ok(Response::empty())
///     }
/// }
///
/// let pipeline = Pipeline::builder(Greeter).with_hook(AutoConnectHook).build();
/// let app: Router = Router::new().route(
///     "/ws",
///     get(move |ws: WebSocketUpgrade, scope: Scope| {
///         let pipeline = pipeline.clone();
///         async move { serve_upgrade(ws, scope, pipeline) }
///     }),
/// );
/// ```
pub fn serve_upgrade(ws: WebSocketUpgrade, scope: Scope, pipeline: Pipeline) -> Response {
    ws.on_upgrade(move |socket| async move {
        let path = scope.path.clone();
        let mut session = WebSocketSession::new(scope, AxumGateway::new(socket));
        if let Err(e) = pipeline.run(&mut session).await {
            // Peers leaving mid-handler are routine
            match e.downcast_ref::<SessionError>() {
                Some(session_error) if session_error.is_closed() => {
                    debug!("WebSocket on {} closed by peer: {}", path, session_error);
                }
                _ => error!("WebSocket pipeline error on {}: {e:?}", path),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_upgrade_request_yields_websocket_scope() {
        let mut parts = parts(
            Request::builder()
                .uri("/chat?room=1")
                .header("upgrade", "WebSocket")
                .header("sec-websocket-protocol", "v1, v2")
                .body(())
                .unwrap(),
        );
        parts
            .extensions
            .insert(ConnectInfo("10.0.0.1:5555".parse::<SocketAddr>().unwrap()));

        let scope = scope_from_parts(&parts);
        assert!(scope.is_websocket());
        assert_eq!(scope.path, "/chat");
        assert_eq!(scope.query_string, "room=1");
        assert_eq!(scope.subprotocols, vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(scope.header("Upgrade"), Some("WebSocket"));
        assert_eq!(scope.client, Some("10.0.0.1:5555".parse().unwrap()));
    }

    #[test]
    fn test_close_reason_fits_control_frame() {
        assert_eq!(truncate_reason("bye".into()), "bye");

        let exact = "x".repeat(MAX_CLOSE_REASON);
        assert_eq!(truncate_reason(exact.clone()), exact);

        let long = truncate_reason("x".repeat(200));
        assert_eq!(long.len(), MAX_CLOSE_REASON);

        // 'é' is two bytes, so byte 123 falls inside a char
        let wide = truncate_reason("é".repeat(100));
        assert_eq!(wide.len(), 122);
        assert!(wide.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_plain_request_yields_http_scope() {
        let parts = parts(Request::builder().uri("/health").body(()).unwrap());

        let scope = scope_from_parts(&parts);
        assert!(!scope.is_websocket());
        assert_eq!(scope.query_string, "");
        assert!(scope.subprotocols.is_empty());
        assert_eq!(scope.client, None);
    }
}
