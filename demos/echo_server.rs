//! Echo server with automatic connect and close
//!
//! The hook accepts the connection before the handler runs and closes it
//! with the handler's response once the handler returns.
//!
//! Run with:
//! ```
//! cargo run --example echo_server
//! ```

use anyhow::Result;
use async_trait::async_trait;
use axum::{extract::ws::WebSocketUpgrade, routing::get, Router};
use websocket_session::{
    serve_upgrade, AutoConnectHook, Pipeline, Response, Scope, SessionHandler, WebSocketSession,
};

struct EchoHandler;

#[async_trait]
impl SessionHandler for EchoHandler {
    async fn handle(&self, session: &mut WebSocketSession) -> Result<Response> {
        tracing::info!("Echo connection from {:?}", session.scope().client);

        while let Some(payload) = session.receive().await? {
            if payload.as_text() == Some("bye") {
                return Ok(Response::text("goodbye"));
            }
            session.send(payload).await?;
        }
        Ok(Response::empty())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "websocket_session=debug,echo_server=info".into()),
        )
        .init();

    let pipeline = Pipeline::builder(EchoHandler)
        .with_hook(AutoConnectHook)
        .build();

    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade, scope: Scope| {
            let pipeline = pipeline.clone();
            async move { serve_upgrade(ws, scope, pipeline) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3002").await?;

    println!("Echo server running on ws://127.0.0.1:3002/ws");
    println!("Test with: websocat ws://127.0.0.1:3002/ws");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

