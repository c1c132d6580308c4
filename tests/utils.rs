#![cfg(feature = "axum")]
#![allow(dead_code)]

use anyhow::Result;
use axum::{extract::ws::WebSocketUpgrade, routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use websocket_session::{serve_upgrade, Pipeline, Scope};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serves `pipeline` on `/ws` at a dynamically assigned port.
pub async fn start_server(pipeline: Pipeline) -> Result<SocketAddr> {
    init_tracing();

    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade, scope: Scope| {
            let pipeline = pipeline.clone();
            async move { serve_upgrade(ws, scope, pipeline) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    // Wait a bit for the server to be ready
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(addr)
}

pub async fn create_websocket_client(addr: SocketAddr) -> Result<Client> {
    let (ws_stream, _) = connect_async(format!("ws://{addr}/ws")).await?;
    Ok(ws_stream)
}
