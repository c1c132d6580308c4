//! In-process gateway backed by flume channels
//!
//! [`pair`] returns the session side ([`ChannelGateway`]) and the runtime side
//! ([`ChannelPeer`]) of one connection. The channel transport tracks its own
//! state from the messages that cross it:
//! - an outbound accept opens the connection
//! - an outbound or inbound disconnect closes it
//! - a peer that hangs up closes it
//!
//! Sends after closure fail with [`TransportError::ConnectionClosed`].

use crate::message::{Message, MessageType};
use crate::transport::{
    ConnectionStatus, Gateway, GatewaySink, GatewayStream, GatewayStreamFuture, SharedState,
    TransportError, TransportState,
};
use async_trait::async_trait;
use flume::{Receiver, Sender, TrySendError};
use tracing::debug;

/// Creates a connected gateway/peer pair.
///
/// `capacity` bounds both directions; `None` makes them unbounded.
pub fn pair(capacity: Option<usize>) -> (ChannelGateway, ChannelPeer) {
    let (inbound_tx, inbound_rx) = match capacity {
        Some(size) => flume::bounded(size),
        None => flume::unbounded(),
    };
    let (outbound_tx, outbound_rx) = match capacity {
        Some(size) => flume::bounded(size),
        None => flume::unbounded(),
    };
    let state = SharedState::new();

    (
        ChannelGateway {
            inbound: inbound_rx,
            outbound: outbound_tx,
            state: state.clone(),
        },
        ChannelPeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
            state,
        },
    )
}

/// Session side of an in-process connection
#[derive(Debug)]
pub struct ChannelGateway {
    inbound: Receiver<Message>,
    outbound: Sender<Message>,
    state: SharedState,
}

/// Outbound half of a [`ChannelGateway`]
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<Message>,
    state: SharedState,
}

/// Inbound half of a [`ChannelGateway`]
#[derive(Debug)]
pub struct ChannelStream {
    rx: Receiver<Message>,
    state: SharedState,
}

impl Gateway for ChannelGateway {
    type Sink = ChannelSink;
    type Stream = ChannelStream;
    type Status = SharedState;

    fn split(self) -> (Self::Sink, Self::Stream, Self::Status) {
        (
            ChannelSink {
                tx: self.outbound,
                state: self.state.clone(),
            },
            ChannelStream {
                rx: self.inbound,
                state: self.state.clone(),
            },
            self.state,
        )
    }
}

#[async_trait]
impl GatewaySink for ChannelSink {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        if self.state.state() == TransportState::Closed {
            return Err(TransportError::ConnectionClosed);
        }

        let kind = msg.kind.clone();
        self.tx
            .send_async(msg)
            .await
            .map_err(|_| TransportError::ConnectionClosed)?;

        match kind {
            MessageType::Accept => {
                self.state.mark_open();
            }
            MessageType::Disconnect => self.state.mark_closed(),
            _ => {}
        }
        Ok(())
    }
}

impl GatewayStream for ChannelStream {
    fn next(&mut self) -> GatewayStreamFuture<'_> {
        Box::pin(async move {
            match self.rx.recv_async().await {
                Ok(msg) => {
                    if msg.is(&MessageType::Disconnect) {
                        self.state.mark_closed();
                    }
                    Some(Ok(msg))
                }
                Err(_) => {
                    debug!("Channel peer hung up");
                    self.state.mark_closed();
                    None
                }
            }
        })
    }
}

/// Runtime side of an in-process connection
#[derive(Debug)]
pub struct ChannelPeer {
    inbound: Sender<Message>,
    outbound: Receiver<Message>,
    state: SharedState,
}

impl ChannelPeer {
    /// Queues a message for the session without waiting.
    pub fn push(&self, msg: Message) -> Result<(), TransportError> {
        self.inbound.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Transport("inbound queue is full".into()),
            TrySendError::Disconnected(_) => TransportError::ConnectionClosed,
        })
    }

    /// Queues a message for the session, waiting for room if bounded.
    pub async fn push_async(&self, msg: Message) -> Result<(), TransportError> {
        self.inbound
            .send_async(msg)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Waits for the next message the session sent.
    pub async fn next_outbound(&self) -> Option<Message> {
        self.outbound.recv_async().await.ok()
    }

    pub fn try_outbound(&self) -> Option<Message> {
        self.outbound.try_recv().ok()
    }

    pub fn drain_outbound(&self) -> Vec<Message> {
        self.outbound.drain().collect()
    }

    /// Inbound messages the session has not consumed yet
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn state(&self) -> TransportState {
        self.state.state()
    }

    /// Marks the transport closed without a closing handshake.
    pub fn close_transport(&self) {
        self.state.mark_closed();
    }

    /// Drops the runtime side; the session's next receive sees the end of
    /// the inbound stream.
    pub fn hang_up(self) {
        debug!("Hanging up channel peer");
    }
}
