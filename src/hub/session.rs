//! Connection sessions: one reader and one writer task per connected client.
//!
//! The transport seam is a pair of frame traits so the two tasks can own
//! their halves independently. The embedding HTTP layer hands the hub an
//! upgraded [`axum::extract::ws::WebSocket`]; tests and in-process clients
//! use [`ChannelTransport`].

use async_trait::async_trait;
use axum::extract::ws;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{HubError, HubResult};
use crate::hub::actor::{HubHandle, SessionEntry};
use crate::models::{Identity, Membership, Message};

/// Writing half of a session transport.
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send(&mut self, frame: String) -> HubResult<()>;
}

/// Reading half of a session transport.
#[async_trait]
pub trait FrameStream: Send + 'static {
    /// Next text frame. `Ok(None)` on a clean close, `Err` on transport failure.
    async fn recv(&mut self) -> HubResult<Option<String>>;
}

/// A duplex client connection, split into halves for the two session tasks.
pub trait SessionTransport: Send + 'static {
    type Sink: FrameSink;
    type Stream: FrameStream;

    fn split(self) -> (Self::Sink, Self::Stream);
}

impl HubHandle {
    /// Register a session for an authenticated identity and spawn its
    /// reader/writer tasks. The caller is responsible for authenticating the
    /// identity and loading its memberships before invoking this; from here
    /// on the session lives until its transport closes or fails.
    pub async fn connect<T: SessionTransport>(
        &self,
        identity: Identity,
        memberships: Vec<Membership>,
        transport: T,
    ) -> HubResult<()> {
        let (outbound_tx, outbound_rx) = mpsc::channel(self.session_queue_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.register(SessionEntry {
            identity: identity.clone(),
            memberships,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        })
        .await?;

        let (sink, stream) = transport.split();
        tokio::spawn(write_pump(identity.clone(), sink, outbound_rx));
        tokio::spawn(read_pump(identity, stream, self.clone(), shutdown_rx));
        Ok(())
    }
}

/// Drain the session's outbound queue onto the transport. Exits when the hub
/// drops the queue sender or the transport fails.
async fn write_pump<S: FrameSink>(
    identity: Identity,
    mut sink: S,
    mut outbound: mpsc::Receiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(user_id = identity.user_id, error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = sink.send(frame).await {
            debug!(user_id = identity.user_id, error = %e, "write failed, stopping writer");
            break;
        }
    }
}

/// Read frames until the transport closes or fails, forwarding validated
/// messages to the hub. Exits as soon as the hub drops the session (the
/// shutdown channel closes), so a disconnected client cannot keep injecting
/// frames. Always unregisters the session on exit.
async fn read_pump<S: FrameStream>(
    identity: Identity,
    mut stream: S,
    hub: HubHandle,
    mut shutdown: mpsc::Receiver<()>,
) {
    loop {
        let received = tokio::select! {
            // checked first, so no frame is forwarded past a shutdown
            biased;
            _ = shutdown.recv() => {
                debug!(user_id = identity.user_id, "session dropped by hub");
                break;
            }
            received = stream.recv() => received,
        };
        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(user_id = identity.user_id, error = %e, "read failed");
                break;
            }
        };

        let message: Message = match serde_json::from_str(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(user_id = identity.user_id, error = %e, "dropping malformed frame");
                continue;
            }
        };

        // Never forward a frame on behalf of another identity. Dropped
        // without a reply; the sender learns nothing.
        if message.username != identity.username {
            debug!(
                user_id = identity.user_id,
                claimed = %message.username,
                "dropping frame with mismatched sender"
            );
            continue;
        }

        if hub.publish_outbound(message).await.is_err() {
            break;
        }
    }

    let _ = hub.unregister(identity.user_id).await;
    info!(user_id = identity.user_id, "session closed");
}

// --- WebSocket transport (axum) ---

pub struct WsFrameSink {
    inner: SplitSink<ws::WebSocket, ws::Message>,
}

pub struct WsFrameStream {
    inner: SplitStream<ws::WebSocket>,
}

impl SessionTransport for ws::WebSocket {
    type Sink = WsFrameSink;
    type Stream = WsFrameStream;

    fn split(self) -> (Self::Sink, Self::Stream) {
        let (sink, stream) = StreamExt::split(self);
        (WsFrameSink { inner: sink }, WsFrameStream { inner: stream })
    }
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send(&mut self, frame: String) -> HubResult<()> {
        self.inner
            .send(ws::Message::Text(frame))
            .await
            .map_err(|e| HubError::Transport(e.to_string()))
    }
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn recv(&mut self) -> HubResult<Option<String>> {
        loop {
            match self.inner.next().await {
                Some(Ok(ws::Message::Text(text))) => return Ok(Some(text)),
                // close frames are a benign end of stream
                Some(Ok(ws::Message::Close(_))) | None => return Ok(None),
                // binary/ping/pong frames are transport-level noise here
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(HubError::Transport(e.to_string())),
            }
        }
    }
}

// --- In-process transport ---

/// Frame transport over an mpsc channel pair, for tests and in-process
/// clients (the natural partner of [`crate::bus::MemoryBus`]).
pub struct ChannelTransport {
    incoming: mpsc::Receiver<String>,
    outgoing: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Build a transport plus the peer's ends: a sender injecting frames the
    /// session will read (drop it to close the connection), and a receiver
    /// yielding frames the session writes.
    pub fn pair(buffer: usize) -> (Self, mpsc::Sender<String>, mpsc::Receiver<String>) {
        let (in_tx, in_rx) = mpsc::channel(buffer);
        let (out_tx, out_rx) = mpsc::channel(buffer);
        (
            Self {
                incoming: in_rx,
                outgoing: out_tx,
            },
            in_tx,
            out_rx,
        )
    }
}

pub struct ChannelFrameSink {
    tx: mpsc::Sender<String>,
}

pub struct ChannelFrameStream {
    rx: mpsc::Receiver<String>,
}

impl SessionTransport for ChannelTransport {
    type Sink = ChannelFrameSink;
    type Stream = ChannelFrameStream;

    fn split(self) -> (Self::Sink, Self::Stream) {
        (
            ChannelFrameSink { tx: self.outgoing },
            ChannelFrameStream { rx: self.incoming },
        )
    }
}

#[async_trait]
impl FrameSink for ChannelFrameSink {
    async fn send(&mut self, frame: String) -> HubResult<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| HubError::Transport("peer closed".to_string()))
    }
}

#[async_trait]
impl FrameStream for ChannelFrameStream {
    async fn recv(&mut self) -> HubResult<Option<String>> {
        Ok(self.rx.recv().await)
    }
}
