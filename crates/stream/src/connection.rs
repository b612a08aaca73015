//! One live connection to a streaming endpoint
//!
//! The connection owns the socket and delivers parsed events into the
//! owning buffer, one frame at a time, synchronously with receipt. Frames
//! that fail to parse are dropped, never fatal: diagnostic tooling must not
//! crash on protocol variance across server implementations.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::buffer::EventBuffer;
use crate::error::{Result, StreamError};
use crate::event;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Why frame delivery stopped.
#[derive(Debug)]
pub(crate) enum Disconnect {
    /// Peer closed or the stream ended.
    Remote,
    /// Transport-level read error.
    Transport(String),
    /// The caller disabled the connection.
    Stopped,
}

/// A single live subscription socket.
pub struct StreamConnection {
    socket: WsStream,
    state: ConnectionState,
}

impl StreamConnection {
    /// Open a connection, waiting at most `connect_timeout` for the
    /// handshake to complete.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        debug!(%url, "connecting to stream endpoint");
        match tokio::time::timeout(connect_timeout, connect_async(url)).await {
            Ok(Ok((socket, _response))) => {
                info!(%url, "stream connection open");
                Ok(Self {
                    socket,
                    state: ConnectionState::Open,
                })
            }
            Ok(Err(e)) => Err(StreamError::Transport(e.to_string())),
            Err(_) => Err(StreamError::ConnectTimeout {
                seconds: connect_timeout.as_secs(),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Receive frames until the transport closes or `stop` fires, appending
    /// each successfully parsed event to `buffer` in arrival order. Nothing
    /// is appended once `stop` is observed, even if the transport has
    /// frames buffered.
    pub(crate) async fn deliver(
        &mut self,
        buffer: &EventBuffer,
        stop: &mut watch::Receiver<bool>,
    ) -> Disconnect {
        if *stop.borrow() {
            return self.shutdown().await;
        }
        loop {
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return self.shutdown().await;
                    }
                }
                frame = self.socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => match event::parse_frame(&text) {
                        Ok(event) => buffer.append(event),
                        Err(e) => trace!(error = %e, "dropping unparseable frame"),
                    },
                    Some(Ok(Message::Binary(bytes))) => {
                        match serde_json::from_slice(&bytes) {
                            Ok(event) => buffer.append(event),
                            Err(e) => trace!(error = %e, "dropping unparseable binary frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.state = ConnectionState::Closed;
                        return Disconnect::Remote;
                    }
                    Some(Ok(_)) => {} // ping/pong handled by the transport
                    Some(Err(e)) => {
                        warn!(error = %e, "stream transport error");
                        self.state = ConnectionState::Closed;
                        return Disconnect::Transport(e.to_string());
                    }
                },
            }
        }
    }

    async fn shutdown(&mut self) -> Disconnect {
        let _ = self.socket.close(None).await;
        self.state = ConnectionState::Closed;
        Disconnect::Stopped
    }
}
