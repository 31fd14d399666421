//! `axum` WebSocket adapter implementing `vox-transport`'s `MessageSink`/
//! `MessageSource` so `Transport` never needs to know about a specific web
//! framework.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use vox_foundation::error::{TransportError, VoxError};
use vox_transport::{MessageKind, MessageSink, MessageSource};

pub struct WsSink {
    tx: Mutex<SplitSink<WebSocket, Message>>,
}

pub struct WsSource {
    rx: SplitStream<WebSocket>,
}

/// Splits an upgraded connection into the `Transport`-facing sink and the
/// source the read loop drains.
pub fn split(socket: WebSocket) -> (WsSink, WsSource) {
    let (tx, rx) = socket.split();
    (WsSink { tx: Mutex::new(tx) }, WsSource { rx })
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&self, kind: MessageKind, payload: Vec<u8>) -> Result<(), VoxError> {
        let message = match kind {
            MessageKind::Text => Message::Text(String::from_utf8_lossy(&payload).into_owned()),
            MessageKind::Binary => Message::Binary(payload),
        };
        self.tx
            .lock()
            .await
            .send(message)
            .await
            .map_err(|err| VoxError::Transport(TransportError::Write(err.to_string())))
    }
}

#[async_trait]
impl MessageSource for WsSource {
    async fn recv(&mut self) -> Result<Option<(MessageKind, Vec<u8>)>, VoxError> {
        loop {
            return match self.rx.next().await {
                None => Ok(None),
                Some(Ok(Message::Binary(bytes))) => Ok(Some((MessageKind::Binary, bytes))),
                Some(Ok(Message::Text(text))) => Ok(Some((MessageKind::Text, text.into_bytes()))),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) => Ok(None),
                Some(Err(err)) => Err(VoxError::Transport(TransportError::Read(err.to_string()))),
            };
        }
    }
}
