//! Coordination websocket.
//!
//! A dedicated thread owns the socket. It:
//! - announces itself (`getmap` + `brand`) on every connect,
//! - forwards decoded server events over an mpsc channel,
//! - sends queued outgoing messages and a periodic keepalive, and
//! - reconnects after a fixed delay whenever the connection drops.
//!
//! The thread stops once every [`RealtimeHandle`] or the event receiver is dropped.

use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use tungstenite::{Message, client::IntoClientRequest};

use crate::{
    foundation::error::{PlacerError, PlacerResult},
    protocol::realtime::{ClientMessage, ServerEvent, decode_server_message},
    realtime::socket::{Socket, is_timeout, open_socket},
};

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub url: String,
    /// Sent as the `brand` message after connecting.
    pub client_tag: String,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    /// Socket read timeout; bounds how long outgoing messages wait to be flushed.
    pub poll_interval: Duration,
}

/// Best-effort outgoing message sink.
pub trait Publisher: Send + Sync {
    fn publish(&self, msg: ClientMessage);
}

/// Cloneable handle for queueing messages to the channel thread.
#[derive(Clone, Debug)]
pub struct RealtimeHandle {
    outgoing: Sender<ClientMessage>,
}

impl Publisher for RealtimeHandle {
    fn publish(&self, msg: ClientMessage) {
        // Delivery is not guaranteed; a stopped channel just drops the message.
        let _ = self.outgoing.send(msg);
    }
}

/// A running channel: the publishing handle, the event stream and the pump thread.
pub struct RealtimeChannel {
    pub handle: RealtimeHandle,
    pub events: Receiver<ServerEvent>,
    pub thread: JoinHandle<()>,
}

impl RealtimeChannel {
    pub fn spawn(config: ChannelConfig) -> PlacerResult<Self> {
        let (out_tx, out_rx) = mpsc::channel();
        let (ev_tx, ev_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("realtime".to_string())
            .spawn(move || pump(&config, &out_rx, &ev_tx))
            .map_err(|e| PlacerError::Other(anyhow::Error::new(e).context("spawn realtime thread")))?;
        Ok(Self {
            handle: RealtimeHandle { outgoing: out_tx },
            events: ev_rx,
            thread,
        })
    }
}

enum SessionEnd {
    Shutdown,
    Closed(String),
}

fn pump(config: &ChannelConfig, outgoing: &Receiver<ClientMessage>, events: &Sender<ServerEvent>) {
    loop {
        tracing::info!(url = %config.url, "connecting to coordination server");
        match session(config, outgoing, events) {
            Ok(SessionEnd::Shutdown) => return,
            Ok(SessionEnd::Closed(reason)) => {
                tracing::warn!(%reason, "coordination server disconnected");
            }
            Err(e) => tracing::error!(error = %e, "coordination socket error"),
        }

        // Announcements queued while offline are stale by the time we reconnect.
        loop {
            match outgoing.try_recv() {
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }
        std::thread::sleep(config.reconnect_delay);
    }
}

fn session(
    config: &ChannelConfig,
    outgoing: &Receiver<ClientMessage>,
    events: &Sender<ServerEvent>,
) -> PlacerResult<SessionEnd> {
    let mut socket = connect(config)?;
    tracing::info!("connected to coordination server");

    send(&mut socket, &ClientMessage::GetMap)?;
    send(
        &mut socket,
        &ClientMessage::Brand {
            brand: config.client_tag.clone(),
        },
    )?;
    let mut last_ping = Instant::now();

    loop {
        loop {
            match outgoing.try_recv() {
                Ok(msg) => send(&mut socket, &msg)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }

        if last_ping.elapsed() >= config.keepalive_interval {
            send(&mut socket, &ClientMessage::Ping)?;
            last_ping = Instant::now();
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if let Some(event) = decode_server_message(text.as_str())
                    && events.send(event).is_err()
                {
                    let _ = socket.close(None);
                    return Ok(SessionEnd::Shutdown);
                }
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.as_str().to_owned())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "no reason given".to_string());
                return Ok(SessionEnd::Closed(reason));
            }
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {}
            Err(e) => return Err(PlacerError::transport(format!("coordination socket: {e}"))),
        }
    }
}

fn connect(config: &ChannelConfig) -> PlacerResult<Socket> {
    let request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| PlacerError::config(format!("realtime url '{}': {e}", config.url)))?;
    let (socket, handle) = open_socket(request, None)?;

    // Set after the handshake so the handshake itself never sees a timeout.
    handle
        .set_read_timeout(Some(config.poll_interval))
        .map_err(|e| PlacerError::transport(format!("set read timeout: {e}")))?;
    Ok(socket)
}

fn send(socket: &mut Socket, msg: &ClientMessage) -> PlacerResult<()> {
    socket
        .send(Message::text(msg.to_text()?))
        .map_err(|e| PlacerError::transport(format!("send {msg:?}: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/realtime/channel.rs"]
mod tests;
