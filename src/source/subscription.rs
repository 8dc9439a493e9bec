use std::time::{Duration, Instant};

use tungstenite::{Message, client::IntoClientRequest, http::HeaderValue};

use crate::{
    auth::tokens::AccessToken,
    foundation::{
        core::Quadrant,
        error::{PlacerError, PlacerResult},
    },
    protocol::gql::{SubscriptionFrame, connection_init, decode_subscription_frame, subscribe_canvas},
    realtime::socket::{is_timeout, open_socket},
    source::live::TileLocator,
};

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolves tile image URLs through a short-lived `graphql-ws` subscription per quadrant.
pub struct GqlTileLocator {
    url: String,
    origin: String,
    user_agent: String,
    team_owner: String,
    read_timeout: Duration,
}

impl GqlTileLocator {
    pub fn new(
        url: impl Into<String>,
        origin: impl Into<String>,
        user_agent: impl Into<String>,
        team_owner: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            origin: origin.into(),
            user_agent: user_agent.into(),
            team_owner: team_owner.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Upper bound for one lookup, from connect to the announced image.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn request(&self) -> PlacerResult<tungstenite::handshake::client::Request> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| PlacerError::config(format!("tile subscription url '{}': {e}", self.url)))?;
        let header = |v: &str| {
            HeaderValue::from_str(v)
                .map_err(|e| PlacerError::config(format!("invalid header value '{v}': {e}")))
        };
        let headers = request.headers_mut();
        headers.insert("Sec-WebSocket-Protocol", HeaderValue::from_static("graphql-ws"));
        headers.insert("Origin", header(&self.origin)?);
        headers.insert("User-Agent", header(&self.user_agent)?);
        Ok(request)
    }
}

impl TileLocator for GqlTileLocator {
    fn tile_url(&self, quadrant: Quadrant, token: &AccessToken) -> PlacerResult<String> {
        let ws_err = |e: tungstenite::Error| PlacerError::transport(format!("tile {quadrant}: {e}"));
        let timed_out = || {
            PlacerError::transport(format!(
                "tile {quadrant}: no image announced within {:?}",
                self.read_timeout
            ))
        };

        let started = Instant::now();
        let (mut socket, _stream) = open_socket(self.request()?, Some(self.read_timeout))?;
        socket
            .send(Message::text(connection_init(token.as_str()).to_string()))
            .map_err(ws_err)?;
        socket
            .send(Message::text(
                subscribe_canvas(&self.team_owner, quadrant).to_string(),
            ))
            .map_err(ws_err)?;

        loop {
            // Keepalives reset the per-read timeout, so bound the whole lookup as well.
            if started.elapsed() >= self.read_timeout {
                let _ = socket.close(None);
                return Err(timed_out());
            }
            let text = match socket.read() {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    return Err(PlacerError::transport(format!(
                        "tile {quadrant}: subscription closed before an image was announced"
                    )));
                }
                Ok(_) => continue,
                Err(e) if is_timeout(&e) => return Err(timed_out()),
                Err(e) => return Err(ws_err(e)),
            };
            let frame = decode_subscription_frame(text.as_str())?;
            if !matches!(frame, SubscriptionFrame::Ignored) {
                let _ = socket.close(None);
                let _ = socket.flush();
            }
            match frame {
                SubscriptionFrame::Image(url) => return Ok(url),
                SubscriptionFrame::ConnectionError(message) => {
                    return Err(PlacerError::auth(format!(
                        "tile {quadrant} lookup rejected: {message}; the access token may have expired"
                    )));
                }
                SubscriptionFrame::Failed(message) => {
                    return Err(PlacerError::protocol(format!(
                        "tile {quadrant} subscription failed: {message}"
                    )));
                }
                SubscriptionFrame::Completed => {
                    return Err(PlacerError::protocol(format!(
                        "tile {quadrant}: subscription completed before an image was announced"
                    )));
                }
                SubscriptionFrame::Ignored => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/subscription.rs"]
mod tests;
