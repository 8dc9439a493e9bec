use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::foundation::error::{PlacerError, PlacerResult};

/// Messages this client sends on the coordination channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Ask for the current order map.
    GetMap,
    /// Identify the client build.
    Brand { brand: String },
    /// Announce an intended placement to observers.
    PlacePixel { x: u32, y: u32, color: u8 },
    Ping,
}

impl ClientMessage {
    pub fn to_text(&self) -> PlacerResult<String> {
        serde_json::to_string(self)
            .map_err(|e| PlacerError::protocol(format!("encode {self:?}: {e}")))
    }
}

/// Events pushed by the coordination server that the placer acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    /// A new order map is available under `file`, relative to the map base URL.
    Map { file: String, reason: Option<String> },
}

#[derive(Deserialize)]
struct RawServerMessage {
    #[serde(rename = "type")]
    kind: String,
    data: Option<Value>,
    reason: Option<String>,
}

/// Decode a server text frame. Unknown, malformed or irrelevant messages yield `None`.
pub fn decode_server_message(text: &str) -> Option<ServerEvent> {
    let msg: RawServerMessage = serde_json::from_str(text).ok()?;
    match msg.kind.to_ascii_lowercase().as_str() {
        "map" => {
            let file = match msg.data? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some(ServerEvent::Map {
                file,
                reason: msg.reason.filter(|r| !r.is_empty()),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/realtime.rs"]
mod tests;
