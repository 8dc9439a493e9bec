//! GraphQL wire formats: the `setPixel` mutation and the canvas tile subscription.
//!
//! Both directions are typed. Responses are decoded in a single step into tagged enums so
//! callers never branch on raw JSON shape.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    canvas::palette::ColorIndex,
    foundation::{
        core::{EpochMillis, Position, Quadrant},
        error::{PlacerError, PlacerResult},
    },
};

pub const SET_PIXEL_ACTION: &str = "r/replace:set_pixel";

const SET_PIXEL_QUERY: &str = "mutation setPixel($input: ActInput!) {\n  act(input: $input) {\n    data {\n      ... on BasicMessage {\n        id\n        data {\n          ... on GetUserCooldownResponseMessageData {\n            nextAvailablePixelTimestamp\n            __typename\n          }\n          ... on SetPixelResponseMessageData {\n            timestamp\n            __typename\n          }\n          __typename\n        }\n        __typename\n      }\n      __typename\n    }\n    __typename\n  }\n}\n";

const SUBSCRIBE_QUERY: &str = "subscription replace($input: SubscribeInput!) {\n  subscribe(input: $input) {\n    id\n    ... on BasicMessage {\n      data {\n        __typename\n        ... on FullFrameMessageData {\n          __typename\n          name\n          timestamp\n        }\n      }\n      __typename\n    }\n    __typename\n  }\n}";

/// One pixel placement, already reduced to tile-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlacementRequest {
    /// Coordinate within the quadrant.
    pub local: Position,
    pub quadrant: Quadrant,
    pub color: ColorIndex,
}

impl PlacementRequest {
    pub fn to_body(&self) -> Value {
        json!({
            "operationName": "setPixel",
            "variables": {
                "input": {
                    "actionName": SET_PIXEL_ACTION,
                    "PixelMessageData": {
                        "coordinate": { "x": self.local.x, "y": self.local.y },
                        "colorIndex": self.color.get(),
                        "canvasIndex": self.quadrant.id(),
                    }
                }
            },
            "query": SET_PIXEL_QUERY,
        })
    }
}

/// Decoded result of a `setPixel` call.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacementResponse {
    /// Pixel accepted; the account may place again at the given time.
    Placed { next_available: EpochMillis },
    /// Cooldown still running.
    RateLimited { next_available: EpochMillis },
    /// Any other error reported by the server.
    Rejected { message: String },
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<EnvelopeData>,
    errors: Option<Vec<ErrorEntry>>,
    error: Option<ErrorEntry>,
}

#[derive(Deserialize)]
struct EnvelopeData {
    act: Option<Act>,
}

#[derive(Deserialize)]
struct Act {
    #[serde(default)]
    data: Vec<ActMessage>,
}

#[derive(Deserialize)]
struct ActMessage {
    data: Option<ActPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActPayload {
    next_available_pixel_timestamp: Option<f64>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    message: Option<String>,
    reason: Option<String>,
    extensions: Option<ErrorExtensions>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorExtensions {
    next_available_pixel_ts: Option<f64>,
}

/// Decode a `setPixel` response body.
///
/// Error envelopes take precedence over data. A body that is neither is a protocol error.
pub fn decode_placement_response(body: &str) -> PlacerResult<PlacementResponse> {
    let env: Envelope = serde_json::from_str(body)
        .map_err(|e| PlacerError::protocol(format!("placement response is not JSON: {e}")))?;

    let first_error = env
        .error
        .or_else(|| env.errors.and_then(|errs| errs.into_iter().next()));
    if let Some(err) = first_error {
        if let Some(ts) = err.extensions.and_then(|x| x.next_available_pixel_ts) {
            return Ok(PlacementResponse::RateLimited {
                next_available: ts as EpochMillis,
            });
        }
        let message = err
            .message
            .or(err.reason)
            .unwrap_or_else(|| "Unknown error".to_string());
        return Ok(PlacementResponse::Rejected { message });
    }

    env.data
        .and_then(|d| d.act)
        .and_then(|act| {
            act.data
                .into_iter()
                .filter_map(|m| m.data?.next_available_pixel_timestamp)
                .next()
        })
        .map(|ts| PlacementResponse::Placed {
            next_available: ts as EpochMillis,
        })
        .ok_or_else(|| PlacerError::protocol("placement response carries neither data nor errors"))
}

pub fn connection_init(token: &str) -> Value {
    json!({
        "type": "connection_init",
        "payload": { "Authorization": format!("Bearer {token}") },
    })
}

pub fn subscribe_canvas(team_owner: &str, quadrant: Quadrant) -> Value {
    json!({
        "id": "1",
        "type": "start",
        "payload": {
            "variables": {
                "input": {
                    "channel": {
                        "teamOwner": team_owner,
                        "category": "CANVAS",
                        "tag": quadrant.id().to_string(),
                    }
                }
            },
            "extensions": {},
            "operationName": "replace",
            "query": SUBSCRIBE_QUERY,
        }
    })
}

/// One frame received on the tile subscription socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionFrame {
    /// A full-frame message naming the current tile image.
    Image(String),
    /// The server refused the connection, usually a bad token.
    ConnectionError(String),
    /// The server ended the subscription with an `error` frame.
    Failed(String),
    /// The server ended the subscription with a `complete` frame.
    Completed,
    /// Acks, keepalives, diff frames.
    Ignored,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    payload: Option<Value>,
}

pub fn decode_subscription_frame(text: &str) -> PlacerResult<SubscriptionFrame> {
    let frame: RawFrame = serde_json::from_str(text)
        .map_err(|e| PlacerError::protocol(format!("subscription frame is not JSON: {e}")))?;

    match frame.kind.as_deref() {
        Some("connection_error") => {
            let message = payload_message(frame.payload.as_ref(), "connection rejected");
            return Ok(SubscriptionFrame::ConnectionError(message));
        }
        Some("error") => {
            let message = payload_message(frame.payload.as_ref(), "subscription error");
            return Ok(SubscriptionFrame::Failed(message));
        }
        Some("complete") => return Ok(SubscriptionFrame::Completed),
        _ => {}
    }

    let name = frame
        .payload
        .as_ref()
        .and_then(|p| p.pointer("/data/subscribe/data/name"))
        .and_then(Value::as_str);
    Ok(match name {
        Some(name) => SubscriptionFrame::Image(name.to_string()),
        None => SubscriptionFrame::Ignored,
    })
}

/// `payload.message`, or the first `message` of a `payload` error list.
fn payload_message(payload: Option<&Value>, fallback: &str) -> String {
    let Some(payload) = payload else {
        return fallback.to_string();
    };
    payload
        .get("message")
        .or_else(|| payload.pointer("/0/message"))
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/gql.rs"]
mod tests;
