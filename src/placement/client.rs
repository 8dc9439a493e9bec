use std::sync::{Mutex, PoisonError};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    auth::tokens::AccessToken,
    canvas::palette::index_of,
    foundation::{
        core::{CanvasLayout, EpochMillis, Position, SlotId},
        error::{PlacerError, PlacerResult},
    },
    protocol::{
        gql::{PlacementRequest, PlacementResponse, decode_placement_response},
        realtime::ClientMessage,
    },
    realtime::channel::Publisher,
    source::{live::LiveCanvasSource, order::TargetOrder},
    work::calc::{WorkSummary, pending_work},
};

/// Submits one placement and returns the raw response body.
pub trait PlacementApi: Send + Sync {
    fn submit(&self, req: &PlacementRequest, token: &AccessToken) -> PlacerResult<String>;
}

/// Headers the placement endpoint expects from its web client.
#[derive(Clone, Debug)]
pub struct ClientHeaders {
    pub origin: String,
    pub referer: String,
    pub client_name: String,
}

/// `setPixel` over HTTPS.
pub struct HttpPlacementApi {
    client: reqwest::blocking::Client,
    url: String,
    headers: ClientHeaders,
}

impl HttpPlacementApi {
    pub fn new(
        url: impl Into<String>,
        headers: ClientHeaders,
        user_agent: &str,
    ) -> PlacerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PlacerError::transport(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            headers,
        })
    }
}

impl PlacementApi for HttpPlacementApi {
    fn submit(&self, req: &PlacementRequest, token: &AccessToken) -> PlacerResult<String> {
        self.client
            .post(&self.url)
            .header("origin", &self.headers.origin)
            .header("referer", &self.headers.referer)
            .header("apollographql-client-name", &self.headers.client_name)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token.as_str()),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(req.to_body().to_string())
            .send()
            .and_then(|r| r.text())
            .map_err(|e| PlacerError::transport(format!("submit placement: {e}")))
    }
}

/// What one attempt ended with. The scheduler turns this into the slot's next due time.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// No target order has been loaded yet.
    NotReady,
    /// The live canvas snapshot could not be fetched.
    CanvasUnavailable(PlacerError),
    /// Every ordered pixel already matches.
    NothingToDo(WorkSummary),
    Placed {
        pixel: Position,
        next_available: EpochMillis,
    },
    RateLimited {
        next_available: EpochMillis,
    },
    /// The server refused the placement for a reason retrying will not fix.
    Fatal { message: String },
    /// Garbled response, transport hiccup or bad order data.
    Transient(PlacerError),
}

/// Picks one pending position uniformly at random.
pub fn select_pixel(pending: &[usize], rng: &mut impl Rng) -> Option<usize> {
    if pending.is_empty() {
        return None;
    }
    Some(pending[rng.gen_range(0..pending.len())])
}

/// Translate a canvas index into a placement request using the order's color there.
pub fn plan_placement(
    index: usize,
    order: &TargetOrder,
    layout: CanvasLayout,
) -> PlacerResult<(Position, PlacementRequest)> {
    let pixel = layout.position(index);
    let color = index_of(order.bitmap().rgb_at(index))?;
    Ok((
        pixel,
        PlacementRequest {
            local: layout.tile_local(pixel),
            quadrant: layout.quadrant(pixel),
            color,
        },
    ))
}

/// Executes placement attempts: fetch, diff, pick, announce, submit, decode.
///
/// Shared by every slot's attempt thread; only pixel selection takes a lock.
pub struct PlacementClient {
    live: LiveCanvasSource,
    api: Box<dyn PlacementApi>,
    publisher: Box<dyn Publisher>,
    rng: Mutex<StdRng>,
}

impl PlacementClient {
    pub fn new(
        live: LiveCanvasSource,
        api: Box<dyn PlacementApi>,
        publisher: Box<dyn Publisher>,
    ) -> Self {
        Self {
            live,
            api,
            publisher,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a fixed seed for pixel selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    #[tracing::instrument(skip_all, fields(slot = %slot))]
    pub fn attempt(
        &self,
        slot: SlotId,
        order: Option<&TargetOrder>,
        token: &AccessToken,
    ) -> AttemptOutcome {
        let Some(order) = order else {
            return AttemptOutcome::NotReady;
        };

        let canvas = match self.live.fetch(token) {
            Ok(canvas) => canvas,
            Err(e) => return AttemptOutcome::CanvasUnavailable(e),
        };

        let pending = match pending_work(
            order.real_work().iter().copied(),
            order.bitmap(),
            &canvas,
        ) {
            Ok(p) => p,
            Err(e) => return AttemptOutcome::Transient(e),
        };
        let summary = WorkSummary {
            real: order.real_work().len(),
            pending: pending.len(),
        };

        let picked = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            select_pixel(&pending, &mut *rng)
        };
        let Some(index) = picked else {
            return AttemptOutcome::NothingToDo(summary);
        };

        let (pixel, request) = match plan_placement(index, order, self.live.layout()) {
            Ok(planned) => planned,
            Err(e) => return AttemptOutcome::Transient(e),
        };

        tracing::info!(
            "placing pixel at ({}, {}) ({}% complete, {} left)",
            pixel.x,
            pixel.y,
            summary.percent_complete(),
            summary.pending
        );

        self.publisher.publish(ClientMessage::PlacePixel {
            x: pixel.x,
            y: pixel.y,
            color: request.color.get(),
        });

        let body = match self.api.submit(&request, token) {
            Ok(body) => body,
            Err(e) => return AttemptOutcome::Transient(e),
        };

        match decode_placement_response(&body) {
            Ok(PlacementResponse::Placed { next_available }) => AttemptOutcome::Placed {
                pixel,
                next_available,
            },
            Ok(PlacementResponse::RateLimited { next_available }) => {
                AttemptOutcome::RateLimited { next_available }
            }
            Ok(PlacementResponse::Rejected { message }) => AttemptOutcome::Fatal { message },
            Err(e) => AttemptOutcome::Transient(e),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/placement/client.rs"]
mod tests;
