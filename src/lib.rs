//! Placer is a headless client for a collaborative place-style pixel canvas.
//!
//! It keeps a target image (the *order*), compares it with the live canvas, and places one
//! pixel at a time per account so the canvas converges toward the order while every
//! account respects its cooldown.
//!
//! # Loop overview
//!
//! 1. **Order**: the coordination channel announces a map; it is downloaded once and its
//!    ordered positions (non-transparent pixels) are computed ([`TargetOrder`]).
//! 2. **Snapshot**: each attempt fetches the four live tiles and assembles them
//!    ([`LiveCanvasSource`], [`assemble`]).
//! 3. **Diff**: ordered positions whose color differs form the pending work ([`pending_work`]).
//! 4. **Place**: one pending pixel is chosen at random and submitted ([`PlacementClient`]).
//! 5. **Re-arm**: the outcome decides when the account tries again ([`RetryPolicy`],
//!    [`Scheduler`]).
//!
//! All network collaborators sit behind traits ([`TokenSource`], [`TileLocator`],
//! [`ImageFetcher`], [`PlacementApi`], [`Publisher`]) so the loop can run against fakes.
#![forbid(unsafe_code)]

mod auth;
mod canvas;
mod foundation;
mod placement;
mod protocol;
mod realtime;
mod schedule;
mod source;
mod work;

pub use auth::tokens::{
    AccessToken, RedditTokenSource, SessionCookie, TokenSource, extract_access_token,
    parse_sessions,
};
pub use canvas::bitmap::{CHANNELS, RgbaBitmap, decode_bitmap};
pub use canvas::palette::{ColorIndex, PALETTE, Rgb, color_of, index_of};
pub use canvas::tiles::{assemble, extract_quadrant, join_horizontal, join_vertical};
pub use foundation::config::{
    Endpoints, MAX_STAGGER_WINDOW, PlacerConfig, RECOMMENDED_MAX_ACCOUNTS,
};
pub use foundation::core::{CanvasLayout, EpochMillis, Position, Quadrant, SlotId};
pub use foundation::error::{PlacerError, PlacerResult};
pub use placement::client::{
    AttemptOutcome, ClientHeaders, HttpPlacementApi, PlacementApi, PlacementClient,
    plan_placement, select_pixel,
};
pub use protocol::gql::{
    PlacementRequest, PlacementResponse, SubscriptionFrame, decode_placement_response,
    decode_subscription_frame,
};
pub use protocol::realtime::{ClientMessage, ServerEvent, decode_server_message};
pub use realtime::channel::{ChannelConfig, Publisher, RealtimeChannel, RealtimeHandle};
pub use schedule::clock::{Clock, ManualClock, SystemClock, local_time};
pub use schedule::policy::{Rearm, RetryPolicy};
pub use schedule::scheduler::{PlacerContext, Scheduler, SchedulerTimings, stagger_offset};
pub use schedule::slot::{AccountSlot, SlotState};
pub use source::live::{LiveCanvasSource, TileLocator};
pub use source::order::{OrderLoader, TargetOrder};
pub use source::subscription::GqlTileLocator;
pub use source::transport::{HttpImageFetcher, ImageFetcher, cache_busted};
pub use work::calc::{RealWork, WorkSummary, pending_work, real_work};
