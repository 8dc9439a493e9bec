use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    foundation::{
        core::CanvasLayout,
        error::{PlacerError, PlacerResult},
    },
    placement::client::ClientHeaders,
    realtime::channel::ChannelConfig,
    schedule::{policy::RetryPolicy, scheduler::SchedulerTimings},
};

/// Running more accounts than this from one network address invites bans.
pub const RECOMMENDED_MAX_ACCOUNTS: usize = 4;

/// Longest accepted stagger window.
pub const MAX_STAGGER_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Remote endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Coordination websocket (order maps, announcements).
    pub realtime_url: String,
    /// Order map files are resolved relative to this.
    pub map_base_url: String,
    /// GraphQL over websocket, used for tile lookups.
    pub subscription_url: String,
    /// GraphQL over HTTP, used for placements.
    pub placement_url: String,
    /// Page that embeds the access token for a logged-in session.
    pub token_url: String,
    pub origin: String,
    pub referer: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        let base = "placefrance.noan.dev";
        Self {
            realtime_url: format!("wss://{base}/api/ws"),
            map_base_url: format!("https://{base}/maps"),
            subscription_url: "wss://gql-realtime-2.reddit.com/query".to_string(),
            placement_url: "https://gql-realtime-2.reddit.com/query".to_string(),
            token_url: "https://www.reddit.com/r/place/".to_string(),
            origin: "https://hot-potato.reddit.com".to_string(),
            referer: "https://hot-potato.reddit.com/".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacerConfig {
    pub endpoints: Endpoints,
    /// Announced on the coordination channel as the client brand.
    pub client_tag: String,
    pub user_agent: String,
    /// `apollographql-client-name` header value.
    pub graphql_client_name: String,
    /// Channel owner in the tile subscription.
    pub team_owner: String,
    pub layout: CanvasLayout,
    pub retry: RetryPolicy,
    pub timings: SchedulerTimings,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    pub channel_poll_interval: Duration,
    /// Bound on one tile lookup over the subscription socket.
    pub tile_timeout: Duration,
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            client_tag: format!("rustheadlessV{}", env!("CARGO_PKG_VERSION")),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:98.0) Gecko/20100101 Firefox/98.0"
                .to_string(),
            graphql_client_name: "mona-lisa".to_string(),
            team_owner: "AFD2022".to_string(),
            layout: CanvasLayout::default(),
            retry: RetryPolicy::default(),
            timings: SchedulerTimings::default(),
            keepalive_interval: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(1),
            channel_poll_interval: Duration::from_millis(250),
            tile_timeout: Duration::from_secs(15),
        }
    }
}

impl PlacerConfig {
    pub fn validate(&self) -> PlacerResult<()> {
        CanvasLayout::new(self.layout.tile_width, self.layout.tile_height)?;
        self.retry.validate()?;
        if self.timings.token_refresh.is_zero() {
            return Err(PlacerError::config("token refresh period must be non-zero"));
        }
        if self.timings.stagger_window > MAX_STAGGER_WINDOW {
            return Err(PlacerError::config(format!(
                "stagger window {:?} is longer than {MAX_STAGGER_WINDOW:?}",
                self.timings.stagger_window
            )));
        }
        if self.timings.attempt_grace.is_zero() || self.tile_timeout.is_zero() {
            return Err(PlacerError::config(
                "attempt grace and tile timeout must be non-zero",
            ));
        }
        if self.keepalive_interval.is_zero() || self.channel_poll_interval.is_zero() {
            return Err(PlacerError::config(
                "keepalive and channel poll intervals must be non-zero",
            ));
        }
        let urls = [
            &self.endpoints.realtime_url,
            &self.endpoints.map_base_url,
            &self.endpoints.subscription_url,
            &self.endpoints.placement_url,
            &self.endpoints.token_url,
        ];
        if let Some(empty) = urls.iter().find(|u| u.trim().is_empty()) {
            return Err(PlacerError::config(format!("endpoint url '{empty}' is empty")));
        }
        Ok(())
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.endpoints.realtime_url.clone(),
            client_tag: self.client_tag.clone(),
            keepalive_interval: self.keepalive_interval,
            reconnect_delay: self.reconnect_delay,
            poll_interval: self.channel_poll_interval,
        }
    }

    pub fn client_headers(&self) -> ClientHeaders {
        ClientHeaders {
            origin: self.endpoints.origin.clone(),
            referer: self.endpoints.referer.clone(),
            client_name: self.graphql_client_name.clone(),
        }
    }

    /// Non-blocking warnings about the account set.
    pub fn account_warnings(&self, accounts: usize) -> Vec<String> {
        let mut out = Vec::new();
        if accounts > RECOMMENDED_MAX_ACCOUNTS {
            out.push(format!(
                "running {accounts} accounts from one IP address is not recommended (max {RECOMMENDED_MAX_ACCOUNTS})"
            ));
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
