use std::sync::Arc;

use crate::{
    auth::tokens::AccessToken,
    canvas::{bitmap::RgbaBitmap, tiles::assemble},
    foundation::{
        core::{CanvasLayout, Quadrant},
        error::{PlacerError, PlacerResult},
    },
    source::transport::{ImageFetcher, cache_busted},
};

/// Looks up the URL of the current image for one quadrant.
pub trait TileLocator: Send + Sync {
    fn tile_url(&self, quadrant: Quadrant, token: &AccessToken) -> PlacerResult<String>;
}

/// Fetches the four live tiles and assembles them. Nothing is cached between calls.
pub struct LiveCanvasSource {
    locator: Box<dyn TileLocator>,
    images: Arc<dyn ImageFetcher>,
    layout: CanvasLayout,
}

impl LiveCanvasSource {
    pub fn new(
        locator: Box<dyn TileLocator>,
        images: Arc<dyn ImageFetcher>,
        layout: CanvasLayout,
    ) -> Self {
        Self {
            locator,
            images,
            layout,
        }
    }

    pub fn layout(&self) -> CanvasLayout {
        self.layout
    }

    /// Fetch all quadrants in parallel. Any single failure fails the whole snapshot.
    pub fn fetch(&self, token: &AccessToken) -> PlacerResult<RgbaBitmap> {
        let tiles = std::thread::scope(|s| {
            let handles = Quadrant::ALL.map(|q| s.spawn(move || self.fetch_tile(q, token)));
            let mut tiles = Vec::with_capacity(handles.len());
            for (q, handle) in Quadrant::ALL.into_iter().zip(handles) {
                let tile = handle
                    .join()
                    .map_err(|_| PlacerError::transport(format!("tile {q} fetch panicked")))??;
                tiles.push(tile);
            }
            Ok::<_, PlacerError>(tiles)
        })?;

        let tiles: [RgbaBitmap; 4] = tiles
            .try_into()
            .map_err(|_| PlacerError::geometry("expected exactly four tiles"))?;
        assemble(&tiles, self.layout)
    }

    fn fetch_tile(&self, quadrant: Quadrant, token: &AccessToken) -> PlacerResult<RgbaBitmap> {
        let url = self.locator.tile_url(quadrant, token)?;
        let url = cache_busted(&url, rand::random::<u64>());
        tracing::debug!(%quadrant, %url, "fetching live tile");
        self.images.fetch_image(&url)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/live.rs"]
mod tests;
