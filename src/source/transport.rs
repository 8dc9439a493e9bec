use crate::{
    canvas::bitmap::{RgbaBitmap, decode_bitmap},
    foundation::error::{PlacerError, PlacerResult},
};

/// Downloads and decodes an image (order maps and live tiles).
pub trait ImageFetcher: Send + Sync {
    fn fetch_image(&self, url: &str) -> PlacerResult<RgbaBitmap>;
}

/// Blocking HTTP image fetcher.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    pub fn new(user_agent: &str) -> PlacerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PlacerError::transport(format!("build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch_image(&self, url: &str) -> PlacerResult<RgbaBitmap> {
        let resp = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| PlacerError::transport(format!("fetch image '{url}': {e}")))?;
        let bytes = resp
            .bytes()
            .map_err(|e| PlacerError::transport(format!("read image body '{url}': {e}")))?;
        decode_bitmap(&bytes)
            .map_err(|e| PlacerError::transport(format!("decode image '{url}': {e}")))
    }
}

/// Append a `noCache` query parameter so intermediaries never serve a stale tile.
pub fn cache_busted(url: &str, nonce: u64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}noCache={nonce}")
}

#[cfg(test)]
#[path = "../../tests/unit/source/transport.rs"]
mod tests;
