use std::{collections::BTreeSet, sync::Mutex};

use super::*;

struct StaticLocator {
    fail: Option<Quadrant>,
}

impl TileLocator for StaticLocator {
    fn tile_url(&self, quadrant: Quadrant, _token: &AccessToken) -> PlacerResult<String> {
        if self.fail == Some(quadrant) {
            return Err(PlacerError::transport("subscription dropped"));
        }
        Ok(format!("mem://tile-{quadrant}.png"))
    }
}

#[derive(Default)]
struct RecordingFetcher {
    urls: Mutex<Vec<String>>,
}

impl ImageFetcher for RecordingFetcher {
    fn fetch_image(&self, url: &str) -> PlacerResult<RgbaBitmap> {
        self.urls.lock().unwrap().push(url.to_string());
        let id = url
            .strip_prefix("mem://tile-")
            .and_then(|s| s.chars().next())
            .and_then(|c| c.to_digit(10))
            .unwrap() as u8;
        Ok(RgbaBitmap::filled(2, 2, [id, 0, 0, 255]))
    }
}

fn source(fail: Option<Quadrant>) -> (LiveCanvasSource, Arc<RecordingFetcher>) {
    let fetcher = Arc::new(RecordingFetcher::default());
    let src = LiveCanvasSource::new(
        Box::new(StaticLocator { fail }),
        fetcher.clone(),
        CanvasLayout::new(2, 2).unwrap(),
    );
    (src, fetcher)
}

#[test]
fn fetch_assembles_all_four_tiles() {
    let (src, fetcher) = source(None);
    let canvas = src.fetch(&AccessToken::new("t")).unwrap();
    assert_eq!((canvas.width, canvas.height), (4, 4));
    assert_eq!(canvas.rgba_at(0)[0], 0);
    assert_eq!(canvas.rgba_at(3)[0], 1);
    assert_eq!(canvas.rgba_at(8)[0], 2);
    assert_eq!(canvas.rgba_at(15)[0], 3);
    assert_eq!(fetcher.urls.lock().unwrap().len(), 4);
}

#[test]
fn every_tile_request_is_cache_busted_uniquely() {
    let (src, fetcher) = source(None);
    src.fetch(&AccessToken::new("t")).unwrap();
    src.fetch(&AccessToken::new("t")).unwrap();
    let urls = fetcher.urls.lock().unwrap();
    assert!(urls.iter().all(|u| u.contains("?noCache=")));
    let unique: BTreeSet<&String> = urls.iter().collect();
    assert_eq!(unique.len(), urls.len());
}

#[test]
fn one_failed_quadrant_fails_the_snapshot() {
    let (src, _) = source(Some(Quadrant::BOTTOM_LEFT));
    let err = src.fetch(&AccessToken::new("t")).unwrap_err();
    assert!(matches!(err, PlacerError::Transport(_)));
}
