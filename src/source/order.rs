use std::sync::Arc;

use crate::{
    canvas::bitmap::RgbaBitmap,
    foundation::{
        core::CanvasLayout,
        error::{PlacerError, PlacerResult},
    },
    source::transport::ImageFetcher,
    work::calc::real_work,
};

/// Immutable snapshot of the desired canvas plus its ordered positions.
#[derive(Clone, Debug)]
pub struct TargetOrder {
    bitmap: RgbaBitmap,
    real_work: Vec<usize>,
}

impl TargetOrder {
    pub fn new(bitmap: RgbaBitmap, layout: CanvasLayout) -> PlacerResult<Self> {
        if bitmap.width != layout.width() || bitmap.height != layout.height() {
            return Err(PlacerError::geometry(format!(
                "order map is {}x{}, canvas is {}x{}",
                bitmap.width,
                bitmap.height,
                layout.width(),
                layout.height()
            )));
        }
        let real_work = real_work(&bitmap).collect();
        Ok(Self { bitmap, real_work })
    }

    pub fn bitmap(&self) -> &RgbaBitmap {
        &self.bitmap
    }

    /// Ordered positions, ascending.
    pub fn real_work(&self) -> &[usize] {
        &self.real_work
    }
}

/// Resolves map notifications into loaded orders.
pub struct OrderLoader {
    images: Arc<dyn ImageFetcher>,
    map_base_url: String,
    layout: CanvasLayout,
}

impl OrderLoader {
    pub fn new(
        images: Arc<dyn ImageFetcher>,
        map_base_url: impl Into<String>,
        layout: CanvasLayout,
    ) -> Self {
        Self {
            images,
            map_base_url: map_base_url.into(),
            layout,
        }
    }

    pub fn map_url(&self, file: &str) -> String {
        format!("{}/{}", self.map_base_url.trim_end_matches('/'), file)
    }

    pub fn load(&self, file: &str) -> PlacerResult<Arc<TargetOrder>> {
        let bitmap = self.images.fetch_image(&self.map_url(file))?;
        Ok(Arc::new(TargetOrder::new(bitmap, self.layout)?))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/order.rs"]
mod tests;
