use crate::{
    canvas::bitmap::RgbaBitmap,
    foundation::error::{PlacerError, PlacerResult},
};

/// Lazy iterator over ordered pixel indices (non-zero alpha), ascending.
///
/// Cheap to clone; a clone restarts from wherever the original currently is.
#[derive(Clone, Debug)]
pub struct RealWork<'a> {
    order: &'a RgbaBitmap,
    next: usize,
}

impl Iterator for RealWork<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let total = self.order.pixel_count();
        while self.next < total {
            let i = self.next;
            self.next += 1;
            if self.order.alpha_at(i) != 0 {
                return Some(i);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.order.pixel_count() - self.next))
    }
}

pub fn real_work(order: &RgbaBitmap) -> RealWork<'_> {
    RealWork { order, next: 0 }
}

/// Keep the positions of `work` whose order color differs from the live canvas.
///
/// Only RGB is compared; canvas alpha is ignored.
pub fn pending_work(
    work: impl IntoIterator<Item = usize>,
    order: &RgbaBitmap,
    canvas: &RgbaBitmap,
) -> PlacerResult<Vec<usize>> {
    if !order.same_size(canvas) {
        return Err(PlacerError::geometry(format!(
            "order is {}x{} but canvas is {}x{}",
            order.width, order.height, canvas.width, canvas.height
        )));
    }
    Ok(work
        .into_iter()
        .filter(|&i| order.rgb_at(i) != canvas.rgb_at(i))
        .collect())
}

/// Counts reported in status lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkSummary {
    pub real: usize,
    pub pending: usize,
}

impl WorkSummary {
    pub fn is_done(self) -> bool {
        self.pending == 0
    }

    /// `100 - ceil(pending * 100 / real)`, or 100 for an empty order.
    pub fn percent_complete(self) -> u32 {
        if self.real == 0 {
            return 100;
        }
        let pending_pct = (self.pending * 100).div_ceil(self.real);
        100u32.saturating_sub(pending_pct as u32)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/work/calc.rs"]
mod tests;
