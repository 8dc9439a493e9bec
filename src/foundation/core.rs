use crate::foundation::error::{PlacerError, PlacerResult};

/// Milliseconds since the UNIX epoch. Server cooldown timestamps use the same unit.
pub type EpochMillis = i64;

/// One of the four tiles composing the canvas.
///
/// Ids follow the upstream tile tags: 0 top-left, 1 top-right, 2 bottom-left, 3 bottom-right.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Quadrant(u8);

impl Quadrant {
    pub const TOP_LEFT: Self = Self(0);
    pub const TOP_RIGHT: Self = Self(1);
    pub const BOTTOM_LEFT: Self = Self(2);
    pub const BOTTOM_RIGHT: Self = Self(3);

    pub const ALL: [Self; 4] = [
        Self::TOP_LEFT,
        Self::TOP_RIGHT,
        Self::BOTTOM_LEFT,
        Self::BOTTOM_RIGHT,
    ];

    pub fn new(id: u8) -> PlacerResult<Self> {
        if id > 3 {
            return Err(PlacerError::geometry(format!("quadrant id {id} out of range")));
        }
        Ok(Self(id))
    }

    pub fn id(self) -> u8 {
        self.0
    }

    pub fn is_right(self) -> bool {
        self.0 % 2 == 1
    }

    pub fn is_bottom(self) -> bool {
        self.0 >= 2
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one account's scheduling track.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SlotId(pub usize);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Absolute pixel position on the composed canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

/// Geometry of the 2x2 tile grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasLayout {
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Default for CanvasLayout {
    fn default() -> Self {
        Self {
            tile_width: 1000,
            tile_height: 1000,
        }
    }
}

impl CanvasLayout {
    pub fn new(tile_width: u32, tile_height: u32) -> PlacerResult<Self> {
        if tile_width == 0 || tile_height == 0 {
            return Err(PlacerError::geometry("tile width/height must be non-zero"));
        }
        Ok(Self {
            tile_width,
            tile_height,
        })
    }

    pub fn width(self) -> u32 {
        self.tile_width * 2
    }

    pub fn height(self) -> u32 {
        self.tile_height * 2
    }

    pub fn pixel_count(self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Row-major linear index to absolute position.
    pub fn position(self, index: usize) -> Position {
        let w = self.width() as usize;
        Position {
            x: (index % w) as u32,
            y: (index / w) as u32,
        }
    }

    pub fn index(self, pos: Position) -> usize {
        pos.y as usize * self.width() as usize + pos.x as usize
    }

    pub fn quadrant(self, pos: Position) -> Quadrant {
        let right = pos.x >= self.tile_width;
        let bottom = pos.y >= self.tile_height;
        match (right, bottom) {
            (false, false) => Quadrant::TOP_LEFT,
            (true, false) => Quadrant::TOP_RIGHT,
            (false, true) => Quadrant::BOTTOM_LEFT,
            (true, true) => Quadrant::BOTTOM_RIGHT,
        }
    }

    /// Position relative to the origin of the tile containing `pos`.
    pub fn tile_local(self, pos: Position) -> Position {
        Position {
            x: pos.x % self.tile_width,
            y: pos.y % self.tile_height,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
