use crate::foundation::error::{PlacerError, PlacerResult};

/// An opaque 8-bit RGB color.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn from_u24(v: u32) -> Self {
        Self::new((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Parse `#RRGGBB` or `RRGGBB` (case-insensitive).
    pub fn from_hex(s: &str) -> PlacerResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PlacerError::protocol(format!("invalid hex color '{s}'")));
        }
        let v = u32::from_str_radix(hex, 16)
            .map_err(|e| PlacerError::protocol(format!("invalid hex color '{s}': {e}")))?;
        Ok(Self::from_u24(v))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Index into the fixed 32-color palette. Always in `0..32`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct ColorIndex(u8);

impl ColorIndex {
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < PALETTE.len()).then_some(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ColorIndex {
    type Error = PlacerError;

    fn try_from(value: u8) -> PlacerResult<Self> {
        Self::new(value)
            .ok_or_else(|| PlacerError::protocol(format!("color index {value} out of range")))
    }
}

impl From<ColorIndex> for u8 {
    fn from(value: ColorIndex) -> Self {
        value.0
    }
}

pub const PALETTE: [Rgb; 32] = [
    Rgb::from_u24(0x6D001A),
    Rgb::from_u24(0xBE0039),
    Rgb::from_u24(0xFF4500),
    Rgb::from_u24(0xFFA800),
    Rgb::from_u24(0xFFD635),
    Rgb::from_u24(0xFFF8B8),
    Rgb::from_u24(0x00A368),
    Rgb::from_u24(0x00CC78),
    Rgb::from_u24(0x7EED56),
    Rgb::from_u24(0x00756F),
    Rgb::from_u24(0x009EAA),
    Rgb::from_u24(0x00CCC0),
    Rgb::from_u24(0x2450A4),
    Rgb::from_u24(0x3690EA),
    Rgb::from_u24(0x51E9F4),
    Rgb::from_u24(0x493AC1),
    Rgb::from_u24(0x6A5CFF),
    Rgb::from_u24(0x94B3FF),
    Rgb::from_u24(0x811E9F),
    Rgb::from_u24(0xB44AC0),
    Rgb::from_u24(0xE4ABFF),
    Rgb::from_u24(0xDE107F),
    Rgb::from_u24(0xFF3881),
    Rgb::from_u24(0xFF99AA),
    Rgb::from_u24(0x6D482F),
    Rgb::from_u24(0x9C6926),
    Rgb::from_u24(0xFFB470),
    Rgb::from_u24(0x000000),
    Rgb::from_u24(0x515252),
    Rgb::from_u24(0x898D90),
    Rgb::from_u24(0xD4D7D9),
    Rgb::from_u24(0xFFFFFF),
];

/// Palette index of `color`, or [`PlacerError::UnknownColor`].
pub fn index_of(color: Rgb) -> PlacerResult<ColorIndex> {
    PALETTE
        .iter()
        .position(|&c| c == color)
        .map(|i| ColorIndex(i as u8))
        .ok_or(PlacerError::UnknownColor(color))
}

pub fn color_of(index: ColorIndex) -> Rgb {
    PALETTE[index.0 as usize]
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/palette.rs"]
mod tests;
