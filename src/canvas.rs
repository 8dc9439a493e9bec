pub mod bitmap;
pub mod palette;
pub mod tiles;
