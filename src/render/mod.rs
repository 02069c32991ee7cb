//! Drawing surfaces and the two map layers painted on them.

pub mod base_map;
pub mod canvas;
pub mod palette;
pub mod track;

pub use base_map::{BaseMapStyle, MapRenderer};
pub use canvas::{PixelCanvas, Rgba, TextLabel};
pub use palette::ColorTable;
pub use track::{TrackRenderer, TrackStyle};
