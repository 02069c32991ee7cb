//! Geographic math: projection, grid lines, antimeridian cutting and the
//! boundary dataset decoder.

pub mod clip;
pub mod graticule;
pub mod projection;
pub mod topojson;

pub use graticule::Graticule;
pub use projection::{GeoPoint, GeoProjector, PixelPoint};
pub use topojson::{LandFeature, land_features};
