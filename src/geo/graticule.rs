//! Latitude/longitude grid lines and the world outline.

use crate::geo::projection::GeoPoint;

const EPSILON: f64 = 1e-6;

/// Grid generator. Major lines span the full globe, minor lines stop short of
/// the poles so the high latitudes stay readable.
#[derive(Clone, Debug)]
pub struct Graticule {
    pub major_step: (f64, f64),
    pub minor_step: (f64, f64),
    pub major_extent: [(f64, f64); 2],
    pub minor_extent: [(f64, f64); 2],
    /// Sampling distance along each line, degrees.
    pub precision: f64,
}

impl Default for Graticule {
    fn default() -> Self {
        Self {
            major_step: (90.0, 360.0),
            minor_step: (10.0, 10.0),
            major_extent: [(-180.0, -90.0 + EPSILON), (180.0, 90.0 - EPSILON)],
            minor_extent: [(-180.0, -80.0 - EPSILON), (180.0, 80.0 + EPSILON)],
            precision: 2.5,
        }
    }
}

impl Graticule {
    /// All grid lines, meridians first.
    pub fn lines(&self) -> Vec<Vec<GeoPoint>> {
        let [(mx0, my0), (mx1, my1)] = self.major_extent;
        let [(x0, y0), (x1, y1)] = self.minor_extent;
        let (major_dx, major_dy) = self.major_step;
        let (dx, dy) = self.minor_step;

        let mut lines = Vec::new();
        for x in range(mx0, mx1, major_dx) {
            lines.push(self.meridian(x, my0, my1));
        }
        for y in range(my0, my1, major_dy) {
            lines.push(self.parallel(y, mx0, mx1));
        }
        for x in range(x0, x1, dx).filter(|x| (x % major_dx).abs() > EPSILON) {
            lines.push(self.meridian(x, y0, y1));
        }
        for y in range(y0, y1, dy).filter(|y| (y % major_dy).abs() > EPSILON) {
            lines.push(self.parallel(y, x0, x1));
        }
        lines
    }

    /// Closed ring around the major extent.
    pub fn outline(&self) -> Vec<GeoPoint> {
        let [(x0, y0), (x1, y1)] = self.major_extent;
        let mut ring = self.meridian(x0, y0, y1);
        ring.extend(self.parallel(y1, x0, x1).into_iter().skip(1));
        ring.extend(self.meridian(x1, y1, y0).into_iter().skip(1));
        ring.extend(self.parallel(y0, x1, x0).into_iter().skip(1));
        ring
    }

    fn meridian(&self, lon: f64, lat_from: f64, lat_to: f64) -> Vec<GeoPoint> {
        sample(lat_from, lat_to, self.precision)
            .into_iter()
            .map(|lat| (lon, lat))
            .collect()
    }

    fn parallel(&self, lat: f64, lon_from: f64, lon_to: f64) -> Vec<GeoPoint> {
        sample(lon_from, lon_to, self.precision)
            .into_iter()
            .map(|lon| (lon, lat))
            .collect()
    }
}

/// Multiples of `step` in `[start, stop)`, starting from the first multiple
/// at or above `start`.
fn range(start: f64, stop: f64, step: f64) -> impl Iterator<Item = f64> {
    let first = (start / step).ceil() * step;
    let count = ((stop - first) / step).ceil().max(0.0) as usize;
    (0..count).map(move |i| first + i as f64 * step)
}

/// Evenly spaced samples from `from` to `to`, both ends included.
fn sample(from: f64, to: f64, spacing: f64) -> Vec<f64> {
    let count = ((to - from).abs() / spacing).ceil().max(1.0) as usize;
    (0..=count)
        .map(|i| from + (to - from) * i as f64 / count as f64)
        .collect()
}
