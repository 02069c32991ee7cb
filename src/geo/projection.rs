//! Geographic to canvas projection.
//!
//! Kavrayskiy VII is a compromise pseudocylindrical projection: straight
//! parallels, curved meridians, and a flat pole line. Geographic input is in
//! degrees, output is in canvas pixels with the origin in the top-left corner.

use std::f64::consts::PI;

/// Default scale used for the 960x600 world canvas.
pub const DEFAULT_SCALE: f64 = 170.0;
/// Default resampling tolerance in pixels.
pub const DEFAULT_PRECISION: f64 = 0.1;

const DOMAIN_EPSILON: f64 = 1e-9;
const MAX_RESAMPLE_DEPTH: u32 = 16;
// cos(30deg): segments longer than this arc are always split.
const COS_MIN_DISTANCE: f64 = 0.866_025_403_784_438_6;

/// Longitude/latitude in degrees.
pub type GeoPoint = (f64, f64);
/// Canvas pixel coordinates.
pub type PixelPoint = (f64, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionConfig {
    pub scale: f64,
    pub translate: (f64, f64),
    pub precision: f64,
}

impl ProjectionConfig {
    /// Centered configuration for a canvas of the given size.
    pub fn for_canvas(width: u32, height: u32) -> Self {
        Self {
            scale: DEFAULT_SCALE,
            translate: (width as f64 / 2.0, height as f64 / 2.0),
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Raw Kavrayskiy VII transform on radians.
fn kavrayskiy7(lambda: f64, phi: f64) -> (f64, f64) {
    let x = 3.0 * lambda / (2.0 * PI) * (PI * PI / 3.0 - phi * phi).sqrt();
    (x, phi)
}

/// Pure, immutable projector. Construct once and share by reference.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoProjector {
    config: ProjectionConfig,
}

impl GeoProjector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn for_canvas(width: u32, height: u32) -> Self {
        Self::new(ProjectionConfig::for_canvas(width, height))
    }

    /// Project a point; `None` means the input is outside the cartographic
    /// domain and must not be drawn.
    pub fn project(&self, longitude: f64, latitude: f64) -> Option<PixelPoint> {
        if !in_domain(longitude, latitude) {
            return None;
        }
        let lon = longitude.clamp(-180.0, 180.0).to_radians();
        let lat = latitude.clamp(-90.0, 90.0).to_radians();
        let (x, y) = kavrayskiy7(lon, lat);
        let (tx, ty) = self.config.translate;
        Some((tx + self.config.scale * x, ty - self.config.scale * y))
    }

    /// Project a polyline, inserting great-circle samples wherever the straight
    /// pixel chord would drift more than `precision` from the true curve.
    ///
    /// Out-of-domain vertices break the line, so the result may hold several
    /// runs.
    pub fn project_line(&self, line: &[GeoPoint]) -> Vec<Vec<PixelPoint>> {
        let mut runs = Vec::new();
        let mut current: Vec<PixelPoint> = Vec::new();
        let mut prev: Option<(GeoPoint, PixelPoint)> = None;

        for &geo in line {
            let Some(px) = self.project(geo.0, geo.1) else {
                if current.len() > 1 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                prev = None;
                continue;
            };
            if let Some((prev_geo, prev_px)) = prev {
                self.resample(prev_geo, prev_px, geo, px, MAX_RESAMPLE_DEPTH, &mut current);
            }
            current.push(px);
            prev = Some((geo, px));
        }
        if current.len() > 1 {
            runs.push(current);
        }
        runs
    }

    fn resample(
        &self,
        a: GeoPoint,
        pa: PixelPoint,
        b: GeoPoint,
        pb: PixelPoint,
        depth: u32,
        out: &mut Vec<PixelPoint>,
    ) {
        let delta2 = self.config.precision * self.config.precision;
        let dx = pb.0 - pa.0;
        let dy = pb.1 - pa.1;
        let d2 = dx * dx + dy * dy;
        if depth == 0 || d2 <= 4.0 * delta2 {
            return;
        }

        let ca = to_cartesian(a);
        let cb = to_cartesian(b);
        let cos_ab = dot(ca, cb);
        if cos_ab > 1.0 - 1e-12 {
            return;
        }
        let Some(mid) = great_circle_midpoint(a, ca, cb) else {
            return;
        };
        let Some(pm) = self.project(mid.0, mid.1) else {
            return;
        };

        let dx2 = pm.0 - pa.0;
        let dy2 = pm.1 - pa.1;
        let dz = dy * dx2 - dx * dy2;
        let off_chord = dz * dz / d2 > delta2;
        let off_center = ((dx * dx2 + dy * dy2) / d2 - 0.5).abs() > 0.3;
        if off_chord || off_center || cos_ab < COS_MIN_DISTANCE {
            self.resample(a, pa, mid, pm, depth - 1, out);
            out.push(pm);
            self.resample(mid, pm, b, pb, depth - 1, out);
        }
    }
}

fn in_domain(longitude: f64, latitude: f64) -> bool {
    longitude.is_finite()
        && latitude.is_finite()
        && longitude.abs() <= 180.0 + DOMAIN_EPSILON
        && latitude.abs() <= 90.0 + DOMAIN_EPSILON
}

fn to_cartesian((lon, lat): GeoPoint) -> [f64; 3] {
    let (lambda, phi) = (lon.to_radians(), lat.to_radians());
    [phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin()]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Midpoint of the arc between `ca` and `cb`, keeping the longitude on the
/// side of `a` when the arc runs along the antimeridian.
fn great_circle_midpoint(a: GeoPoint, ca: [f64; 3], cb: [f64; 3]) -> Option<GeoPoint> {
    let m = [ca[0] + cb[0], ca[1] + cb[1], ca[2] + cb[2]];
    let norm = dot(m, m).sqrt();
    if norm < 1e-12 {
        return None;
    }
    let m = [m[0] / norm, m[1] / norm, m[2] / norm];
    let mut lon = m[1].atan2(m[0]).to_degrees();
    let lat = m[2].clamp(-1.0, 1.0).asin().to_degrees();
    if (lon - a.0).abs() > 180.0 {
        lon += if a.0 > lon { 360.0 } else { -360.0 };
    }
    Some((lon.clamp(-180.0, 180.0), lat))
}
