//! Antimeridian cutting for rings drawn on a flat world map.

use crate::geo::projection::GeoPoint;

// Spacing of synthetic vertices added along the map edge when closing a piece.
const EDGE_STEP_DEG: f64 = 2.5;

/// Split a closed ring wherever it crosses the ±180° meridian and close every
/// piece along the map boundary.
///
/// Pieces that start and end on the same edge are closed along that meridian.
/// Pieces running edge to edge enclose a pole and are closed along the pole
/// line. Rings that never cross are returned untouched.
pub fn cut_ring(ring: &[GeoPoint]) -> Vec<Vec<GeoPoint>> {
    if ring.len() < 2 {
        return Vec::new();
    }

    let mut fragments: Vec<Vec<GeoPoint>> = vec![Vec::new()];
    let mut crossings = 0usize;
    fragments[0].push(ring[0]);

    for pair in ring.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if let Some(lat) = crossing_latitude(a, b) {
            crossings += 1;
            let (edge_out, edge_in) = if a.0 > 0.0 { (180.0, -180.0) } else { (-180.0, 180.0) };
            if let Some(current) = fragments.last_mut() {
                current.push((edge_out, lat));
            }
            fragments.push(vec![(edge_in, lat)]);
        }
        if let Some(current) = fragments.last_mut() {
            current.push(b);
        }
    }

    if crossings == 0 {
        return vec![ring.to_vec()];
    }

    // The ring is cyclic: the trailing fragment continues into the first one.
    let first = fragments.remove(0);
    if let Some(last) = fragments.last_mut() {
        last.extend(first.into_iter().skip(1));
    }

    fragments.into_iter().map(close_fragment).collect()
}

/// Latitude where the segment `a -> b` crosses the antimeridian, if it does.
fn crossing_latitude(a: GeoPoint, b: GeoPoint) -> Option<f64> {
    if (b.0 - a.0).abs() <= 180.0 {
        return None;
    }
    // Unwrap b onto a's side of the dateline and interpolate.
    let (edge, b_lon) = if a.0 > 0.0 { (180.0, b.0 + 360.0) } else { (-180.0, b.0 - 360.0) };
    let span = b_lon - a.0;
    if span.abs() < f64::EPSILON {
        return Some(a.1);
    }
    let t = (edge - a.0) / span;
    Some(a.1 + t * (b.1 - a.1))
}

fn close_fragment(mut fragment: Vec<GeoPoint>) -> Vec<GeoPoint> {
    let (Some(&start), Some(&end)) = (fragment.first(), fragment.last()) else {
        return fragment;
    };

    if start.0.signum() == end.0.signum() {
        fragment.extend(meridian_path(end.0, end.1, start.1));
    } else {
        let mean_lat = fragment.iter().map(|p| p.1).sum::<f64>() / fragment.len() as f64;
        let pole = if mean_lat < 0.0 { -90.0 } else { 90.0 };
        fragment.extend(meridian_path(end.0, end.1, pole));
        fragment.extend(parallel_path(pole, end.0, start.0));
        fragment.extend(meridian_path(start.0, pole, start.1));
    }
    fragment.push(start);
    fragment
}

/// Points strictly after `from_lat` up to and including `to_lat` along a meridian.
fn meridian_path(lon: f64, from_lat: f64, to_lat: f64) -> Vec<GeoPoint> {
    steps(from_lat, to_lat).map(|lat| (lon, lat)).collect()
}

fn parallel_path(lat: f64, from_lon: f64, to_lon: f64) -> Vec<GeoPoint> {
    steps(from_lon, to_lon).map(|lon| (lon, lat)).collect()
}

fn steps(from: f64, to: f64) -> impl Iterator<Item = f64> {
    let count = ((to - from).abs() / EDGE_STEP_DEG).ceil().max(1.0) as usize;
    (1..=count).map(move |i| from + (to - from) * i as f64 / count as f64)
}
