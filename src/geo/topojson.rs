//! TopoJSON decoding into land polygons.
//!
//! Only the subset used by world atlases is supported: quantized or raw arcs,
//! `Polygon`, `MultiPolygon` and nested `GeometryCollection` objects. Other
//! geometry types are skipped.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::geo::projection::GeoPoint;

pub type Ring = Vec<GeoPoint>;
/// Exterior ring followed by holes.
pub type Polygon = Vec<Ring>;

#[derive(Debug, Clone, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        id: Option<Value>,
        #[serde(default)]
        properties: Option<Map<String, Value>>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        id: Option<Value>,
        #[serde(default)]
        properties: Option<Map<String, Value>>,
    },
    #[serde(other)]
    Unsupported,
}

/// One land area (usually a country) ready for projection.
#[derive(Debug, Clone, PartialEq)]
pub struct LandFeature {
    pub id: Option<String>,
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
}

impl Topology {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).context("invalid topology document")
    }

    /// Decode the named object into land features.
    pub fn features(&self, object: &str) -> Result<Vec<LandFeature>> {
        let root = self
            .objects
            .get(object)
            .with_context(|| format!("topology has no object named {:?}", object))?;
        let arcs = self.decode_arcs();
        let mut features = Vec::new();
        collect_features(root, &arcs, &mut features)?;
        Ok(features)
    }

    /// Absolute coordinates for every arc, undoing quantization and delta
    /// encoding when a transform is present.
    fn decode_arcs(&self) -> Vec<Vec<GeoPoint>> {
        self.arcs
            .iter()
            .map(|arc| match &self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            (x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| (p[0], p[1]))
                    .collect(),
            })
            .collect()
    }
}

/// Decode the named object straight from a TopoJSON body.
pub fn land_features(body: &str, object: &str) -> Result<Vec<LandFeature>> {
    Topology::from_json(body)?.features(object)
}

fn collect_features(
    geometry: &TopoGeometry,
    arcs: &[Vec<GeoPoint>],
    out: &mut Vec<LandFeature>,
) -> Result<()> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for child in geometries {
                collect_features(child, arcs, out)?;
            }
        }
        TopoGeometry::Polygon {
            arcs: rings,
            id,
            properties,
        } => out.push(LandFeature {
            id: id.as_ref().and_then(value_to_string),
            name: feature_name(properties),
            polygons: vec![polygon(rings, arcs)?],
        }),
        TopoGeometry::MultiPolygon {
            arcs: polygons,
            id,
            properties,
        } => out.push(LandFeature {
            id: id.as_ref().and_then(value_to_string),
            name: feature_name(properties),
            polygons: polygons
                .iter()
                .map(|rings| polygon(rings, arcs))
                .collect::<Result<_>>()?,
        }),
        TopoGeometry::Unsupported => {}
    }
    Ok(())
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<GeoPoint>]) -> Result<Polygon> {
    rings.iter().map(|indices| ring(indices, arcs)).collect()
}

/// Stitch arcs into a ring. Consecutive arcs share their joining vertex; a
/// negative index `!i` walks arc `i` backwards.
fn ring(indices: &[i64], arcs: &[Vec<GeoPoint>]) -> Result<Ring> {
    let mut points: Ring = Vec::new();
    for &index in indices {
        let (arc_index, reversed) = if index < 0 {
            (!index as usize, true)
        } else {
            (index as usize, false)
        };
        let arc = arcs
            .get(arc_index)
            .with_context(|| format!("arc index {} out of range", index))?;
        points.pop();
        if reversed {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }
    if points.len() < 4
        && let Some(&first) = points.first()
    {
        points.push(first);
    }
    Ok(points)
}

fn feature_name(properties: &Option<Map<String, Value>>) -> Option<String> {
    properties
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "Topology",
        "transform": { "scale": [1.0, 1.0], "translate": [-10.0, -10.0] },
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": "001", "properties": { "name": "Westland" }, "arcs": [[0, 1]] },
                    { "type": "MultiPolygon", "id": 2, "arcs": [[[-2, 2]]] },
                    { "type": "Point", "coordinates": [0, 0] }
                ]
            }
        },
        "arcs": [
            [[0, 0], [0, 10]],
            [[0, 10], [0, -10]],
            [[0, 10], [10, 0], [0, -10], [-10, 0]]
        ]
    }"#;

    #[test]
    fn test_decodes_delta_encoded_arcs() {
        let topology = Topology::from_json(SAMPLE).unwrap();
        let arcs = topology.decode_arcs();
        assert_eq!(arcs[0], vec![(-10.0, -10.0), (-10.0, 0.0)]);
        // second arc starts fresh: (0,10) then delta (0,-10)
        assert_eq!(arcs[1], vec![(-10.0, 0.0), (-10.0, -10.0)]);
    }

    #[test]
    fn test_features_keep_id_and_name() {
        let features = land_features(SAMPLE, "countries").unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id.as_deref(), Some("001"));
        assert_eq!(features[0].name.as_deref(), Some("Westland"));
        assert_eq!(features[1].id.as_deref(), Some("2"));
        assert_eq!(features[1].name, None);
    }

    #[test]
    fn test_reversed_arc_joins_without_duplicates() {
        let features = land_features(SAMPLE, "countries").unwrap();
        let ring = &features[1].polygons[0][0];
        // arc 1 reversed ends at (-10,0), where arc 2 starts
        assert_eq!(ring[0], (-10.0, -10.0));
        assert_eq!(ring[1], (-10.0, 0.0));
        assert_eq!(ring.len(), 5);
    }

    #[test]
    fn test_missing_object_is_an_error() {
        assert!(land_features(SAMPLE, "land").is_err());
    }

    #[test]
    fn test_bad_arc_index_is_an_error() {
        let body = r#"{"type":"Topology","objects":{"x":{"type":"Polygon","arcs":[[5]]}},"arcs":[]}"#;
        assert!(land_features(body, "x").is_err());
    }
}
