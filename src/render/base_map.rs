//! Static base layer: land, grid lines and the map outline.

use bevy::prelude::*;

use crate::geo::clip::cut_ring;
use crate::geo::{GeoPoint, GeoProjector, Graticule, LandFeature, PixelPoint};
use crate::render::canvas::{PixelCanvas, Rgba};

#[derive(Resource, Clone, Debug)]
pub struct BaseMapStyle {
    pub land_fill: Rgba,
    pub land_stroke: Rgba,
    /// Applied to every base map stroke and fill.
    pub global_alpha: f32,
    pub land_stroke_width: f32,
    pub graticule_stroke: Rgba,
    pub graticule_width: f32,
    pub outline_stroke: Rgba,
    pub outline_width: f32,
}

impl Default for BaseMapStyle {
    fn default() -> Self {
        Self {
            land_fill: Rgba::rgb(0xb3, 0xdd, 0xef),
            land_stroke: Rgba::BLACK,
            global_alpha: 0.7,
            land_stroke_width: 1.0,
            graticule_stroke: Rgba::rgba(220, 220, 220, 0.1),
            graticule_width: 0.1,
            outline_stroke: Rgba::BLACK,
            outline_width: 0.5,
        }
    }
}

/// Paints the base layer once. A second call is a no-op so the layer stays
/// write-once.
pub struct MapRenderer {
    projector: GeoProjector,
    style: BaseMapStyle,
    rendered: bool,
}

impl MapRenderer {
    pub fn new(projector: GeoProjector, style: BaseMapStyle) -> Self {
        Self {
            projector,
            style,
            rendered: false,
        }
    }

    /// Returns `false` when the layer had already been drawn.
    pub fn render_base_map(
        &mut self,
        canvas: &mut PixelCanvas,
        land: &[LandFeature],
        graticule: &Graticule,
    ) -> bool {
        if self.rendered {
            return false;
        }
        let alpha = self.style.global_alpha;
        let fill = self.style.land_fill.with_alpha(self.style.land_fill.a * alpha);
        let stroke = self.style.land_stroke.with_alpha(self.style.land_stroke.a * alpha);

        for feature in land {
            for polygon in &feature.polygons {
                let rings: Vec<Vec<PixelPoint>> = polygon
                    .iter()
                    .flat_map(|ring| cut_ring(ring))
                    .flat_map(|piece| self.project_ring(&piece))
                    .collect();
                canvas.fill_polygon(&rings, fill);
                for ring in &rings {
                    canvas.stroke_polyline(ring, stroke, self.style.land_stroke_width);
                }
            }
        }

        let grid = self
            .style
            .graticule_stroke
            .with_alpha(self.style.graticule_stroke.a * alpha);
        for line in graticule.lines() {
            for run in self.projector.project_line(&line) {
                canvas.stroke_polyline(&run, grid, self.style.graticule_width);
            }
        }

        let outline = self
            .style
            .outline_stroke
            .with_alpha(self.style.outline_stroke.a * alpha);
        for run in self.projector.project_line(&graticule.outline()) {
            canvas.stroke_polyline(&run, outline, self.style.outline_width);
        }

        self.rendered = true;
        true
    }

    /// Project a closed ring; the closing segment is resampled too.
    fn project_ring(&self, ring: &[GeoPoint]) -> Vec<Vec<PixelPoint>> {
        let mut closed = ring.to_vec();
        if let (Some(first), Some(last)) = (ring.first(), ring.last())
            && first != last
        {
            closed.push(*first);
        }
        self.projector.project_line(&closed)
    }
}
