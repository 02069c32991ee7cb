//! Per-tick satellite markers on the track layer.

use bevy::prelude::*;
use chrono::{DateTime, Utc};

use crate::geo::GeoProjector;
use crate::positions::types::{PositionSample, PositionTimeline, SatelliteDescriptor};
use crate::render::canvas::{PixelCanvas, Rgba, TextLabel};
use crate::render::palette::ColorTable;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Resource, Clone, Debug)]
pub struct TrackStyle {
    pub marker_radius: f64,
    pub label_size: f32,
    /// Distance from the marker center down to the label baseline.
    pub label_offset: f32,
    pub time_label_size: f32,
    pub time_label_color: Rgba,
    pub time_label_y: f32,
}

impl Default for TrackStyle {
    fn default() -> Self {
        Self {
            marker_radius: 4.0,
            label_size: 11.0,
            label_offset: 14.0,
            time_label_size: 14.0,
            time_label_color: Rgba::rgb(0x33, 0x33, 0x33),
            time_label_y: 10.0,
        }
    }
}

pub struct TrackRenderer {
    projector: GeoProjector,
    style: TrackStyle,
}

impl TrackRenderer {
    pub fn new(projector: GeoProjector, style: TrackStyle) -> Self {
        Self { projector, style }
    }

    /// Draw every timeline's sample at `cursor`. Satellites with a missing
    /// coordinate or an unprojectable position are skipped for this tick.
    /// Returns the number of markers drawn.
    pub fn draw_tick(
        &self,
        canvas: &mut PixelCanvas,
        colors: &mut ColorTable,
        timelines: &[PositionTimeline],
        cursor: usize,
    ) -> usize {
        let mut drawn = 0;
        for timeline in timelines {
            let Some(sample) = timeline.samples.get(cursor) else {
                continue;
            };
            if self.draw_satellite(canvas, colors, &timeline.satellite, sample) {
                drawn += 1;
            }
        }
        drawn
    }

    fn draw_satellite(
        &self,
        canvas: &mut PixelCanvas,
        colors: &mut ColorTable,
        satellite: &SatelliteDescriptor,
        sample: &PositionSample,
    ) -> bool {
        let Some((longitude, latitude)) = sample.coordinates() else {
            return false;
        };
        let Some((x, y)) = self.projector.project(longitude, latitude) else {
            return false;
        };

        let color = colors.color_for(satellite.id);
        canvas.fill_circle(x, y, self.style.marker_radius, color);
        canvas.fill_text(TextLabel {
            text: satellite.label(),
            x: x as f32,
            y: y as f32 + self.style.label_offset,
            size: self.style.label_size,
            color,
        });
        true
    }

    /// Simulated clock, centered at the top of the layer.
    pub fn draw_time_label(&self, canvas: &mut PixelCanvas, time: DateTime<Utc>) {
        let x = canvas.width() as f32 / 2.0;
        canvas.fill_text(TextLabel {
            text: time.format(TIME_FORMAT).to_string(),
            x,
            y: self.style.time_label_y,
            size: self.style.time_label_size,
            color: self.style.time_label_color,
        });
    }
}
