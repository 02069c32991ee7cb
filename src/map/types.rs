//! Layer surfaces and the base map worker channel.

use bevy::prelude::*;
use std::sync::{Arc, Mutex, mpsc::Receiver};

use crate::geo::LandFeature;
use crate::render::{MapRenderer, PixelCanvas, TrackRenderer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Base,
    Track,
}

impl LayerKind {
    /// Sprite depth; labels sit just above their layer.
    pub fn z(self) -> f32 {
        match self {
            LayerKind::Base => 0.0,
            LayerKind::Track => 1.0,
        }
    }
}

#[derive(Component)]
pub struct LayerLabel(pub LayerKind);

/// Persistent base map surface, painted once.
#[derive(Resource)]
pub struct BaseLayer {
    pub canvas: PixelCanvas,
    pub renderer: MapRenderer,
    pub image: Handle<Image>,
    pub synced_revision: u64,
}

/// Track surface, cleared and redrawn every tick.
#[derive(Resource)]
pub struct TrackLayer {
    pub canvas: PixelCanvas,
    pub renderer: TrackRenderer,
    pub image: Handle<Image>,
    pub synced_revision: u64,
}

pub enum MapResult {
    Land(Vec<LandFeature>),
    Failed(String),
}

#[derive(Resource)]
pub struct MapChannels {
    pub res_rx: Arc<Mutex<Receiver<MapResult>>>,
}

#[derive(Resource, Debug, Default)]
pub struct MapLoadState {
    pub features: usize,
    pub error: Option<String>,
}
