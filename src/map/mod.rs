//! World map host: base and track layers, boundary download.

use bevy::prelude::*;

pub mod fetcher;
pub mod systems;
pub mod types;

pub use types::{MapLoadState, TrackLayer};

use crate::render::{BaseMapStyle, TrackStyle};
use crate::settings::MapConfig;

pub struct MapPlugin;

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapConfig>()
            .init_resource::<BaseMapStyle>()
            .init_resource::<TrackStyle>()
            .init_resource::<MapLoadState>()
            .add_systems(
                Startup,
                (systems::setup_layers, systems::setup_map_worker),
            )
            .add_systems(
                Update,
                (systems::apply_map_result, systems::sync_base_layer).chain(),
            )
            .add_systems(PostUpdate, systems::sync_track_layer);
    }
}
