//! Observer/selection model and the position service worker.

use bevy::prelude::*;

pub mod fetcher;
pub mod systems;
pub mod types;

pub use types::{
    CandidateSatellites, ObserverSetting, PositionChannels, PositionCommand, SelectionState,
};

use crate::settings::PositionApiConfig;

pub struct PositionsPlugin;

impl Plugin for PositionsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PositionApiConfig>()
            .init_resource::<ObserverSetting>()
            .init_resource::<CandidateSatellites>()
            .init_resource::<SelectionState>()
            .add_systems(Startup, systems::setup_position_worker)
            .add_systems(
                Update,
                (systems::request_tracking, systems::apply_position_results).chain(),
            );
    }
}
