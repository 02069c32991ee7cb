//! Minimal controls around the map: keyboard selection, hint line and a
//! status panel.

use bevy::prelude::*;

pub mod systems;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, systems::setup_ui_text).add_systems(
            Update,
            (
                systems::handle_keys,
                systems::update_hint_text,
                systems::update_status_text,
            )
                .chain(),
        );
    }
}
