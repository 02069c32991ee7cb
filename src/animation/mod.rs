//! Session guard and the ticking animation clock.

use bevy::prelude::*;

pub mod clock;
pub mod guard;
pub mod systems;

pub use clock::AnimationClock;
pub use guard::SessionGuard;

use crate::render::ColorTable;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SessionGuard>()
            .init_resource::<AnimationClock>()
            .init_resource::<ColorTable>()
            .add_systems(Update, systems::advance_animation);
    }
}
