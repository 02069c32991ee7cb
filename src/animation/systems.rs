use bevy::prelude::*;

use crate::animation::clock::AnimationClock;
use crate::animation::guard::SessionGuard;
use crate::map::TrackLayer;
use crate::render::ColorTable;

/// Drive the clock with the frame delta; each due tick redraws the track
/// layer.
pub fn advance_animation(
    time: Res<Time>,
    mut clock: ResMut<AnimationClock>,
    mut guard: ResMut<SessionGuard>,
    mut colors: ResMut<ColorTable>,
    track: Option<ResMut<TrackLayer>>,
) {
    if !clock.is_running() {
        return;
    }
    let Some(mut track) = track else { return };
    let track = &mut *track;

    clock.advance(
        time.delta(),
        &mut guard,
        &mut track.canvas,
        &mut colors,
        &track.renderer,
    );
}
