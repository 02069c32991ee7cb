//! Keyboard controls, hint line and status panel.

use bevy::prelude::*;

use crate::animation::{AnimationClock, SessionGuard};
use crate::map::{MapLoadState, TrackLayer};
use crate::positions::systems::send_command;
use crate::positions::{
    CandidateSatellites, ObserverSetting, PositionChannels, PositionCommand, SelectionState,
};
use crate::settings::PositionApiConfig;

#[derive(Component)]
pub struct HintText;

#[derive(Component)]
pub struct StatusText;

const DIGIT_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

pub fn setup_ui_text(mut commands: Commands) {
    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.2, 0.2, 0.2)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
        StatusText,
    ));
    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgb(0.8, 0.3, 0.1)),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            left: Val::Px(8.0),
            ..default()
        },
        HintText,
    ));
}

#[allow(clippy::too_many_arguments)]
pub fn handle_keys(
    input: Res<ButtonInput<KeyCode>>,
    mut selection: ResMut<SelectionState>,
    mut candidates: ResMut<CandidateSatellites>,
    mut guard: ResMut<SessionGuard>,
    mut clock: ResMut<AnimationClock>,
    setting: Res<ObserverSetting>,
    api: Res<PositionApiConfig>,
    channels: Option<Res<PositionChannels>>,
    track: Option<ResMut<TrackLayer>>,
) {
    for (index, key) in DIGIT_KEYS.iter().enumerate() {
        if input.just_pressed(*key) {
            toggle_candidate(&mut selection, &candidates, index);
        }
    }

    // The track action is disabled while an animation runs.
    if input.just_pressed(KeyCode::KeyT) && !guard.is_animating() {
        selection.submit();
    }

    if input.just_pressed(KeyCode::KeyN)
        && !candidates.loading
        && let Some(channels) = channels
    {
        candidates.loading = true;
        let cmd = PositionCommand::FetchNearby {
            setting: setting.clone(),
            category: api.category,
        };
        send_command(&channels.cmd_tx, cmd, &mut guard, &mut candidates);
    }

    if input.just_pressed(KeyCode::Escape)
        && let Some(mut track) = track
    {
        clock.stop(&mut guard, &mut track.canvas);
    }
}

/// Flip candidate `index` in the edited selection. Out of range is ignored.
pub fn toggle_candidate(
    selection: &mut SelectionState,
    candidates: &CandidateSatellites,
    index: usize,
) -> bool {
    let Some(candidate) = candidates.items.get(index) else {
        return false;
    };
    let checked = !selection.editing.contains(candidate.id);
    selection.editing.toggle(candidate.clone(), checked);
    true
}

pub fn update_hint_text(guard: Res<SessionGuard>, mut query: Query<&mut Text, With<HintText>>) {
    if !guard.is_changed() {
        return;
    }
    for mut text in query.iter_mut() {
        if text.0 != guard.hint() {
            text.0 = guard.hint().to_string();
        }
    }
}

pub fn update_status_text(
    guard: Res<SessionGuard>,
    selection: Res<SelectionState>,
    candidates: Res<CandidateSatellites>,
    map_state: Res<MapLoadState>,
    mut query: Query<&mut Text, With<StatusText>>,
) {
    let status = status_lines(&guard, &selection, &candidates, &map_state);
    for mut text in query.iter_mut() {
        if text.0 != status {
            text.0 = status.clone();
        }
    }
}

pub fn status_lines(
    guard: &SessionGuard,
    selection: &SelectionState,
    candidates: &CandidateSatellites,
    map_state: &MapLoadState,
) -> String {
    let mut lines = Vec::new();
    if let Some(err) = &map_state.error {
        lines.push(format!("Map unavailable: {}", err));
    } else if map_state.features == 0 {
        lines.push("Loading map...".to_string());
    }
    if guard.is_fetching_positions() {
        lines.push("Loading positions...".to_string());
    } else if guard.is_animating() {
        lines.push("Tracking (Esc to stop)".to_string());
    }

    if candidates.loading {
        lines.push("Searching nearby satellites...".to_string());
    } else if let Some(err) = &candidates.error {
        lines.push(format!("Nearby search failed: {}", err));
    }

    for (index, candidate) in candidates.items.iter().take(DIGIT_KEYS.len()).enumerate() {
        let mark = if selection.editing.contains(candidate.id) { "x" } else { " " };
        lines.push(format!(
            "[{}] {} {} ({})",
            mark,
            index + 1,
            candidate.name,
            candidate.id
        ));
    }

    let track = if guard.is_animating() {
        "T: track (disabled)"
    } else {
        "T: track"
    };
    lines.push(format!("1-9: select  {}  N: nearby", track));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::types::SatelliteDescriptor;

    fn candidates() -> CandidateSatellites {
        CandidateSatellites {
            items: vec![
                SatelliteDescriptor::new(25544, "SPACE STATION"),
                SatelliteDescriptor::new(48274, "CSS (TIANHE)"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_toggle_candidate_flips_membership() {
        let mut selection = SelectionState::default();
        let candidates = candidates();

        assert!(toggle_candidate(&mut selection, &candidates, 1));
        assert!(selection.editing.contains(48274));
        assert!(toggle_candidate(&mut selection, &candidates, 1));
        assert!(!selection.editing.contains(48274));
        assert!(!toggle_candidate(&mut selection, &candidates, 5));
        assert_eq!(selection.revision, 0);
    }

    #[test]
    fn test_status_reflects_guard_flags() {
        let mut guard = SessionGuard::default();
        let mut selection = SelectionState::default();
        let candidates = candidates();
        toggle_candidate(&mut selection, &candidates, 0);
        let map = MapLoadState {
            features: 177,
            error: None,
        };

        let idle = status_lines(&guard, &selection, &candidates, &map);
        assert!(idle.contains("[x] 1 SPACE STATION (25544)"));
        assert!(idle.contains("[ ] 2 CSS (TIANHE) (48274)"));
        assert!(!idle.contains("Loading"));

        guard.request_fetch().unwrap();
        let fetching = status_lines(&guard, &selection, &candidates, &map);
        assert!(fetching.contains("Loading positions"));

        guard.begin_running();
        let running = status_lines(&guard, &selection, &candidates, &map);
        assert!(running.contains("T: track (disabled)"));
    }

    #[test]
    fn test_status_reports_map_loading() {
        let guard = SessionGuard::default();
        let selection = SelectionState::default();
        let candidates = candidates();

        let loading = status_lines(&guard, &selection, &candidates, &MapLoadState::default());
        assert!(loading.contains("Loading map..."));

        let failed = MapLoadState {
            features: 0,
            error: Some("HTTP 404".to_string()),
        };
        let text = status_lines(&guard, &selection, &candidates, &failed);
        assert!(text.contains("Map unavailable: HTTP 404"));
        assert!(!text.contains("Loading map"));
    }
}
