//! Systems turning selection changes into fetches and fetch results into
//! animation sessions.

use bevy::prelude::*;
use chrono::{DateTime, Utc};
use std::sync::mpsc::{SendError, Sender};

use crate::animation::{AnimationClock, SessionGuard};
use crate::positions::fetcher::start_position_worker;
use crate::positions::types::{
    CandidateSatellites, ObserverSetting, PositionChannels, PositionCommand, PositionResult,
    SelectionChange, SelectionState,
};
use crate::settings::PositionApiConfig;

pub fn setup_position_worker(mut commands: Commands, api: Res<PositionApiConfig>) {
    if api.api_key.is_empty() {
        warn!("[INIT] no position API key configured, set SATMAP_API_KEY");
    }
    let channels = start_position_worker(api.clone());
    info!("[INIT] Position worker started");
    commands.insert_resource(channels);
}

pub fn request_tracking(
    selection: Res<SelectionState>,
    setting: Res<ObserverSetting>,
    mut guard: ResMut<SessionGuard>,
    mut candidates: ResMut<CandidateSatellites>,
    channels: Option<Res<PositionChannels>>,
    mut last_seen: Local<u64>,
) {
    let Some(channels) = channels else { return };
    let change = SelectionChange::detect(*last_seen, &selection);
    *last_seen = selection.revision;

    if let Some(cmd) = command_for_change(change, &setting, &mut guard) {
        send_command(&channels.cmd_tx, cmd, &mut guard, &mut candidates);
    }
}

/// Hand a command to the worker. If the worker is gone the command fails
/// at once, so neither the guard nor the candidate list waits for a reply.
pub fn send_command(
    cmd_tx: &Sender<PositionCommand>,
    cmd: PositionCommand,
    guard: &mut SessionGuard,
    candidates: &mut CandidateSatellites,
) {
    let Err(SendError(cmd)) = cmd_tx.send(cmd) else {
        return;
    };
    match cmd {
        PositionCommand::FetchTimelines { request, .. } => {
            if guard.fetch_failed(request) {
                error!("[POSITIONS] request={} not sent: worker stopped", request);
            }
        }
        PositionCommand::FetchNearby { .. } => {
            error!("[NEARBY] not sent: worker stopped");
            candidates.loading = false;
            candidates.error = Some("position worker stopped".to_string());
        }
    }
}

/// Selection change → fetch command, gated by the guard. A change while an
/// animation runs is dropped and the guard shows its hint.
pub fn command_for_change(
    change: SelectionChange,
    setting: &ObserverSetting,
    guard: &mut SessionGuard,
) -> Option<PositionCommand> {
    let SelectionChange::NewSelection(selection) = change else {
        return None;
    };
    if selection.is_empty() {
        warn!("[POSITIONS] nothing selected");
        return None;
    }
    match guard.request_fetch() {
        Ok(request) => {
            info!(
                "[POSITIONS] request={} fetching {} satellites over {} s",
                request,
                selection.len(),
                setting.window_seconds()
            );
            Some(PositionCommand::FetchTimelines {
                request,
                setting: setting.clone(),
                selection,
            })
        }
        Err(err) => {
            warn!("[POSITIONS] selection dropped: {}", err);
            None
        }
    }
}

pub fn apply_position_results(
    channels: Option<Res<PositionChannels>>,
    mut guard: ResMut<SessionGuard>,
    mut clock: ResMut<AnimationClock>,
    mut candidates: ResMut<CandidateSatellites>,
) {
    let Some(channels) = channels else { return };
    let Ok(rx) = channels.res_rx.lock() else {
        return;
    };

    while let Ok(msg) = rx.try_recv() {
        handle_position_result(msg, &mut guard, &mut clock, &mut candidates, Utc::now());
    }
}

pub fn handle_position_result(
    msg: PositionResult,
    guard: &mut SessionGuard,
    clock: &mut AnimationClock,
    candidates: &mut CandidateSatellites,
    now: DateTime<Utc>,
) {
    match msg {
        PositionResult::Timelines { request, timelines } => {
            if !guard.is_current(request) {
                info!("[POSITIONS] request={} superseded, result dropped", request);
                return;
            }
            if let Err(err) = clock.start(guard, timelines, now) {
                error!("[ANIMATION] not started: {}", err);
            }
        }
        PositionResult::TimelinesFailed { request, error } => {
            if guard.fetch_failed(request) {
                error!("[POSITIONS] request={} failed: {}", request, error);
            }
        }
        PositionResult::Nearby(satellites) => {
            candidates.items = satellites;
            candidates.loading = false;
            candidates.error = None;
        }
        PositionResult::NearbyFailed(err) => {
            candidates.loading = false;
            candidates.error = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clock::{TICK_INTERVAL, TickOutcome};
    use crate::animation::guard::SessionStatus;
    use crate::error::TrackError;
    use crate::geo::GeoProjector;
    use crate::positions::fetcher::fetch_timelines;
    use crate::positions::types::{
        PositionSample, PositionTimeline, PositionsResponse, SatelliteDescriptor,
        SatelliteSelection,
    };
    use crate::render::{ColorTable, PixelCanvas, TrackRenderer, TrackStyle};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn two_satellites() -> SatelliteSelection {
        SatelliteSelection::from_descriptors([
            SatelliteDescriptor::new(25544, "SPACE STATION"),
            SatelliteDescriptor::new(48274, "CSS (TIANHE)"),
        ])
    }

    fn submitted(selection: SatelliteSelection) -> SelectionChange {
        let mut state = SelectionState {
            editing: selection,
            ..Default::default()
        };
        state.submit();
        SelectionChange::detect(0, &state)
    }

    fn timeline(id: u32, len: usize) -> PositionTimeline {
        PositionTimeline {
            satellite: SatelliteDescriptor::new(id, "SAT"),
            samples: vec![
                PositionSample {
                    longitude: Some(0.0),
                    latitude: Some(0.0),
                    timestamp: 0,
                };
                len
            ],
        }
    }

    #[test]
    fn test_no_change_sends_nothing() {
        let mut guard = SessionGuard::default();
        let cmd = command_for_change(SelectionChange::NoChange, &ObserverSetting::default(), &mut guard);
        assert!(cmd.is_none());
        assert_eq!(guard.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_empty_selection_sends_nothing() {
        let mut guard = SessionGuard::default();
        let cmd = command_for_change(
            submitted(SatelliteSelection::new()),
            &ObserverSetting::default(),
            &mut guard,
        );
        assert!(cmd.is_none());
        assert_eq!(guard.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_change_while_running_is_dropped_with_hint() {
        let mut guard = SessionGuard::default();
        let mut clock = AnimationClock::default();
        let request = guard.request_fetch().unwrap();
        let mut candidates = CandidateSatellites::default();
        handle_position_result(
            PositionResult::Timelines {
                request,
                timelines: vec![timeline(25544, 120)],
            },
            &mut guard,
            &mut clock,
            &mut candidates,
            now(),
        );
        assert!(guard.is_animating());

        let cmd = command_for_change(submitted(two_satellites()), &ObserverSetting::default(), &mut guard);
        assert!(cmd.is_none());
        assert!(!guard.hint().is_empty());
        assert_eq!(clock.session().unwrap().timelines()[0].satellite.id, 25544);
    }

    #[test]
    fn test_failed_fetch_leaves_guard_idle() {
        let mut guard = SessionGuard::default();
        let mut clock = AnimationClock::default();
        let request = guard.request_fetch().unwrap();
        handle_position_result(
            PositionResult::TimelinesFailed {
                request,
                error: TrackError::Transport("HTTP 503".to_string()),
            },
            &mut guard,
            &mut clock,
            &mut CandidateSatellites::default(),
            now(),
        );
        assert_eq!(guard.status(), SessionStatus::Idle);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_superseded_result_is_ignored() {
        let mut guard = SessionGuard::default();
        let mut clock = AnimationClock::default();
        let stale = guard.request_fetch().unwrap();
        let current = guard.request_fetch().unwrap();
        handle_position_result(
            PositionResult::Timelines {
                request: stale,
                timelines: vec![timeline(1, 60)],
            },
            &mut guard,
            &mut clock,
            &mut CandidateSatellites::default(),
            now(),
        );
        assert!(!clock.is_running());
        assert!(guard.is_current(current));
    }

    #[test]
    fn test_nearby_replaces_candidates() {
        let mut candidates = CandidateSatellites {
            loading: true,
            ..Default::default()
        };
        handle_position_result(
            PositionResult::Nearby(vec![SatelliteDescriptor::new(44714, "STARLINK-1130")]),
            &mut SessionGuard::default(),
            &mut AnimationClock::default(),
            &mut candidates,
            now(),
        );
        assert!(!candidates.loading);
        assert_eq!(candidates.items.len(), 1);
    }

    #[test]
    fn test_send_to_stopped_worker_fails_fetch() {
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
        drop(cmd_rx);
        let mut guard = SessionGuard::default();
        let mut candidates = CandidateSatellites::default();

        let cmd = command_for_change(submitted(two_satellites()), &ObserverSetting::default(), &mut guard)
            .unwrap();
        assert!(guard.is_fetching_positions());
        send_command(&cmd_tx, cmd, &mut guard, &mut candidates);
        assert_eq!(guard.status(), SessionStatus::Idle);
        assert!(!guard.is_fetching_positions());

        candidates.loading = true;
        send_command(
            &cmd_tx,
            PositionCommand::FetchNearby {
                setting: ObserverSetting::default(),
                category: 52,
            },
            &mut guard,
            &mut candidates,
        );
        assert!(!candidates.loading);
        assert!(candidates.error.is_some());
    }

    #[test]
    fn test_send_to_live_worker_keeps_fetching() {
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
        let mut guard = SessionGuard::default();
        let cmd = command_for_change(submitted(two_satellites()), &ObserverSetting::default(), &mut guard)
            .unwrap();
        send_command(&cmd_tx, cmd, &mut guard, &mut CandidateSatellites::default());
        assert!(guard.is_fetching_positions());
        assert!(matches!(cmd_rx.try_recv(), Ok(PositionCommand::FetchTimelines { .. })));
    }

    #[tokio::test]
    async fn test_observer_scenario_runs_to_idle() {
        let setting = ObserverSetting {
            latitude: 40.7,
            longitude: -74.0,
            elevation: 10.0,
            altitude: 0.0,
            duration: 2.0,
        };
        let mut guard = SessionGuard::default();
        let mut clock = AnimationClock::default();

        let Some(PositionCommand::FetchTimelines {
            request,
            setting,
            selection,
        }) = command_for_change(submitted(two_satellites()), &setting, &mut guard)
        else {
            panic!("expected a fetch command");
        };
        assert_eq!(setting.window_seconds(), 120);
        assert!(guard.is_fetching_positions());

        let timelines = fetch_timelines(&setting, &selection, |query| async move {
            let samples = (0..query.window_seconds)
                .map(|i| PositionSample {
                    longitude: Some(-74.0 + i as f64 * 0.1),
                    latitude: Some(40.0),
                    timestamp: 1_700_000_000 + i as i64,
                })
                .collect();
            Ok(PositionsResponse {
                info: None,
                positions: Some(samples),
            })
        })
        .await
        .unwrap();
        assert_eq!(timelines.len(), 2);

        handle_position_result(
            PositionResult::Timelines { request, timelines },
            &mut guard,
            &mut clock,
            &mut CandidateSatellites::default(),
            now(),
        );
        assert!(guard.is_animating());

        let mut canvas = PixelCanvas::new(960, 600);
        let mut colors = ColorTable::default();
        let renderer = TrackRenderer::new(GeoProjector::for_canvas(960, 600), TrackStyle::default());
        let mut drawn_ticks = 0;
        'run: for _ in 0..10 {
            for outcome in clock.advance(TICK_INTERVAL, &mut guard, &mut canvas, &mut colors, &renderer) {
                match outcome {
                    TickOutcome::Drawn(n) => {
                        assert_eq!(n, 2);
                        drawn_ticks += 1;
                    }
                    _ => break 'run,
                }
            }
        }
        assert_eq!(drawn_ticks, 2);
        assert_eq!(guard.status(), SessionStatus::Idle);
        assert!(guard.hint().is_empty());
    }
}
