//! Discrete-time animation over a batch of position timelines.

use bevy::prelude::*;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

use crate::animation::guard::{SessionGuard, SessionStatus};
use crate::error::TrackError;
use crate::positions::types::PositionTimeline;
use crate::render::{ColorTable, PixelCanvas, TrackRenderer};

/// Real time between two ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Sample index advance per tick.
pub const CURSOR_STEP: usize = 60;
/// Simulated seconds per real second.
pub const TIME_SCALE: u32 = 60;

/// Cancellable repeating trigger, driven by explicit time deltas.
#[derive(Debug)]
pub struct RepeatingTask {
    timer: Timer,
    cancelled: bool,
}

impl RepeatingTask {
    pub fn new(period: Duration) -> Self {
        Self {
            timer: Timer::new(period, TimerMode::Repeating),
            cancelled: false,
        }
    }

    /// Advance by `delta`; returns how many periods elapsed.
    pub fn advance(&mut self, delta: Duration) -> u32 {
        if self.cancelled {
            return 0;
        }
        self.timer.tick(delta).times_finished_this_tick()
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[derive(Debug)]
pub struct AnimationSession {
    timelines: Vec<PositionTimeline>,
    cursor: usize,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    real_elapsed: Duration,
    ticks_drawn: usize,
}

impl AnimationSession {
    /// Timelines must be non-empty and share one length.
    pub fn new(timelines: Vec<PositionTimeline>, started_at: DateTime<Utc>) -> Result<Self, TrackError> {
        let Some(first) = timelines.first() else {
            return Err(TrackError::EmptySelection);
        };
        let expected = first.len();
        if let Some(other) = timelines.iter().find(|t| t.len() != expected) {
            return Err(TrackError::UnequalTimelines {
                expected,
                found: other.len(),
            });
        }
        Ok(Self {
            timelines,
            cursor: 0,
            status: SessionStatus::Running,
            started_at,
            real_elapsed: Duration::ZERO,
            ticks_drawn: 0,
        })
    }

    pub fn timelines(&self) -> &[PositionTimeline] {
        &self.timelines
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn ticks_drawn(&self) -> usize {
        self.ticks_drawn
    }

    pub fn timeline_len(&self) -> usize {
        self.timelines.first().map_or(0, PositionTimeline::len)
    }

    /// Session start plus scaled real elapsed time; the first tick shows the
    /// start itself.
    pub fn simulated_time(&self) -> DateTime<Utc> {
        if self.ticks_drawn == 0 {
            return self.started_at;
        }
        let scaled = self.real_elapsed.saturating_mul(TIME_SCALE);
        self.started_at + TimeDelta::from_std(scaled).unwrap_or(TimeDelta::MAX)
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.timeline_len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Markers drawn this tick.
    Drawn(usize),
    /// Cursor passed the end; session finished.
    Completed,
    /// No session.
    Idle,
}

/// Owns the one running session and its trigger.
#[derive(Resource, Debug)]
pub struct AnimationClock {
    session: Option<AnimationSession>,
    task: Option<RepeatingTask>,
    interval: Duration,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl AnimationClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            session: None,
            task: None,
            interval,
        }
    }

    pub fn session(&self) -> Option<&AnimationSession> {
        self.session.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session from a fetched batch.
    ///
    /// Rejected with a hint while another session runs; the running session
    /// is left untouched. Invalid input sends the guard back to idle.
    pub fn start(
        &mut self,
        guard: &mut SessionGuard,
        timelines: Vec<PositionTimeline>,
        now: DateTime<Utc>,
    ) -> Result<(), TrackError> {
        if guard.is_animating() || self.session.is_some() {
            guard.reject();
            return Err(TrackError::SessionConflict);
        }
        match AnimationSession::new(timelines, now) {
            Ok(session) => {
                info!(
                    "[ANIMATION] start: {} satellites, {} samples",
                    session.timelines.len(),
                    session.timeline_len()
                );
                self.session = Some(session);
                self.task = Some(RepeatingTask::new(self.interval));
                guard.begin_running();
                Ok(())
            }
            Err(err) => {
                guard.fetch_failed(guard.generation());
                Err(err)
            }
        }
    }

    /// Feed real elapsed time; runs every tick that came due. Returns the
    /// outcomes in order.
    pub fn advance(
        &mut self,
        delta: Duration,
        guard: &mut SessionGuard,
        canvas: &mut PixelCanvas,
        colors: &mut ColorTable,
        renderer: &TrackRenderer,
    ) -> Vec<TickOutcome> {
        let due = match (self.task.as_mut(), self.session.as_mut()) {
            (Some(task), Some(session)) if !task.is_cancelled() => {
                session.real_elapsed += delta;
                task.advance(delta)
            }
            _ => return Vec::new(),
        };

        let mut outcomes = Vec::new();
        for _ in 0..due {
            let outcome = self.tick(guard, canvas, colors, renderer);
            outcomes.push(outcome);
            if !matches!(outcome, TickOutcome::Drawn(_)) {
                break;
            }
        }
        outcomes
    }

    /// One tick: clear, stamp the time, then either finish or draw the
    /// samples at the cursor and step it.
    pub fn tick(
        &mut self,
        guard: &mut SessionGuard,
        canvas: &mut PixelCanvas,
        colors: &mut ColorTable,
        renderer: &TrackRenderer,
    ) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };

        canvas.clear();
        renderer.draw_time_label(canvas, session.simulated_time());

        if session.is_exhausted() {
            info!("[ANIMATION] complete after {} ticks", session.ticks_drawn);
            self.session = None;
            self.task = None;
            guard.animation_completed();
            return TickOutcome::Completed;
        }

        let drawn = renderer.draw_tick(canvas, colors, &session.timelines, session.cursor);
        session.cursor += CURSOR_STEP;
        session.ticks_drawn += 1;
        TickOutcome::Drawn(drawn)
    }

    /// Cancel the trigger, drop the session and wipe its markers from the
    /// track canvas. Returns the cancelled session, if any.
    pub fn stop(
        &mut self,
        guard: &mut SessionGuard,
        canvas: &mut PixelCanvas,
    ) -> Option<AnimationSession> {
        if let Some(task) = self.task.as_mut() {
            task.cancel();
        }
        self.task = None;
        let mut session = self.session.take()?;
        session.status = SessionStatus::Cancelled;
        canvas.clear();
        guard.animation_completed();
        info!(
            "[ANIMATION] {:?} at cursor {} after {} ticks",
            session.status(),
            session.cursor,
            session.ticks_drawn()
        );
        Some(session)
    }
}
