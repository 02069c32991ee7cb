//! Single-instance guard over the fetch/animate lifecycle.

use bevy::prelude::*;

use crate::error::TrackError;

pub const CONFLICT_HINT: &str =
    "Please wait for the current satellite animation to finish before selecting new ones!";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Fetching,
    Running,
    Cancelled,
}

/// Tracks whether positions are being fetched or an animation is running.
///
/// Holds only status, never the session data. Every accepted fetch gets a
/// generation number; results carrying an older number are stale and ignored.
///
/// | From     | Event               | To                          |
/// |----------|---------------------|-----------------------------|
/// | Idle     | fetch requested     | Fetching                    |
/// | Fetching | fetch succeeded     | Running                     |
/// | Fetching | fetch failed        | Idle                        |
/// | Running  | animation completed | Idle                        |
/// | Running  | new fetch requested | Running (rejected, hinted)  |
#[derive(Resource, Debug, Default)]
pub struct SessionGuard {
    status: SessionStatus,
    generation: u64,
    hint: String,
}

impl SessionGuard {
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_fetching_positions(&self) -> bool {
        self.status == SessionStatus::Fetching
    }

    pub fn is_animating(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Accept a new fetch unless an animation is running. A request made
    /// while another fetch is outstanding supersedes it.
    pub fn request_fetch(&mut self) -> Result<u64, TrackError> {
        if self.is_animating() {
            self.reject();
            return Err(TrackError::SessionConflict);
        }
        self.generation += 1;
        self.status = SessionStatus::Fetching;
        Ok(self.generation)
    }

    /// Whether a fetch result still belongs to the outstanding request.
    pub fn is_current(&self, request: u64) -> bool {
        self.status == SessionStatus::Fetching && request == self.generation
    }

    /// Fetching → Running.
    pub fn begin_running(&mut self) {
        self.status = SessionStatus::Running;
    }

    /// Fetching → Idle. Ignored for stale requests.
    pub fn fetch_failed(&mut self, request: u64) -> bool {
        if !self.is_current(request) {
            return false;
        }
        self.status = SessionStatus::Idle;
        true
    }

    /// Running → Idle, clearing the hint.
    pub fn animation_completed(&mut self) {
        self.status = SessionStatus::Idle;
        self.hint.clear();
    }

    /// Keep the current state and tell the user to wait.
    pub fn reject(&mut self) {
        self.hint = CONFLICT_HINT.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut guard = SessionGuard::default();
        assert_eq!(guard.status(), SessionStatus::Idle);

        let request = guard.request_fetch().unwrap();
        assert!(guard.is_fetching_positions());
        assert!(!guard.is_animating());
        assert!(guard.is_current(request));

        guard.begin_running();
        assert!(guard.is_animating());
        assert!(!guard.is_fetching_positions());

        guard.animation_completed();
        assert_eq!(guard.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_failed_fetch_returns_to_idle() {
        let mut guard = SessionGuard::default();
        let request = guard.request_fetch().unwrap();
        assert!(guard.fetch_failed(request));
        assert_eq!(guard.status(), SessionStatus::Idle);
        assert!(guard.hint().is_empty());
    }

    #[test]
    fn test_request_while_running_is_rejected_with_hint() {
        let mut guard = SessionGuard::default();
        guard.request_fetch().unwrap();
        guard.begin_running();
        let generation = guard.generation();

        assert_eq!(guard.request_fetch(), Err(TrackError::SessionConflict));
        assert!(guard.is_animating());
        assert_eq!(guard.generation(), generation);
        assert_eq!(guard.hint(), CONFLICT_HINT);

        guard.animation_completed();
        assert!(guard.hint().is_empty());
    }

    #[test]
    fn test_newer_request_supersedes_outstanding_fetch() {
        let mut guard = SessionGuard::default();
        let first = guard.request_fetch().unwrap();
        let second = guard.request_fetch().unwrap();
        assert!(second > first);
        assert!(!guard.is_current(first));
        assert!(!guard.fetch_failed(first));
        assert!(guard.is_fetching_positions());
        assert!(guard.is_current(second));
    }
}
