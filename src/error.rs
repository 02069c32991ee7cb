//! Error taxonomy shared by the fetch and animation pipelines.

use std::fmt;

/// Failures surfaced by the tracking engine.
///
/// None of these escape to the UI as faults: callers log them and reflect the
/// outcome through `SessionGuard` flags and hint text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Network or decoding failure talking to a remote service.
    Transport(String),
    /// A position response without a `positions` sequence.
    MalformedTimeline { satellite: u32 },
    /// Timelines in one batch do not share a length.
    UnequalTimelines { expected: usize, found: usize },
    /// Nothing was selected.
    EmptySelection,
    /// A session is already running.
    SessionConflict,
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::Transport(msg) => write!(f, "transport failure: {}", msg),
            TrackError::MalformedTimeline { satellite } => {
                write!(f, "no position data for satellite {}", satellite)
            }
            TrackError::UnequalTimelines { expected, found } => write!(
                f,
                "timeline length mismatch: expected {} samples, found {}",
                expected, found
            ),
            TrackError::EmptySelection => write!(f, "no satellites selected"),
            TrackError::SessionConflict => write!(f, "an animation session is already running"),
        }
    }
}

impl std::error::Error for TrackError {}

impl From<anyhow::Error> for TrackError {
    fn from(err: anyhow::Error) -> Self {
        TrackError::Transport(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_context_is_kept() {
        let err = anyhow::anyhow!("connection reset").context("GET positions/25544");
        let track: TrackError = err.into();
        assert_eq!(
            track,
            TrackError::Transport("GET positions/25544: connection reset".to_string())
        );
    }

    #[test]
    fn test_display_names_satellite() {
        let msg = TrackError::MalformedTimeline { satellite: 48274 }.to_string();
        assert!(msg.contains("48274"));
    }
}
