//! Observer, selection and position timeline types plus worker channels.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc, Mutex,
    mpsc::{Receiver, Sender},
};

use crate::error::TrackError;

/// Where the satellites are watched from and for how long.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObserverSetting {
    pub latitude: f64,
    pub longitude: f64,
    /// Observer elevation above sea level, meters.
    pub elevation: f64,
    /// Search radius for the nearby query, degrees.
    pub altitude: f64,
    /// Requested observation time, minutes.
    pub duration: f64,
}

impl Default for ObserverSetting {
    fn default() -> Self {
        Self {
            latitude: 40.7,
            longitude: -74.0,
            elevation: 10.0,
            altitude: 90.0,
            duration: 2.0,
        }
    }
}

impl ObserverSetting {
    /// Length of the position window requested from the service.
    ///
    /// The entered duration is multiplied by 60 so the animation shows visible
    /// motion over a short real-time run.
    pub fn window_seconds(&self) -> u64 {
        (self.duration * 60.0).round().max(0.0) as u64
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteDescriptor {
    #[serde(rename = "satid")]
    pub id: u32,
    #[serde(rename = "satname", default)]
    pub name: String,
    #[serde(rename = "launchDate", default)]
    pub launch_date: Option<String>,
}

impl SatelliteDescriptor {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            launch_date: None,
        }
    }

    /// Marker label: the numeric catalog id.
    pub fn label(&self) -> String {
        self.id.to_string()
    }
}

/// Ordered set of satellites, unique by id. Order drives draw and color order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SatelliteSelection {
    items: Vec<SatelliteDescriptor>,
}

impl SatelliteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from descriptors, keeping the first occurrence of each id.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = SatelliteDescriptor>) -> Self {
        let mut selection = Self::new();
        for descriptor in descriptors {
            selection.toggle(descriptor, true);
        }
        selection
    }

    /// Add when `checked` and absent, remove when unchecked and present.
    pub fn toggle(&mut self, descriptor: SatelliteDescriptor, checked: bool) {
        let found = self.contains(descriptor.id);
        if checked && !found {
            self.items.push(descriptor);
        } else if !checked && found {
            self.items.retain(|s| s.id != descriptor.id);
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.items.iter().any(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SatelliteDescriptor> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&SatelliteDescriptor> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One recorded position. Coordinates may be missing in partial responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    #[serde(rename = "satlongitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "satlatitude", default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub timestamp: i64,
}

impl PositionSample {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PositionsInfo {
    #[serde(rename = "satname", default)]
    pub name: Option<String>,
}

/// Wire shape of one position service response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PositionsResponse {
    #[serde(default)]
    pub info: Option<PositionsInfo>,
    #[serde(default)]
    pub positions: Option<Vec<PositionSample>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionTimeline {
    pub satellite: SatelliteDescriptor,
    pub samples: Vec<PositionSample>,
}

impl PositionTimeline {
    /// Pair a response with the descriptor it was requested for. A missing
    /// `positions` sequence is a malformed timeline.
    pub fn from_response(
        mut satellite: SatelliteDescriptor,
        response: PositionsResponse,
    ) -> Result<Self, TrackError> {
        let samples = response.positions.ok_or(TrackError::MalformedTimeline {
            satellite: satellite.id,
        })?;
        if let Some(name) = response.info.and_then(|i| i.name)
            && !name.is_empty()
        {
            satellite.name = name;
        }
        Ok(Self { satellite, samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Parameters of a single per-satellite position request.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionQuery {
    pub satellite_id: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub window_seconds: u64,
}

impl PositionQuery {
    pub fn new(satellite_id: u32, setting: &ObserverSetting) -> Self {
        Self {
            satellite_id,
            latitude: setting.latitude,
            longitude: setting.longitude,
            elevation: setting.elevation,
            window_seconds: setting.window_seconds(),
        }
    }
}

/// Commands for the position worker thread
#[derive(Debug)]
pub enum PositionCommand {
    FetchTimelines {
        request: u64,
        setting: ObserverSetting,
        selection: SatelliteSelection,
    },
    FetchNearby {
        setting: ObserverSetting,
        category: u32,
    },
}

/// Results from the position worker thread
#[derive(Debug)]
pub enum PositionResult {
    Timelines {
        request: u64,
        timelines: Vec<PositionTimeline>,
    },
    TimelinesFailed {
        request: u64,
        error: TrackError,
    },
    Nearby(Vec<SatelliteDescriptor>),
    NearbyFailed(String),
}

#[derive(Resource)]
pub struct PositionChannels {
    pub cmd_tx: Sender<PositionCommand>,
    pub res_rx: Arc<Mutex<Receiver<PositionResult>>>,
}

/// Satellites offered to the user, from settings or the nearby query.
#[derive(Resource, Debug, Default)]
pub struct CandidateSatellites {
    pub items: Vec<SatelliteDescriptor>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Selection as last edited by the user. `revision` increases on each
/// "track" submission, which is what the engine reacts to.
#[derive(Resource, Debug, Default)]
pub struct SelectionState {
    pub editing: SatelliteSelection,
    pub submitted: Option<SatelliteSelection>,
    pub revision: u64,
}

impl SelectionState {
    pub fn submit(&mut self) {
        self.submitted = Some(self.editing.clone());
        self.revision += 1;
    }
}

/// Outcome of comparing the submitted selection with the last one handled.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionChange {
    NoChange,
    NewSelection(SatelliteSelection),
}

impl SelectionChange {
    pub fn detect(last_seen: u64, state: &SelectionState) -> Self {
        match &state.submitted {
            Some(selection) if state.revision != last_seen => {
                SelectionChange::NewSelection(selection.clone())
            }
            _ => SelectionChange::NoChange,
        }
    }
}
