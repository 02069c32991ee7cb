//! Position service fetching
//!
//! One request per selected satellite, run concurrently, aggregated
//! fail-fast and returned in selection order.

use anyhow::{Context, Result};
use bevy::prelude::*;
use serde::Deserialize;
use std::future::Future;
use std::sync::{
    Arc, Mutex,
    mpsc::{self, Sender},
};
use std::thread;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::error::TrackError;
use crate::positions::types::{
    ObserverSetting, PositionChannels, PositionCommand, PositionQuery, PositionResult,
    PositionTimeline, PositionsResponse, SatelliteDescriptor, SatelliteSelection,
};
use crate::settings::PositionApiConfig;

/// Upper bound for one HTTP exchange; a hung request fails its batch.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Start the background position worker thread
pub fn start_position_worker(api: PositionApiConfig) -> PositionChannels {
    let (cmd_tx, cmd_rx) = mpsc::channel::<PositionCommand>();
    let (res_tx, res_rx) = mpsc::channel::<PositionResult>();

    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(err) => {
                error!("[POSITIONS] failed to start tokio runtime: {}", err);
                return;
            }
        };
        let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(client) => client,
            Err(err) => {
                error!("[POSITIONS] failed to build HTTP client: {}", err);
                return;
            }
        };

        // Each command runs as its own task so a slow batch never holds up
        // the next request.
        while let Ok(cmd) = cmd_rx.recv() {
            rt.spawn(run_command(cmd, client.clone(), api.clone(), res_tx.clone()));
        }
    });

    PositionChannels {
        cmd_tx,
        res_rx: Arc::new(Mutex::new(res_rx)),
    }
}

async fn run_command(
    cmd: PositionCommand,
    client: reqwest::Client,
    api: PositionApiConfig,
    res_tx: Sender<PositionResult>,
) {
    let msg = match cmd {
        PositionCommand::FetchTimelines {
            request,
            setting,
            selection,
        } => {
            let result = fetch_timelines(&setting, &selection, |query| {
                let (client, api) = (client.clone(), api.clone());
                async move {
                    fetch_positions(&client, &api, &query)
                        .await
                        .map_err(TrackError::from)
                }
            })
            .await;
            match result {
                Ok(timelines) => {
                    info!(
                        "[POSITIONS] request={} fetched {} timelines",
                        request,
                        timelines.len()
                    );
                    if timelines.iter().any(PositionTimeline::is_empty) {
                        warn!("[POSITIONS] request={} has satellites without samples", request);
                    }
                    PositionResult::Timelines { request, timelines }
                }
                Err(error) => {
                    error!("[POSITIONS] request={} FAILURE: {}", request, error);
                    PositionResult::TimelinesFailed { request, error }
                }
            }
        }
        PositionCommand::FetchNearby { setting, category } => {
            match fetch_nearby(&client, &api, &setting, category).await {
                Ok(satellites) => {
                    info!("[NEARBY] {} satellites above observer", satellites.len());
                    PositionResult::Nearby(satellites)
                }
                Err(err) => {
                    error!("[NEARBY] FAILURE: {:#}", err);
                    PositionResult::NearbyFailed(err.to_string())
                }
            }
        }
    };
    let _ = res_tx.send(msg);
}

/// Fetch one timeline per selected satellite.
///
/// All requests are in flight at once. The first failure aborts the rest and
/// fails the whole batch; no partial result is returned. On success the
/// timelines follow selection order regardless of completion order.
pub async fn fetch_timelines<F, Fut>(
    setting: &ObserverSetting,
    selection: &SatelliteSelection,
    fetch_one: F,
) -> Result<Vec<PositionTimeline>, TrackError>
where
    F: Fn(PositionQuery) -> Fut,
    Fut: Future<Output = Result<PositionsResponse, TrackError>> + Send + 'static,
{
    if selection.is_empty() {
        return Err(TrackError::EmptySelection);
    }

    let mut pending = JoinSet::new();
    for (index, satellite) in selection.iter().enumerate() {
        let request = fetch_one(PositionQuery::new(satellite.id, setting));
        pending.spawn(async move { (index, request.await) });
    }

    let mut slots: Vec<Option<PositionTimeline>> = vec![None; selection.len()];
    while let Some(joined) = pending.join_next().await {
        let (index, response) = joined.map_err(|e| TrackError::Transport(e.to_string()))?;
        let Some(satellite) = selection.get(index) else {
            continue;
        };
        // Returning early drops the JoinSet, which aborts the siblings.
        let timeline = PositionTimeline::from_response(satellite.clone(), response?)?;
        slots[index] = Some(timeline);
    }

    Ok(slots.into_iter().flatten().collect())
}

async fn fetch_positions(
    client: &reqwest::Client,
    api: &PositionApiConfig,
    query: &PositionQuery,
) -> Result<PositionsResponse> {
    let body = fetch_body(client, &positions_url(api, query))
        .await
        .with_context(|| format!("positions for satellite {}", query.satellite_id))?;
    serde_json::from_str(&body)
        .with_context(|| format!("decoding positions for satellite {}", query.satellite_id))
}

async fn fetch_nearby(
    client: &reqwest::Client,
    api: &PositionApiConfig,
    setting: &ObserverSetting,
    category: u32,
) -> Result<Vec<SatelliteDescriptor>> {
    let body = fetch_body(client, &nearby_url(api, setting, category)).await?;
    parse_nearby(&body)
}

pub(crate) async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        anyhow::bail!("HTTP {}", status);
    }
    Ok(body)
}

pub fn positions_url(api: &PositionApiConfig, query: &PositionQuery) -> String {
    format!(
        "{}/positions/{}/{}/{}/{}/{}/&apiKey={}",
        api.base_url,
        query.satellite_id,
        query.latitude,
        query.longitude,
        query.elevation,
        query.window_seconds,
        api.api_key
    )
}

pub fn nearby_url(api: &PositionApiConfig, setting: &ObserverSetting, category: u32) -> String {
    format!(
        "{}/above/{}/{}/{}/{}/{}/&apiKey={}",
        api.base_url,
        setting.latitude,
        setting.longitude,
        setting.elevation,
        setting.altitude,
        category,
        api.api_key
    )
}

#[derive(Deserialize)]
struct AboveResponse {
    #[serde(default)]
    above: Vec<SatelliteDescriptor>,
}

fn parse_nearby(body: &str) -> Result<Vec<SatelliteDescriptor>> {
    let response: AboveResponse =
        serde_json::from_str(body).context("decoding nearby satellites")?;
    Ok(response.above)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::types::PositionSample;

    fn selection() -> SatelliteSelection {
        SatelliteSelection::from_descriptors([
            SatelliteDescriptor::new(25544, "SPACE STATION"),
            SatelliteDescriptor::new(48274, "CSS (TIANHE)"),
        ])
    }

    fn response(samples: usize) -> PositionsResponse {
        PositionsResponse {
            info: None,
            positions: Some(
                (0..samples)
                    .map(|i| PositionSample {
                        longitude: Some(i as f64 * 0.1),
                        latitude: Some(0.0),
                        timestamp: 1_700_000_000 + i as i64,
                    })
                    .collect(),
            ),
        }
    }

    #[tokio::test]
    async fn test_results_follow_selection_order() {
        let setting = ObserverSetting::default();
        let timelines = fetch_timelines(&setting, &selection(), |query| async move {
            // The first satellite finishes last.
            if query.satellite_id == 25544 {
                for _ in 0..20 {
                    tokio::task::yield_now().await;
                }
            }
            Ok(response(120))
        })
        .await
        .unwrap();

        let ids: Vec<u32> = timelines.iter().map(|t| t.satellite.id).collect();
        assert_eq!(ids, vec![25544, 48274]);
        assert!(timelines.iter().all(|t| t.len() == 120));
    }

    #[tokio::test]
    async fn test_queries_carry_observer_and_window() {
        let seen: Arc<Mutex<Vec<PositionQuery>>> = Arc::new(Mutex::new(Vec::new()));
        let setting = ObserverSetting {
            latitude: 40.7,
            longitude: -74.0,
            elevation: 10.0,
            altitude: 0.0,
            duration: 2.0,
        };
        let record = seen.clone();
        fetch_timelines(&setting, &selection(), move |query| {
            record.lock().unwrap().push(query);
            async { Ok(response(1)) }
        })
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|q| q.window_seconds == 120));
        assert!(seen.iter().all(|q| q.latitude == 40.7 && q.longitude == -74.0 && q.elevation == 10.0));
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_batch() {
        let setting = ObserverSetting::default();
        let result = fetch_timelines(&setting, &selection(), |query| async move {
            if query.satellite_id == 48274 {
                Err(TrackError::Transport("HTTP 500".to_string()))
            } else {
                // Never completes: the batch must not wait for it.
                std::future::pending::<()>().await;
                Ok(response(1))
            }
        })
        .await;
        assert_eq!(result, Err(TrackError::Transport("HTTP 500".to_string())));
    }

    #[tokio::test]
    async fn test_missing_positions_is_malformed() {
        let setting = ObserverSetting::default();
        let result = fetch_timelines(&setting, &selection(), |query| async move {
            if query.satellite_id == 48274 {
                Ok(PositionsResponse::default())
            } else {
                Ok(response(3))
            }
        })
        .await;
        assert_eq!(result, Err(TrackError::MalformedTimeline { satellite: 48274 }));
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected() {
        let result = fetch_timelines(&ObserverSetting::default(), &SatelliteSelection::new(), |_| async {
            Ok(response(1))
        })
        .await;
        assert_eq!(result, Err(TrackError::EmptySelection));
    }

    #[test]
    fn test_positions_url() {
        let api = PositionApiConfig {
            base_url: "https://api.example/rest/v1/satellite".to_string(),
            api_key: "KEY".to_string(),
            category: 52,
        };
        let query = PositionQuery::new(25544, &ObserverSetting::default());
        assert_eq!(
            positions_url(&api, &query),
            "https://api.example/rest/v1/satellite/positions/25544/40.7/-74/10/120/&apiKey=KEY"
        );
    }

    #[test]
    fn test_nearby_url_uses_altitude_as_radius() {
        let api = PositionApiConfig {
            base_url: "https://api.example".to_string(),
            api_key: "KEY".to_string(),
            category: 52,
        };
        let setting = ObserverSetting {
            altitude: 45.0,
            ..Default::default()
        };
        assert_eq!(
            nearby_url(&api, &setting, 52),
            "https://api.example/above/40.7/-74/10/45/52/&apiKey=KEY"
        );
    }

    #[test]
    fn test_parse_nearby() {
        let body = r#"{
            "info": { "category": "Starlink", "transactionscount": 1, "satcount": 2 },
            "above": [
                { "satid": 44714, "satname": "STARLINK-1130", "intDesignator": "2019-074B", "launchDate": "2019-11-11", "satlat": 42.1, "satlng": -70.2, "satalt": 550.1 },
                { "satid": 44718, "satname": "STARLINK-1134", "launchDate": "2019-11-11" }
            ]
        }"#;
        let satellites = parse_nearby(body).unwrap();
        assert_eq!(satellites.len(), 2);
        assert_eq!(satellites[0].id, 44714);
        assert_eq!(satellites[1].name, "STARLINK-1134");
    }

    /// Local HTTP stub: `/above/` answers at once, everything else hangs.
    fn spawn_stub_server() -> String {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                let mut stream = stream.unwrap();
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]).to_string();
                if head.contains("/above/") {
                    let body = r#"{"above":[{"satid":44714,"satname":"STARLINK-1130"}]}"#;
                    let reply = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(reply.as_bytes());
                } else {
                    held.push(stream);
                }
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_slow_batch_does_not_block_later_commands() {
        let api = PositionApiConfig {
            base_url: spawn_stub_server(),
            api_key: "KEY".to_string(),
            category: 52,
        };
        let channels = start_position_worker(api);

        channels
            .cmd_tx
            .send(PositionCommand::FetchTimelines {
                request: 1,
                setting: ObserverSetting::default(),
                selection: selection(),
            })
            .unwrap();
        channels
            .cmd_tx
            .send(PositionCommand::FetchNearby {
                setting: ObserverSetting::default(),
                category: 52,
            })
            .unwrap();

        let rx = channels.res_rx.lock().unwrap();
        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            PositionResult::Nearby(satellites) => assert_eq!(satellites[0].id, 44714),
            other => panic!("expected nearby result first, got {:?}", other),
        }
    }
}
