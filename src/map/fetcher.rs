//! One-shot boundary dataset download.

use anyhow::{Context, Result};
use bevy::prelude::*;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use crate::geo::{LandFeature, land_features};
use crate::map::types::{MapChannels, MapResult};
use crate::positions::fetcher::fetch_body;
use crate::settings::MapConfig;

/// Fetch and decode the land features once, then exit. Never retried.
pub fn start_map_worker(config: MapConfig) -> MapChannels {
    let (res_tx, res_rx) = mpsc::channel::<MapResult>();

    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(err) => {
                let _ = res_tx.send(MapResult::Failed(err.to_string()));
                return;
            }
        };
        let msg = rt.block_on(async move {
            let client = reqwest::Client::new();
            match fetch_land(&client, &config).await {
                Ok(land) => MapResult::Land(land),
                Err(err) => MapResult::Failed(format!("{:#}", err)),
            }
        });
        let _ = res_tx.send(msg);
    });

    MapChannels {
        res_rx: Arc::new(Mutex::new(res_rx)),
    }
}

async fn fetch_land(client: &reqwest::Client, config: &MapConfig) -> Result<Vec<LandFeature>> {
    info!("[MAP] fetching {}", config.world_map_url);
    let body = fetch_body(client, &config.world_map_url)
        .await
        .context("world map download")?;
    land_features(&body, &config.land_object)
        .with_context(|| format!("decoding object '{}'", config.land_object))
}
