// Street geometry source (GeoJSON file)
use crate::application::street_network_store::StreetNetworkStore;
use crate::domain::street::StreetNetwork;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub async fn load_street_network(path: &Path) -> Result<StreetNetwork> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read street geometry {}", path.display()))?;

    StreetNetwork::from_geojson_str(&raw)
        .with_context(|| format!("Failed to parse street geometry {}", path.display()))
}

/// Loads the network in the background; the store stays empty (and loads are
/// rejected) until this finishes.
pub fn spawn_street_loading(path: PathBuf, store: StreetNetworkStore) {
    tokio::spawn(async move {
        match load_street_network(&path).await {
            Ok(network) => store.set(network).await,
            Err(e) => tracing::error!("Street network unavailable: {:#}", e),
        }
    });
}
