use crate::domain::classification::BandTables;
use crate::domain::joined_sample::Metric;
use crate::domain::observation::Datastream;
use crate::domain::time_index::DEFAULT_MAX_DELTA_SECONDS;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct RideMapConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub sensorthings: SensorThingsSettings,
    pub datastreams: DatastreamSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    pub streets: StreetSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorThingsSettings {
    pub base_url: String,
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
}

fn default_page_timeout_secs() -> u64 {
    30
}

/// Datastream ids for the four sensor streams of a ride.
#[derive(Debug, Deserialize, Clone)]
pub struct DatastreamSettings {
    pub gps: String,
    pub rms: String,
    pub cci: String,
    pub speed: String,
}

impl DatastreamSettings {
    pub fn position(&self) -> Datastream {
        Datastream::new("gps", self.gps.clone())
    }

    pub fn auxiliary(&self) -> [(Metric, Datastream); 3] {
        [
            (Metric::Rms, Datastream::new("rms", self.rms.clone())),
            (Metric::Cci, Datastream::new("cci", self.cci.clone())),
            (Metric::Speed, Datastream::new("speed", self.speed.clone())),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingSettings {
    pub max_delta_seconds: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            max_delta_seconds: DEFAULT_MAX_DELTA_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreetSettings {
    pub geojson_path: String,
}

pub fn load_ride_map_config() -> anyhow::Result<RideMapConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/ride_map"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_band_tables() -> anyhow::Result<BandTables> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/bands"))
        .build()?;

    let tables: BandTables = settings.try_deserialize()?;
    tables.validate().map_err(anyhow::Error::msg)?;
    Ok(tables)
}
