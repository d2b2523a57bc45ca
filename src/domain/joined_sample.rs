// Temporal join of the position stream with auxiliary sensor streams
use super::geometry::LatLon;
use super::observation::Observation;
use super::time_index::TimeIndex;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Auxiliary sensor quantities joined onto positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Rms,
    Cci,
    Speed,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rms => "rms",
            Metric::Cci => "cci",
            Metric::Speed => "speed",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rms" => Ok(Metric::Rms),
            "cci" => Ok(Metric::Cci),
            "speed" => Ok(Metric::Speed),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedSample {
    pub time: DateTime<Utc>,
    pub location: Option<LatLon>,
    pub rms: Option<f64>,
    pub cci: Option<f64>,
    pub speed: Option<f64>,
}

impl JoinedSample {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Rms => self.rms,
            Metric::Cci => self.cci,
            Metric::Speed => self.speed,
        }
    }

    /// Location, if present and finite.
    pub fn valid_location(&self) -> Option<LatLon> {
        self.location.filter(LatLon::is_valid)
    }
}

pub type AuxiliaryIndices = HashMap<Metric, TimeIndex<f64>>;

/// One sample per position observation, in stream order. Auxiliary values are
/// matched at the position's own timestamp; a metric without an index or
/// without an in-tolerance match stays `None`.
pub fn join(
    positions: &[Observation],
    auxiliary: &AuxiliaryIndices,
    max_delta_seconds: f64,
) -> Vec<JoinedSample> {
    positions
        .iter()
        .map(|obs| {
            let target = obs.time_ms();
            let lookup = |metric: Metric| {
                auxiliary
                    .get(&metric)
                    .and_then(|index| index.find_closest(target, max_delta_seconds))
            };

            JoinedSample {
                time: obs.phenomenon_time,
                location: obs.position(),
                rms: lookup(Metric::Rms),
                cci: lookup(Metric::Cci),
                speed: lookup(Metric::Speed),
            }
        })
        .collect()
}
