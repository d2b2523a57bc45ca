// Sensor observation domain model (SensorThings wire shape)
use super::geometry::LatLon;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A named datastream on the upstream server, e.g. `rms` with id `7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datastream {
    pub name: String,
    pub id: String,
}

impl Datastream {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for Datastream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    #[serde(rename = "phenomenonTime", deserialize_with = "deserialize_phenomenon_time")]
    pub phenomenon_time: DateTime<Utc>,
    #[serde(default)]
    pub result: Value,
    #[serde(rename = "FeatureOfInterest", default)]
    pub feature_of_interest: Option<FeatureOfInterest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureOfInterest {
    #[serde(default)]
    pub feature: Option<Value>,
}

/// One page of an observation collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationPage {
    #[serde(default)]
    pub value: Vec<Observation>,
    #[serde(rename = "@iot.nextLink", default)]
    pub next_link: Option<String>,
}

impl Observation {
    #[cfg(test)]
    pub fn new(phenomenon_time: DateTime<Utc>, result: Value) -> Self {
        Self {
            phenomenon_time,
            result,
            feature_of_interest: None,
        }
    }

    pub fn time_ms(&self) -> i64 {
        self.phenomenon_time.timestamp_millis()
    }

    /// Position carried by the result, falling back to an expanded
    /// FeatureOfInterest point.
    pub fn position(&self) -> Option<LatLon> {
        position_from_value(&self.result).or_else(|| {
            self.feature_of_interest
                .as_ref()
                .and_then(|foi| foi.feature.as_ref())
                .and_then(position_from_value)
        })
    }

    pub fn scalar(&self) -> Option<f64> {
        self.result.as_f64()
    }
}

/// Accepts `{"longitude": x, "latitude": y}` or a GeoJSON Point.
fn position_from_value(value: &Value) -> Option<LatLon> {
    if let (Some(lon), Some(lat)) = (
        value.get("longitude").and_then(Value::as_f64),
        value.get("latitude").and_then(Value::as_f64),
    ) {
        return Some(LatLon::new(lat, lon));
    }

    if value.get("type").and_then(Value::as_str) == Some("Point") {
        let coords = value.get("coordinates")?.as_array()?;
        let lon = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        return Some(LatLon::new(lat, lon));
    }

    None
}

/// `phenomenonTime` may be an instant or an interval `start/end`; intervals
/// resolve to their start.
fn deserialize_phenomenon_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let instant = raw.split('/').next().unwrap_or(&raw);
    DateTime::parse_from_rfc3339(instant)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| serde::de::Error::custom(format!("invalid phenomenonTime {raw:?}: {e}")))
}
