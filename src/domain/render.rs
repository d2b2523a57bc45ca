// Drawable output handed to the rendering collaborator
use super::aggregation::SegmentAverage;
use super::classification::{BandTable, Legend};
use super::geometry::LatLon;
use super::joined_sample::{JoinedSample, Metric};
use super::street::StreetNetwork;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Points,
    Segments,
    Trace,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "points" => Ok(ViewMode::Points),
            // the map UI calls aggregated segments "lines"
            "segments" | "lines" => Ok(ViewMode::Segments),
            "trace" | "raw" => Ok(ViewMode::Trace),
            other => Err(format!("unknown view mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupFields {
    pub time: DateTime<Utc>,
    pub rms: Option<f64>,
    pub cci: Option<f64>,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawnArtifact {
    PointMarker {
        position: LatLon,
        color: String,
        popup: PopupFields,
    },
    SegmentLine {
        segment_id: usize,
        coords: Vec<LatLon>,
        color: String,
        average_value: f64,
        sample_count: usize,
        properties: serde_json::Map<String, serde_json::Value>,
    },
    TraceLine {
        from: LatLon,
        to: LatLon,
        color: String,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub metric: Metric,
    pub mode: ViewMode,
    pub sample_count: usize,
    pub artifacts: Vec<DrawnArtifact>,
    pub legend: Legend,
}

/// Progressive render protocol. `Clear` always comes first so the consumer
/// drops the previous pass's artifacts before drawing new ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Clear,
    Legend { legend: Legend },
    Artifacts { artifacts: Vec<DrawnArtifact> },
    Complete { artifact_count: usize, sample_count: usize, duration_ms: i64 },
    Error { message: String },
}

/// Markers for samples carrying RMS, CCI and the selected metric.
pub fn point_markers(samples: &[JoinedSample], metric: Metric, table: &BandTable) -> Vec<DrawnArtifact> {
    samples
        .iter()
        .filter(|s| s.rms.is_some() && s.cci.is_some())
        .filter_map(|s| {
            let position = s.valid_location()?;
            let value = s.value(metric)?;
            Some(DrawnArtifact::PointMarker {
                position,
                color: table.classify(value).color,
                popup: PopupFields {
                    time: s.time,
                    rms: s.rms,
                    cci: s.cci,
                    speed: s.speed,
                },
            })
        })
        .collect()
}

pub fn segment_lines(
    network: &StreetNetwork,
    averages: &[SegmentAverage],
    table: &BandTable,
) -> Vec<DrawnArtifact> {
    averages
        .iter()
        .filter_map(|avg| {
            let segment = network.segments().get(avg.index)?;
            Some(DrawnArtifact::SegmentLine {
                segment_id: segment.id,
                coords: segment.coords.clone(),
                color: table.classify(avg.mean).color,
                average_value: avg.mean,
                sample_count: avg.count,
                properties: segment.properties.clone(),
            })
        })
        .collect()
}

/// Lines between consecutive located samples, colored by the destination's
/// value. With `steps > 1` and a value at both ends, each pair is split into
/// `steps` pieces whose value is the mean of the interpolated end values.
pub fn trace_lines(
    samples: &[JoinedSample],
    metric: Metric,
    table: &BandTable,
    steps: u32,
) -> Vec<DrawnArtifact> {
    let located: Vec<(LatLon, Option<f64>)> = samples
        .iter()
        .filter_map(|s| Some((s.valid_location()?, s.value(metric))))
        .collect();

    let mut lines = Vec::new();
    for pair in located.windows(2) {
        let (from, from_value) = pair[0];
        let (to, to_value) = pair[1];
        let Some(to_value) = to_value else {
            continue;
        };

        match from_value {
            Some(from_value) if steps > 1 => {
                for i in 0..steps {
                    let t1 = i as f64 / steps as f64;
                    let t2 = (i + 1) as f64 / steps as f64;
                    let v1 = from_value + t1 * (to_value - from_value);
                    let v2 = from_value + t2 * (to_value - from_value);
                    let value = (v1 + v2) / 2.0;
                    lines.push(DrawnArtifact::TraceLine {
                        from: from.lerp(&to, t1),
                        to: from.lerp(&to, t2),
                        color: table.classify(value).color,
                        value,
                    });
                }
            }
            _ => lines.push(DrawnArtifact::TraceLine {
                from,
                to,
                color: table.classify(to_value).color,
                value: to_value,
            }),
        }
    }

    lines
}
