// Street network model and nearest-segment lookup
use super::geometry::{point_to_segment_distance, LatLon};
use geojson::{FeatureCollection, GeoJson, Value as GeoJsonValue};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct StreetSegment {
    /// Index of the source feature in the collection.
    pub id: usize,
    pub coords: Vec<LatLon>,
    pub properties: Map<String, Value>,
}

impl StreetSegment {
    pub fn new(id: usize, coords: Vec<LatLon>) -> Self {
        Self {
            id,
            coords,
            properties: Map::new(),
        }
    }
}

/// Position of the located segment in the network and its distance to the
/// query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestSegment {
    pub index: usize,
    pub distance: f64,
}

/// Segment geometry for one dataset load. Never mutated after construction;
/// per-pass values live in [`super::aggregation::SegmentAccumulator`].
#[derive(Debug, Clone, Default)]
pub struct StreetNetwork {
    segments: Vec<StreetSegment>,
}

impl StreetNetwork {
    pub fn new(segments: Vec<StreetSegment>) -> Self {
        Self { segments }
    }

    /// Builds the network from a GeoJSON FeatureCollection of LineStrings.
    /// Coordinates arrive as `[lon, lat]`. Features with other geometry are
    /// skipped; segment ids stay equal to the feature's position.
    pub fn from_geojson_str(raw: &str) -> anyhow::Result<Self> {
        let geojson: GeoJson = raw.parse()?;
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => anyhow::bail!("street geometry must be a FeatureCollection"),
        };
        Ok(Self::from_feature_collection(collection))
    }

    pub fn from_feature_collection(collection: FeatureCollection) -> Self {
        let mut segments = Vec::with_capacity(collection.features.len());

        for (id, feature) in collection.features.into_iter().enumerate() {
            let line = match feature.geometry.map(|g| g.value) {
                Some(GeoJsonValue::LineString(line)) => line,
                Some(_) => {
                    tracing::warn!("Skipping street feature {}: geometry is not a LineString", id);
                    continue;
                }
                None => {
                    tracing::warn!("Skipping street feature {}: no geometry", id);
                    continue;
                }
            };

            let coords = line
                .iter()
                .filter(|pos| pos.len() >= 2)
                .map(|pos| LatLon::new(pos[1], pos[0]))
                .collect();

            segments.push(StreetSegment {
                properties: feature.properties.unwrap_or_default(),
                ..StreetSegment::new(id, coords)
            });
        }

        Self::new(segments)
    }

    pub fn segments(&self) -> &[StreetSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when no segment has an edge to match against, which covers
    /// segments loaded with `coords = []` or a single vertex.
    pub fn is_empty(&self) -> bool {
        !self.segments.iter().any(|s| s.coords.len() >= 2)
    }

    /// Exhaustive scan over every edge of every segment. Only a strictly
    /// smaller distance replaces the current best, so the first-found segment
    /// wins exact ties.
    pub fn locate(&self, point: LatLon) -> Option<NearestSegment> {
        let mut nearest: Option<NearestSegment> = None;

        for (index, segment) in self.segments.iter().enumerate() {
            for edge in segment.coords.windows(2) {
                let distance = point_to_segment_distance(point, edge[0], edge[1]);
                if nearest.is_none_or(|n| distance < n.distance) {
                    nearest = Some(NearestSegment { index, distance });
                }
            }
        }

        nearest
    }
}
