// Planar geometry over (longitude, latitude) treated as cartesian x/y
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Linear interpolation towards `other`, `t` in [0, 1].
    pub fn lerp(&self, other: &LatLon, t: f64) -> LatLon {
        LatLon::new(
            self.lat + t * (other.lat - self.lat),
            self.lon + t * (other.lon - self.lon),
        )
    }
}

/// Distance from `p` to the edge `a`-`b`: the projection parameter is clamped
/// to [0, 1] so the closest point stays on the edge.
pub fn point_to_segment_distance(p: LatLon, a: LatLon, b: LatLon) -> f64 {
    let (px, py) = (p.lon, p.lat);
    let (ax, ay) = (a.lon, a.lat);
    let (bx, by) = (b.lon, b.lat);

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    // Degenerate edge collapses to its start vertex
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let closest_x = ax + t * dx;
    let closest_y = ay + t * dy;

    ((px - closest_x).powi(2) + (py - closest_y).powi(2)).sqrt()
}
