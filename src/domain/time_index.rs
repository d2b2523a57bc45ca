// Per-stream time index and nearest-time lookup
use super::observation::Observation;
use std::collections::HashMap;

pub const DEFAULT_MAX_DELTA_SECONDS: f64 = 2.0;

/// Instant (epoch millis) to result, built once per stream per query.
///
/// Entries iterate in first-insertion order; a repeated instant overwrites the
/// earlier result in place.
#[derive(Debug, Clone)]
pub struct TimeIndex<T> {
    entries: Vec<(i64, T)>,
    positions: HashMap<i64, usize>,
}

impl<T> Default for TimeIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: Clone> TimeIndex<T> {
    /// Bulk build; observations whose result `project` rejects are skipped.
    pub fn build<F>(observations: &[Observation], project: F) -> Self
    where
        F: Fn(&Observation) -> Option<T>,
    {
        let mut index = Self {
            entries: Vec::with_capacity(observations.len()),
            positions: HashMap::with_capacity(observations.len()),
        };

        let mut skipped = 0usize;
        for obs in observations {
            match project(obs) {
                Some(result) => index.insert(obs.time_ms(), result),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} observations with unusable results", skipped);
        }

        index
    }

    fn insert(&mut self, instant_ms: i64, result: T) {
        match self.positions.get(&instant_ms) {
            Some(&pos) => self.entries[pos].1 = result,
            None => {
                self.positions.insert(instant_ms, self.entries.len());
                self.entries.push((instant_ms, result));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest result within `max_delta_seconds` of `target_ms`.
    ///
    /// Full scan in iteration order; only a strictly smaller difference
    /// replaces the current best, so the first-found minimum wins ties.
    pub fn find_closest(&self, target_ms: i64, max_delta_seconds: f64) -> Option<T> {
        let mut closest: Option<&T> = None;
        let mut min_diff = f64::INFINITY;

        for (time, result) in &self.entries {
            let diff = (target_ms - time).abs() as f64 / 1000.0;
            if diff < min_diff && diff <= max_delta_seconds {
                closest = Some(result);
                min_diff = diff;
            }
        }

        closest.cloned()
    }
}
