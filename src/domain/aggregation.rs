// Per-pass assignment of samples to street segments
use super::joined_sample::{JoinedSample, Metric};
use super::street::StreetNetwork;

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAverage {
    /// Position of the segment in the network.
    pub index: usize,
    pub mean: f64,
    pub count: usize,
}

/// Values assigned to each segment, indexed like the network's segments.
/// Reused across passes; only the active pass holds it, and each segment pass
/// starts with [`Self::reset_values`].
#[derive(Debug, Clone, Default)]
pub struct SegmentAccumulator {
    values: Vec<Vec<f64>>,
}

impl SegmentAccumulator {
    /// Clears every segment's values and sizes the accumulator to `network`.
    pub fn reset_values(&mut self, network: &StreetNetwork) {
        self.values.iter_mut().for_each(Vec::clear);
        self.values.resize_with(network.len(), Vec::new);
    }

    #[cfg(test)]
    pub fn values(&self, index: usize) -> &[f64] {
        self.values.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends each located sample's `metric` value to its nearest segment.
    /// Returns how many samples were assigned.
    pub fn aggregate(
        &mut self,
        network: &StreetNetwork,
        samples: &[JoinedSample],
        metric: Metric,
    ) -> usize {
        if self.values.len() != network.len() {
            self.reset_values(network);
        }

        let mut assigned = 0;
        for sample in samples {
            let (Some(location), Some(value)) = (sample.valid_location(), sample.value(metric))
            else {
                continue;
            };

            if let Some(nearest) = network.locate(location) {
                self.values[nearest.index].push(value);
                assigned += 1;
            }
        }

        assigned
    }

    /// Arithmetic mean per segment, in network order; segments that received
    /// nothing are left out.
    pub fn averages(&self) -> Vec<SegmentAverage> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, values)| !values.is_empty())
            .map(|(index, values)| SegmentAverage {
                index,
                mean: values.iter().sum::<f64>() / values.len() as f64,
                count: values.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::LatLon;
    use crate::domain::street::StreetSegment;
    use chrono::Utc;

    fn network() -> StreetNetwork {
        StreetNetwork::new(
            (0..5)
                .map(|i| {
                    StreetSegment::new(
                        i,
                        vec![LatLon::new(i as f64, 0.0), LatLon::new(i as f64, 1.0)],
                    )
                })
                .collect(),
        )
    }

    fn sample(lat: f64, lon: f64, rms: Option<f64>) -> JoinedSample {
        JoinedSample {
            time: Utc::now(),
            location: Some(LatLon::new(lat, lon)),
            rms,
            cci: None,
            speed: None,
        }
    }

    #[test]
    fn test_mean_per_segment() {
        let network = network();
        let samples = vec![sample(3.1, 0.5, Some(0.2)), sample(2.9, 0.2, Some(0.4))];

        let mut acc = SegmentAccumulator::default();
        acc.reset_values(&network);
        assert_eq!(acc.aggregate(&network, &samples, Metric::Rms), 2);

        let averages = acc.averages();
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].index, 3);
        assert_eq!(averages[0].count, 2);
        assert!((averages[0].mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_samples_without_value_or_location_are_ignored() {
        let network = network();
        let mut no_location = sample(0.0, 0.0, Some(1.0));
        no_location.location = None;
        let samples = vec![sample(1.0, 0.5, None), no_location, sample(4.0, 0.5, Some(0.7))];

        let mut acc = SegmentAccumulator::default();
        acc.reset_values(&network);
        assert_eq!(acc.aggregate(&network, &samples, Metric::Rms), 1);
        assert_eq!(acc.values(4), &[0.7]);
        assert!(acc.values(1).is_empty());
        assert!(acc.values(0).is_empty());
    }

    #[test]
    fn test_each_sample_lands_in_one_segment() {
        let network = network();
        let samples: Vec<JoinedSample> = (0..50)
            .map(|i| sample(i as f64 * 0.1, 0.5, Some(i as f64)))
            .collect();

        let mut acc = SegmentAccumulator::default();
        acc.reset_values(&network);
        acc.aggregate(&network, &samples, Metric::Rms);

        let total: usize = acc.averages().iter().map(|a| a.count).sum();
        assert_eq!(total, samples.len());
    }

    #[test]
    fn test_reset_follows_network_size() {
        let small = StreetNetwork::new(network().segments()[..2].to_vec());
        let samples = vec![sample(4.0, 0.5, Some(0.7)), sample(1.0, 0.5, Some(0.2))];

        let mut acc = SegmentAccumulator::default();
        acc.reset_values(&network());
        acc.aggregate(&network(), &samples, Metric::Rms);
        assert_eq!(acc.values(4), &[0.7]);

        acc.reset_values(&small);
        assert!(acc.values(4).is_empty());
        acc.aggregate(&small, &samples, Metric::Rms);
        assert_eq!(acc.values(1), &[0.7, 0.2]);
    }

    #[test]
    fn test_reset_clears_previous_pass() {
        let network = network();
        let samples = vec![sample(2.0, 0.5, Some(0.5))];

        let mut acc = SegmentAccumulator::default();
        acc.reset_values(&network);
        acc.aggregate(&network, &samples, Metric::Rms);
        let first = acc.averages();

        acc.reset_values(&network);
        assert!(acc.averages().is_empty());

        acc.aggregate(&network, &samples, Metric::Rms);
        assert_eq!(acc.averages(), first);
    }
}
