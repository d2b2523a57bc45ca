// Ride map service - One join-and-render pass per user-triggered load
use crate::application::observation_repository::ObservationRepository;
use crate::application::street_network_store::StreetNetworkStore;
use crate::domain::aggregation::SegmentAccumulator;
use crate::domain::classification::{BandTable, BandTables, Legend};
use crate::domain::error::LoadError;
use crate::domain::joined_sample::{join, AuxiliaryIndices, Metric};
use crate::domain::observation::Observation;
use crate::domain::render::{
    point_markers, segment_lines, trace_lines, RenderOutput, StreamMessage, ViewMode,
};
use crate::domain::time_index::TimeIndex;
use crate::domain::time_window::TimeWindow;
use crate::infrastructure::config::DatastreamSettings;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

const ARTIFACTS_PER_MESSAGE: usize = 500;

/// Upper bound on trace sub-lines per consecutive sample pair.
pub const MAX_INTERPOLATION_STEPS: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub window: TimeWindow,
    pub metric: Metric,
    pub mode: ViewMode,
    /// Sub-lines per consecutive pair in trace mode, 1 = none.
    pub interpolate: u32,
}

impl LoadRequest {
    /// Validates the raw UI selections before anything touches the network.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        metric: Option<&str>,
        mode: Option<&str>,
        interpolate: Option<u32>,
    ) -> Result<Self, LoadError> {
        let window = TimeWindow::parse(start, end)?;
        let metric = metric
            .unwrap_or("rms")
            .parse::<Metric>()
            .map_err(LoadError::Validation)?;
        let mode = mode
            .unwrap_or("points")
            .parse::<ViewMode>()
            .map_err(LoadError::Validation)?;
        let interpolate = interpolate.unwrap_or(1).max(1);
        if interpolate > MAX_INTERPOLATION_STEPS {
            return Err(LoadError::validation(format!(
                "interpolate must be at most {}, got {}",
                MAX_INTERPOLATION_STEPS, interpolate
            )));
        }

        Ok(Self {
            window,
            metric,
            mode,
            interpolate,
        })
    }
}

#[derive(Clone)]
pub struct RideMapService {
    repository: Arc<dyn ObservationRepository>,
    streets: StreetNetworkStore,
    datastreams: DatastreamSettings,
    bands: Arc<BandTables>,
    max_delta_seconds: f64,
    /// Serializes passes and holds the accumulator the active pass reuses.
    pass_lock: Arc<Mutex<SegmentAccumulator>>,
}

impl RideMapService {
    pub fn new(
        repository: Arc<dyn ObservationRepository>,
        streets: StreetNetworkStore,
        datastreams: DatastreamSettings,
        bands: BandTables,
        max_delta_seconds: f64,
    ) -> Self {
        Self {
            repository,
            streets,
            datastreams,
            bands: Arc::new(bands),
            max_delta_seconds,
            pass_lock: Arc::new(Mutex::new(SegmentAccumulator::default())),
        }
    }

    fn table_for(&self, metric: Metric) -> Result<&BandTable, LoadError> {
        self.bands
            .table_for(metric)
            .ok_or_else(|| LoadError::validation(format!("no color bands configured for {}", metric)))
    }

    pub fn legend(&self, metric: Metric) -> Result<Legend, LoadError> {
        Ok(self.table_for(metric)?.legend(metric))
    }

    /// Fetches all four streams, joins them and builds the artifacts for the
    /// requested view. Passes are serialized; a second load waits for the
    /// running one to finish.
    pub async fn load(&self, request: &LoadRequest) -> Result<RenderOutput, LoadError> {
        let table = self.table_for(request.metric)?;
        let network = self.streets.current().await?;

        let mut accumulator = self.pass_lock.lock().await;
        let started = Instant::now();

        let position_stream = self.datastreams.position();
        let [rms_stream, cci_stream, speed_stream] = self.datastreams.auxiliary();
        let window = &request.window;

        let (positions, rms, cci, speed) = tokio::try_join!(
            self.repository.fetch_observations(&position_stream, window, true),
            self.repository.fetch_observations(&rms_stream.1, window, false),
            self.repository.fetch_observations(&cci_stream.1, window, false),
            self.repository.fetch_observations(&speed_stream.1, window, false)
        )?;

        tracing::debug!(
            "Fetched observations: gps={} rms={} cci={} speed={}",
            positions.len(),
            rms.len(),
            cci.len(),
            speed.len()
        );

        let mut auxiliary = AuxiliaryIndices::new();
        for (metric, observations) in [(rms_stream.0, &rms), (cci_stream.0, &cci), (speed_stream.0, &speed)] {
            let index = TimeIndex::build(observations, Observation::scalar);
            if index.is_empty() {
                tracing::warn!("No usable {} values in window, field stays empty", metric);
            } else {
                tracing::debug!("Indexed {} {} instants", index.len(), metric);
            }
            auxiliary.insert(metric, index);
        }

        let samples = join(&positions, &auxiliary, self.max_delta_seconds);

        let artifacts = match request.mode {
            ViewMode::Points => point_markers(&samples, request.metric, table),
            ViewMode::Segments => {
                accumulator.reset_values(&network);
                let assigned = accumulator.aggregate(&network, &samples, request.metric);
                tracing::debug!("Assigned {} of {} samples to segments", assigned, samples.len());
                segment_lines(&network, &accumulator.averages(), table)
            }
            ViewMode::Trace => trace_lines(&samples, request.metric, table, request.interpolate),
        };

        tracing::info!(
            "Rendered {} {:?} artifacts colored by {} from {} samples in {}ms",
            artifacts.len(),
            request.mode,
            request.metric,
            samples.len(),
            started.elapsed().as_millis()
        );

        Ok(RenderOutput {
            metric: request.metric,
            mode: request.mode,
            sample_count: samples.len(),
            artifacts,
            legend: table.legend(request.metric),
        })
    }

    /// Progressive variant of [`Self::load`]: `Clear` is sent immediately,
    /// then the legend, artifact batches and a completion or error message.
    pub fn stream_render(&self, request: LoadRequest) -> mpsc::Receiver<StreamMessage> {
        let (tx, rx) = mpsc::channel(100);
        let service = self.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let _ = tx.send(StreamMessage::Clear).await;

            match service.load(&request).await {
                Ok(output) => {
                    let _ = tx.send(StreamMessage::Legend { legend: output.legend }).await;

                    let artifact_count = output.artifacts.len();
                    for chunk in output.artifacts.chunks(ARTIFACTS_PER_MESSAGE) {
                        let msg = StreamMessage::Artifacts {
                            artifacts: chunk.to_vec(),
                        };
                        if tx.send(msg).await.is_err() {
                            tracing::debug!("Render stream receiver dropped");
                            return;
                        }
                    }

                    let _ = tx
                        .send(StreamMessage::Complete {
                            artifact_count,
                            sample_count: output.sample_count,
                            duration_ms: started.elapsed().as_millis() as i64,
                        })
                        .await;
                }
                Err(e) => {
                    tracing::error!("Render pass failed: {}", e);
                    let _ = tx.send(StreamMessage::Error { message: e.to_string() }).await;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::LatLon;
    use crate::domain::observation::Datastream;
    use crate::domain::render::DrawnArtifact;
    use crate::domain::street::{StreetNetwork, StreetSegment};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct InMemoryRepository {
        streams: HashMap<String, Vec<Observation>>,
        failing: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObservationRepository for InMemoryRepository {
        async fn fetch_observations(
            &self,
            datastream: &Datastream,
            window: &TimeWindow,
            _include_location: bool,
        ) -> Result<Vec<Observation>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.as_deref() == Some(datastream.id.as_str()) {
                return Err(LoadError::Fetch {
                    datastream: datastream.to_string(),
                    reason: "status 500".to_string(),
                });
            }
            Ok(self
                .streams
                .get(&datastream.id)
                .map(|obs| {
                    obs.iter()
                        .filter(|o| o.phenomenon_time >= window.start && o.phenomenon_time < window.end)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn at(time: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(time).unwrap().with_timezone(&Utc)
    }

    fn datastreams() -> DatastreamSettings {
        DatastreamSettings {
            gps: "1".to_string(),
            rms: "2".to_string(),
            cci: "3".to_string(),
            speed: "4".to_string(),
        }
    }

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

    fn repository() -> InMemoryRepository {
        let mut streams = HashMap::new();
        streams.insert(
            "1".to_string(),
            vec![
                Observation::new(at("2024-05-01T10:00:00Z"), json!({"latitude": 3.1, "longitude": 0.5})),
                Observation::new(at("2024-05-01T10:00:05Z"), json!({"latitude": 2.9, "longitude": 0.2})),
            ],
        );
        streams.insert(
            "2".to_string(),
            vec![
                Observation::new(at("2024-05-01T10:00:01Z"), json!(0.2)),
                Observation::new(at("2024-05-01T10:00:06Z"), json!(0.4)),
            ],
        );
        streams.insert(
            "3".to_string(),
            vec![
                Observation::new(at("2024-05-01T10:00:00Z"), json!(4)),
                Observation::new(at("2024-05-01T10:00:05Z"), json!(2)),
            ],
        );
        streams.insert(
            "4".to_string(),
            vec![Observation::new(at("2024-05-01T10:00:00Z"), json!(17.5))],
        );
        InMemoryRepository {
            streams,
            ..Default::default()
        }
    }

    async fn service_with(repo: Arc<InMemoryRepository>, loaded: bool) -> RideMapService {
        let streets = StreetNetworkStore::new();
        if loaded {
            streets.set(network()).await;
        }
        RideMapService::new(repo, streets, datastreams(), BandTables::default(), 2.0)
    }

    async fn service(repo: InMemoryRepository, loaded: bool) -> RideMapService {
        service_with(Arc::new(repo), loaded).await
    }

    fn request(mode: &str, metric: &str) -> LoadRequest {
        LoadRequest::parse(
            Some("2024-05-01T09:59:00Z"),
            Some("2024-05-01T10:01:00Z"),
            Some(metric),
            Some(mode),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_segment_mode_averages_nearest_segment() {
        let service = service(repository(), true).await;

        let output = service.load(&request("segments", "rms")).await.unwrap();

        assert_eq!(output.sample_count, 2);
        assert_eq!(output.artifacts.len(), 1);
        match &output.artifacts[0] {
            DrawnArtifact::SegmentLine {
                segment_id,
                color,
                average_value,
                sample_count,
                ..
            } => {
                assert_eq!(*segment_id, 3);
                assert_eq!(*sample_count, 2);
                assert!((average_value - 0.3).abs() < 1e-12);
                assert_eq!(color, "#216e39");
            }
            other => panic!("unexpected artifact {:?}", other),
        }
        assert_eq!(output.legend.title, "RMS (m/s²)");
    }

    #[tokio::test]
    async fn test_repeated_pass_is_idempotent() {
        let service = service(repository(), true).await;
        let req = request("segments", "cci");

        let first = service.load(&req).await.unwrap();
        let second = service.load(&req).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_points_mode() {
        let service = service(repository(), true).await;

        let output = service.load(&request("points", "cci")).await.unwrap();

        assert_eq!(output.artifacts.len(), 2);
        match &output.artifacts[0] {
            DrawnArtifact::PointMarker { color, popup, .. } => {
                assert_eq!(color, "#90e0ef");
                assert_eq!(popup.speed, Some(17.5));
            }
            other => panic!("unexpected artifact {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_network_rejects_before_fetching() {
        let repo = Arc::new(repository());
        let service = service_with(repo.clone(), false).await;

        let err = service.load(&request("segments", "rms")).await.unwrap_err();
        assert!(matches!(err, LoadError::EmptyNetwork));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_edgeless_network_rejects_load() {
        let repo = Arc::new(repository());
        let streets = StreetNetworkStore::new();
        streets
            .set(StreetNetwork::new(vec![
                StreetSegment::new(0, vec![]),
                StreetSegment::new(1, vec![LatLon::new(3.0, 0.5)]),
            ]))
            .await;
        let service =
            RideMapService::new(repo.clone(), streets, datastreams(), BandTables::default(), 2.0);

        let err = service.load(&request("segments", "rms")).await.unwrap_err();
        assert!(matches!(err, LoadError::EmptyNetwork));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reused_accumulator_starts_each_pass_clean() {
        let service = service(repository(), true).await;
        let segments = request("segments", "rms");

        let first = service.load(&segments).await.unwrap();
        service.load(&request("segments", "cci")).await.unwrap();
        service.load(&request("trace", "rms")).await.unwrap();
        let again = service.load(&segments).await.unwrap();

        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_fetch_failure_names_stream() {
        let mut repo = repository();
        repo.failing = Some("3".to_string());
        let service = service(repo, true).await;

        let err = service.load(&request("points", "rms")).await.unwrap_err();
        assert!(err.to_string().contains("cci (3)"));
    }

    #[tokio::test]
    async fn test_speed_without_bands_is_validation_error() {
        let service = service(repository(), true).await;

        let err = service.load(&request("points", "speed")).await.unwrap_err();
        assert!(matches!(err, LoadError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stream_render_message_order() {
        let service = service(repository(), true).await;

        let mut rx = service.stream_render(request("trace", "rms"));
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv().await {
            messages.push(msg);
        }

        assert_eq!(messages[0], StreamMessage::Clear);
        assert!(matches!(messages[1], StreamMessage::Legend { .. }));
        assert!(matches!(messages[2], StreamMessage::Artifacts { ref artifacts } if artifacts.len() == 1));
        assert!(matches!(
            messages.last(),
            Some(StreamMessage::Complete { artifact_count: 1, sample_count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_render_reports_errors() {
        let service = service(repository(), false).await;

        let mut rx = service.stream_render(request("points", "rms"));
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv().await {
            messages.push(msg);
        }

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[1], StreamMessage::Error { .. }));
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            LoadRequest::parse(None, Some("2024-05-01T10:00:00Z"), None, None, None),
            Err(LoadError::Validation(_))
        ));
        assert!(matches!(
            LoadRequest::parse(
                Some("2024-05-01T10:00:00Z"),
                Some("2024-05-01T11:00:00Z"),
                Some("rms"),
                Some("heatmap"),
                None
            ),
            Err(LoadError::Validation(_))
        ));

        let req = LoadRequest::parse(
            Some("2024-05-01T10:00:00Z"),
            Some("2024-05-01T11:00:00Z"),
            None,
            Some("lines"),
            Some(0),
        )
        .unwrap();
        assert_eq!(req.metric, Metric::Rms);
        assert_eq!(req.mode, ViewMode::Segments);
        assert_eq!(req.interpolate, 1);

        let parse_steps = |steps| {
            LoadRequest::parse(
                Some("2024-05-01T10:00:00Z"),
                Some("2024-05-01T11:00:00Z"),
                Some("rms"),
                Some("trace"),
                Some(steps),
            )
        };
        assert_eq!(parse_steps(MAX_INTERPOLATION_STEPS).unwrap().interpolate, MAX_INTERPOLATION_STEPS);
        assert!(matches!(parse_steps(MAX_INTERPOLATION_STEPS + 1), Err(LoadError::Validation(_))));
        assert!(matches!(parse_steps(u32::MAX), Err(LoadError::Validation(_))));
    }
}
