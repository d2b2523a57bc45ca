// SensorThings repository implementation
use crate::application::observation_repository::ObservationRepository;
use crate::domain::error::LoadError;
use crate::domain::observation::{Datastream, Observation};
use crate::domain::time_window::TimeWindow;
use crate::infrastructure::page_transport::PageTransport;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Clone)]
pub struct SensorThingsRepository {
    base_url: String,
    transport: Arc<dyn PageTransport>,
}

impl SensorThingsRepository {
    pub fn new(base_url: String, transport: Arc<dyn PageTransport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    fn build_observations_url(
        &self,
        datastream: &Datastream,
        window: &TimeWindow,
        include_location: bool,
    ) -> String {
        let filter = format!("during(phenomenonTime,{})", window.as_interval());
        let mut url = format!(
            "{}/Datastreams({})/Observations?$filter={}&$orderby=phenomenonTime",
            self.base_url,
            datastream.id,
            urlencoding::encode(&filter)
        );
        if include_location {
            url.push_str("&$expand=FeatureOfInterest");
        }
        url
    }
}

#[async_trait]
impl ObservationRepository for SensorThingsRepository {
    async fn fetch_observations(
        &self,
        datastream: &Datastream,
        window: &TimeWindow,
        include_location: bool,
    ) -> Result<Vec<Observation>, LoadError> {
        let mut next = Some(self.build_observations_url(datastream, window, include_location));
        let mut observations = Vec::new();
        let mut pages = 0;

        while let Some(url) = next {
            tracing::debug!("Fetching {} page {}: {}", datastream, pages + 1, url);
            let page = self
                .transport
                .get_page(&url)
                .await
                .map_err(|e| LoadError::Fetch {
                    datastream: datastream.to_string(),
                    reason: format!("{:#}", e),
                })?;

            observations.extend(page.value);
            next = page.next_link;
            pages += 1;
        }

        tracing::debug!(
            "Fetched {} observations for {} in {} pages",
            observations.len(),
            datastream,
            pages
        );
        Ok(observations)
    }
}
