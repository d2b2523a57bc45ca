// Repository trait for sensor observation access
use crate::domain::error::LoadError;
use crate::domain::observation::{Datastream, Observation};
use crate::domain::time_window::TimeWindow;
use async_trait::async_trait;

#[async_trait]
pub trait ObservationRepository: Send + Sync {
    /// Every observation of `datastream` inside `window`, ascending by
    /// phenomenon time. Either the complete sequence or a `LoadError::Fetch`
    /// naming the datastream.
    async fn fetch_observations(
        &self,
        datastream: &Datastream,
        window: &TimeWindow,
        include_location: bool,
    ) -> Result<Vec<Observation>, LoadError>;
}
