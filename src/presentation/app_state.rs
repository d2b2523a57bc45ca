// Application state for HTTP handlers
use crate::application::ride_map_service::RideMapService;

#[derive(Clone)]
pub struct AppState {
    pub ride_map_service: RideMapService,
}
