use std::sync::Arc;

use skyseat_core::FlightService;

#[derive(Clone)]
pub struct AppState {
    pub flights: Arc<FlightService>,
}

impl AppState {
    pub fn new(flights: FlightService) -> Self {
        Self {
            flights: Arc::new(flights),
        }
    }
}
