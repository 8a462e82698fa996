use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
    /// Bus client, when connected
    pub bus: Option<async_nats::Client>,
}

impl AppState {
    pub fn new(bus: Option<async_nats::Client>) -> Self {
        Self {
            started_at: Instant::now(),
            bus,
        }
    }
}
