use std::sync::Arc;

pub mod alerts;
pub mod prices;

use crate::services::{AlertService, PriceQueryService};

#[derive(Clone)]
pub struct AppState {
    pub alert_service: Arc<AlertService>,
    pub price_service: Arc<PriceQueryService>,
}

impl AppState {
    pub fn new(alert_service: Arc<AlertService>, price_service: Arc<PriceQueryService>) -> Self {
        Self {
            alert_service,
            price_service,
        }
    }
}
