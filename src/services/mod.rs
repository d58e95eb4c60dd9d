pub mod alert_service;
pub mod price_service;

pub use alert_service::AlertService;
pub use price_service::PriceQueryService;
