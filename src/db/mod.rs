pub mod entity;
pub use entity::*;

pub mod price_repository;
pub use price_repository::PriceRepository;

pub mod alert_repository;
pub use alert_repository::AlertRepository;
