use axum::extract::State;
use axum::Json;

use crate::error::Result;
use crate::services::price_service::{HourlyPricePoint, LatestPrice};

use super::AppState;

pub async fn latest_prices(State(state): State<AppState>) -> Result<Json<Vec<LatestPrice>>> {
    let prices = state.price_service.latest_prices().await?;
    Ok(Json(prices))
}

pub async fn hourly_prices(State(state): State<AppState>) -> Result<Json<Vec<HourlyPricePoint>>> {
    let points = state.price_service.hourly_prices().await?;
    Ok(Json(points))
}
