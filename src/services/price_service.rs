use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::Decimal;
use serde::Serialize;

use crate::db::entity::price;
use crate::enums::Chain;
use crate::error::Result;
use crate::stores::PriceStore;

/// Safely convert a Decimal to f64, returning None on parse failure.
fn decimal_to_f64(d: Decimal) -> Option<f64> {
    d.to_string().parse::<f64>().ok()
}

/// Read-side queries over the price time series, backing the HTTP API.
pub struct PriceQueryService {
    prices: Arc<dyn PriceStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestPrice {
    pub chain: Chain,
    pub token_symbol: String,
    pub usd_price: f64,
    pub observed_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPricePoint {
    pub hour: String,
    pub eth_price: Option<f64>,
    pub pol_price: Option<f64>,
}

impl PriceQueryService {
    pub fn new(prices: Arc<dyn PriceStore>) -> Self {
        Self { prices }
    }

    /// Most recent sample per chain. Chains without data are omitted.
    pub async fn latest_prices(&self) -> Result<Vec<LatestPrice>> {
        let mut latest = Vec::new();

        for &chain in Chain::all() {
            if let Some(sample) = self.prices.latest(chain).await? {
                let Some(usd_price) = decimal_to_f64(sample.usd_price) else {
                    continue;
                };
                latest.push(LatestPrice {
                    chain,
                    token_symbol: sample.token_symbol,
                    usd_price,
                    observed_at: sample.observed_at.to_rfc3339(),
                });
            }
        }

        Ok(latest)
    }

    /// Last 24 hours of samples bucketed by hour, averaged per chain.
    pub async fn hourly_prices(&self) -> Result<Vec<HourlyPricePoint>> {
        let from = Utc::now() - Duration::hours(24);
        let eth = self.prices.since(Chain::Eth, from).await?;
        let pol = self.prices.since(Chain::Pol, from).await?;

        Ok(bucket_hourly(&eth, &pol))
    }
}

fn hour_bucket(observed_at: DateTime<Utc>) -> i64 {
    observed_at.timestamp().div_euclid(3600)
}

fn bucket_label(bucket: i64) -> String {
    DateTime::<Utc>::from_timestamp(bucket * 3600, 0)
        .map(|t| t.format("%Y-%m-%d %H:00").to_string())
        .unwrap_or_default()
}

fn average(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

fn bucket_hourly(eth: &[price::Model], pol: &[price::Model]) -> Vec<HourlyPricePoint> {
    let mut buckets: BTreeMap<i64, (Vec<f64>, Vec<f64>)> = BTreeMap::new();

    for sample in eth {
        if let Some(price) = decimal_to_f64(sample.usd_price) {
            buckets
                .entry(hour_bucket(sample.observed_at))
                .or_default()
                .0
                .push(price);
        }
    }
    for sample in pol {
        if let Some(price) = decimal_to_f64(sample.usd_price) {
            buckets
                .entry(hour_bucket(sample.observed_at))
                .or_default()
                .1
                .push(price);
        }
    }

    buckets
        .into_iter()
        .map(|(bucket, (eth_prices, pol_prices))| HourlyPricePoint {
            hour: bucket_label(bucket),
            eth_price: average(&eth_prices),
            pol_price: average(&pol_prices),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn sample(chain: Chain, price: &str, at: &str) -> price::Model {
        price::Model {
            id: Uuid::new_v4(),
            chain: chain.as_str().to_string(),
            token_symbol: "X".to_string(),
            token_decimals: 18,
            usd_price: price.parse().unwrap(),
            observed_at: at.parse().unwrap(),
        }
    }

    #[test]
    fn test_hourly_buckets_average_per_chain() {
        let eth = vec![
            sample(Chain::Eth, "100", "2026-08-25T10:05:00Z"),
            sample(Chain::Eth, "110", "2026-08-25T10:45:00Z"),
            sample(Chain::Eth, "120", "2026-08-25T11:10:00Z"),
        ];
        let pol = vec![sample(Chain::Pol, "0.5", "2026-08-25T10:30:00Z")];

        let points = bucket_hourly(&eth, &pol);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].hour, "2026-08-25 10:00");
        assert_eq!(points[0].eth_price, Some(105.0));
        assert_eq!(points[0].pol_price, Some(0.5));
        assert_eq!(points[1].hour, "2026-08-25 11:00");
        assert_eq!(points[1].eth_price, Some(120.0));
        assert_eq!(points[1].pol_price, None);
    }

    #[test]
    fn test_no_samples_yields_no_buckets() {
        assert!(bucket_hourly(&[], &[]).is_empty());
    }
}
