use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::Decimal;

use crate::enums::Chain;
use crate::error::Result;
use crate::notifier::{Notification, Notifier};
use crate::stores::PriceStore;
use crate::tasks::PeriodicTask;

/// Safely convert a Decimal to f64, returning None on parse failure.
fn decimal_to_f64(d: Decimal) -> Option<f64> {
    d.to_string().parse::<f64>().ok()
}

/// Compares each chain's latest sample against the most recent sample from
/// at least one window ago and emails when the relative increase exceeds
/// the configured percentage (strictly greater).
///
/// A per-chain cooldown suppresses repeat emails while the condition
/// persists. The cooldown lives in process memory on purpose: after a
/// restart the worst case is one extra email, which is acceptable for an
/// advisory notification with no alert record behind it.
pub struct ChangeDetector {
    prices: Arc<dyn PriceStore>,
    notifier: Arc<dyn Notifier>,
    /// Operator address the advisory emails go to; there is no per-user
    /// subscription behind the change detector.
    notify_to: String,
    threshold_pct: f64,
    window: Duration,
    cooldown: Duration,
    last_fired: Mutex<HashMap<Chain, DateTime<Utc>>>,
}

impl ChangeDetector {
    pub fn new(
        prices: Arc<dyn PriceStore>,
        notifier: Arc<dyn Notifier>,
        notify_to: String,
        threshold_pct: f64,
        window_secs: u64,
        cooldown_secs: u64,
    ) -> Self {
        Self {
            prices,
            notifier,
            notify_to,
            threshold_pct,
            window: Duration::seconds(window_secs as i64),
            cooldown: Duration::seconds(cooldown_secs as i64),
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    fn in_cooldown(&self, chain: Chain, now: DateTime<Utc>) -> bool {
        self.last_fired
            .lock()
            .unwrap()
            .get(&chain)
            .map(|&fired| now - fired < self.cooldown)
            .unwrap_or(false)
    }

    async fn check_chain(&self, chain: Chain, now: DateTime<Utc>) {
        let current = match self.prices.latest(chain).await {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                tracing::warn!(chain = %chain, "no current sample, skipping chain");
                return;
            }
            Err(e) => {
                tracing::error!(chain = %chain, error = %e, "price read failed, skipping chain");
                return;
            }
        };

        let past = match self.prices.latest_before(chain, now - self.window).await {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                tracing::warn!(chain = %chain, "no sample old enough for the window, skipping chain");
                return;
            }
            Err(e) => {
                tracing::error!(chain = %chain, error = %e, "price read failed, skipping chain");
                return;
            }
        };

        let (Some(current_f), Some(past_f)) = (
            decimal_to_f64(current.usd_price),
            decimal_to_f64(past.usd_price),
        ) else {
            tracing::warn!(chain = %chain, "unparseable stored price, skipping chain");
            return;
        };

        // A zero past price cannot anchor a percentage; treat it as missing.
        if past_f <= 0.0 {
            tracing::warn!(chain = %chain, "non-positive past price, skipping chain");
            return;
        }

        let pct = (current_f - past_f) / past_f * 100.0;
        if pct <= self.threshold_pct {
            return;
        }

        if self.in_cooldown(chain, now) {
            tracing::debug!(chain = %chain, pct, "increase persists, suppressed by cooldown");
            return;
        }

        let notification = Notification::PriceIncrease {
            chain,
            pct,
            current_price: current_f,
            window_hours: self.window.num_seconds() as f64 / 3600.0,
        };

        match self.notifier.send(&self.notify_to, &notification).await {
            Ok(()) => {
                self.last_fired.lock().unwrap().insert(chain, now);
                tracing::info!(chain = %chain, pct, current = current_f, past = past_f, "price increase notified");
            }
            Err(e) => {
                // No cooldown recorded on failure; the next tick retries.
                tracing::error!(chain = %chain, error = %e, "price increase notification failed");
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for ChangeDetector {
    fn name(&self) -> &'static str {
        "change-detector"
    }

    async fn run(&self) -> Result<()> {
        let now = Utc::now();
        for &chain in Chain::all() {
            self.check_chain(chain, now).await;
        }
        Ok(())
    }
}
