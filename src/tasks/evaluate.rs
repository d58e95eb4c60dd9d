use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::prelude::Decimal;

use crate::db::entity::alert;
use crate::enums::Chain;
use crate::error::Result;
use crate::notifier::{Notification, Notifier};
use crate::stores::{AlertStore, PriceStore};
use crate::tasks::PeriodicTask;

/// Scans active alerts against the latest sample per chain and runs the
/// at-most-once notification protocol on each match.
///
/// The compare-and-swap claim happens before the send: under two
/// overlapping passes only the claim winner notifies, so a subscriber can
/// never receive the same alert twice. A send that fails after a successful
/// claim is logged and the alert stays closed (delivery is fire-and-log).
pub struct ThresholdEvaluator {
    alerts: Arc<dyn AlertStore>,
    prices: Arc<dyn PriceStore>,
    notifier: Arc<dyn Notifier>,
}

impl ThresholdEvaluator {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        prices: Arc<dyn PriceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            alerts,
            prices,
            notifier,
        }
    }

    /// Latest price per distinct chain referenced by the active alerts.
    /// A chain with no sample (or a failing read) is simply absent from the
    /// map; its alerts are skipped for this cycle.
    async fn resolve_latest_prices(&self, active: &[alert::Model]) -> HashMap<Chain, Decimal> {
        let mut chains: Vec<Chain> = Vec::new();
        for alert in active {
            match Chain::from_str(&alert.chain) {
                Ok(chain) if !chains.contains(&chain) => chains.push(chain),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(alert_id = %alert.id, chain = %alert.chain, "alert references unknown chain");
                }
            }
        }

        let mut latest = HashMap::new();
        for chain in chains {
            match self.prices.latest(chain).await {
                Ok(Some(sample)) => {
                    latest.insert(chain, sample.usd_price);
                }
                Ok(None) => {
                    tracing::warn!(chain = %chain, "no price data, skipping its alerts this cycle");
                }
                Err(e) => {
                    tracing::error!(chain = %chain, error = %e, "price read failed, skipping its alerts this cycle");
                }
            }
        }

        latest
    }

    async fn fire(&self, alert: &alert::Model, chain: Chain, price: Decimal) {
        // Claim before sending. Losing the claim means another pass already
        // owns this alert's notification.
        match self.alerts.compare_and_deactivate(alert.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(alert_id = %alert.id, "alert already claimed by a concurrent pass");
                return;
            }
            Err(e) => {
                // Write considered not-yet-applied; the next cycle's CAS
                // attempt retries the transition.
                tracing::error!(alert_id = %alert.id, error = %e, "deactivation failed");
                return;
            }
        }

        let notification = Notification::ThresholdCrossed {
            chain,
            price,
            threshold: alert.threshold_usd,
        };

        match self.notifier.send(&alert.email, &notification).await {
            Ok(()) => {
                tracing::info!(
                    alert_id = %alert.id,
                    chain = %chain,
                    price = %price,
                    threshold = %alert.threshold_usd,
                    email = %alert.email,
                    "alert fired and closed"
                );
            }
            Err(e) => {
                tracing::error!(
                    alert_id = %alert.id,
                    email = %alert.email,
                    error = %e,
                    "alert closed but notification send failed"
                );
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for ThresholdEvaluator {
    fn name(&self) -> &'static str {
        "threshold-evaluator"
    }

    async fn run(&self) -> Result<()> {
        let active = self.alerts.list_active().await?;
        if active.is_empty() {
            tracing::debug!("no active alerts to process");
            return Ok(());
        }

        let latest = self.resolve_latest_prices(&active).await;

        for alert in &active {
            let Ok(chain) = Chain::from_str(&alert.chain) else {
                continue;
            };
            let Some(&price) = latest.get(&chain) else {
                continue;
            };

            // Inclusive: a price exactly at the threshold fires.
            if price >= alert.threshold_usd {
                self.fire(alert, chain, price).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::db::entity::price;
    use crate::error::NotifyError;
    use crate::stores::NewPriceSample;

    fn active_alert(chain: Chain, threshold: &str) -> alert::Model {
        let now = Utc::now();
        alert::Model {
            id: Uuid::new_v4(),
            chain: chain.as_str().to_string(),
            threshold_usd: threshold.parse().unwrap(),
            email: "subscriber@example.com".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample(chain: Chain, price: &str) -> price::Model {
        price::Model {
            id: Uuid::new_v4(),
            chain: chain.as_str().to_string(),
            token_symbol: "WETH".to_string(),
            token_decimals: 18,
            usd_price: price.parse().unwrap(),
            observed_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct MemoryAlerts {
        rows: Mutex<Vec<alert::Model>>,
    }

    impl MemoryAlerts {
        fn with(alerts: Vec<alert::Model>) -> Self {
            Self {
                rows: Mutex::new(alerts),
            }
        }

        fn is_active(&self, id: Uuid) -> bool {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .map(|a| a.is_active)
                .unwrap()
        }
    }

    #[async_trait]
    impl AlertStore for MemoryAlerts {
        async fn list_active(&self) -> Result<Vec<alert::Model>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.is_active)
                .cloned()
                .collect())
        }

        async fn compare_and_deactivate(&self, id: Uuid) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|a| a.id == id && a.is_active) {
                Some(row) => {
                    row.is_active = false;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    struct MemoryPrices {
        latest: Mutex<HashMap<Chain, price::Model>>,
    }

    impl MemoryPrices {
        fn with(samples: Vec<price::Model>) -> Self {
            let mut latest = HashMap::new();
            for s in samples {
                latest.insert(s.chain.parse().unwrap(), s);
            }
            Self {
                latest: Mutex::new(latest),
            }
        }

        fn empty() -> Self {
            Self {
                latest: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl PriceStore for MemoryPrices {
        async fn append(&self, _sample: NewPriceSample) -> Result<()> {
            Ok(())
        }

        async fn latest(&self, chain: Chain) -> Result<Option<price::Model>> {
            Ok(self.latest.lock().unwrap().get(&chain).cloned())
        }

        async fn latest_before(
            &self,
            _chain: Chain,
            _cutoff: DateTime<Utc>,
        ) -> Result<Option<price::Model>> {
            Ok(None)
        }

        async fn since(&self, _chain: Chain, _from: DateTime<Utc>) -> Result<Vec<price::Model>> {
            Ok(Vec::new())
        }

        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }
    }

    struct CountingNotifier {
        sends: AtomicUsize,
        fail: bool,
    }

    impl CountingNotifier {
        fn new() -> Self {
            Self {
                sends: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sends: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(
            &self,
            _to: &str,
            _notification: &Notification,
        ) -> std::result::Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Transient("smtp timeout".to_string()));
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn evaluator(
        alerts: Arc<MemoryAlerts>,
        prices: Arc<MemoryPrices>,
        notifier: Arc<CountingNotifier>,
    ) -> ThresholdEvaluator {
        ThresholdEvaluator::new(alerts, prices, notifier)
    }

    #[tokio::test]
    async fn test_price_at_threshold_fires_inclusively() {
        let alert = active_alert(Chain::Eth, "100");
        let id = alert.id;
        let alerts = Arc::new(MemoryAlerts::with(vec![alert]));
        let prices = Arc::new(MemoryPrices::with(vec![sample(Chain::Eth, "100")]));
        let notifier = Arc::new(CountingNotifier::new());

        evaluator(alerts.clone(), prices, notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(notifier.sends.load(Ordering::SeqCst), 1);
        assert!(!alerts.is_active(id));
    }

    #[tokio::test]
    async fn test_price_just_below_threshold_does_not_fire() {
        let alert = active_alert(Chain::Eth, "100");
        let id = alert.id;
        let alerts = Arc::new(MemoryAlerts::with(vec![alert]));
        let prices = Arc::new(MemoryPrices::with(vec![sample(Chain::Eth, "99.999999")]));
        let notifier = Arc::new(CountingNotifier::new());

        evaluator(alerts.clone(), prices, notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert!(alerts.is_active(id));
    }

    #[tokio::test]
    async fn test_chain_without_samples_is_skipped_without_error() {
        let alert = active_alert(Chain::Pol, "1");
        let id = alert.id;
        let alerts = Arc::new(MemoryAlerts::with(vec![alert]));
        let prices = Arc::new(MemoryPrices::empty());
        let notifier = Arc::new(CountingNotifier::new());

        evaluator(alerts.clone(), prices, notifier.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert!(alerts.is_active(id));
    }

    #[tokio::test]
    async fn test_concurrent_passes_send_at_most_once() {
        let alert = active_alert(Chain::Eth, "100");
        let id = alert.id;
        let alerts = Arc::new(MemoryAlerts::with(vec![alert]));
        let prices = Arc::new(MemoryPrices::with(vec![sample(Chain::Eth, "150")]));
        let notifier = Arc::new(CountingNotifier::new());

        let evaluator = Arc::new(evaluator(alerts.clone(), prices, notifier.clone()));

        // Both passes read the same active alert before either writes; the
        // CAS claim makes exactly one of them the sender.
        let first = {
            let evaluator = evaluator.clone();
            tokio::spawn(async move { evaluator.run().await })
        };
        let second = {
            let evaluator = evaluator.clone();
            tokio::spawn(async move { evaluator.run().await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(notifier.sends.load(Ordering::SeqCst), 1);
        assert!(!alerts.is_active(id));
    }

    #[tokio::test]
    async fn test_compare_and_deactivate_is_idempotent() {
        let alert = active_alert(Chain::Eth, "100");
        let id = alert.id;
        let alerts = MemoryAlerts::with(vec![alert]);

        assert!(alerts.compare_and_deactivate(id).await.unwrap());
        assert!(!alerts.compare_and_deactivate(id).await.unwrap());
        assert!(!alerts.is_active(id));
    }

    #[tokio::test]
    async fn test_send_failure_still_closes_the_alert() {
        let alert = active_alert(Chain::Eth, "100");
        let id = alert.id;
        let alerts = Arc::new(MemoryAlerts::with(vec![alert]));
        let prices = Arc::new(MemoryPrices::with(vec![sample(Chain::Eth, "150")]));
        let notifier = Arc::new(CountingNotifier::failing());

        evaluator(alerts.clone(), prices, notifier.clone())
            .run()
            .await
            .unwrap();

        // Fire-and-log: the obligation closes once claimed, even when the
        // transport fails.
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert!(!alerts.is_active(id));
    }
}
