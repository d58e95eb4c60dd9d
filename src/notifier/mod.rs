use async_trait::async_trait;
use sea_orm::prelude::Decimal;

use crate::enums::Chain;
use crate::error::NotifyError;

mod smtp;
pub use smtp::SmtpNotifier;

/// Templated notification payloads. Each variant renders its own subject
/// and plain-text body.
#[derive(Debug, Clone)]
pub enum Notification {
    ThresholdCrossed {
        chain: Chain,
        price: Decimal,
        threshold: Decimal,
    },
    PriceIncrease {
        chain: Chain,
        pct: f64,
        current_price: f64,
        window_hours: f64,
    },
}

impl Notification {
    pub fn subject(&self) -> String {
        match self {
            Notification::ThresholdCrossed { chain, .. } => {
                format!("{} Price Alert", chain.display_name())
            }
            Notification::PriceIncrease { chain, .. } => {
                format!("{} Price Increase", chain.display_name())
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::ThresholdCrossed {
                chain,
                price,
                threshold,
            } => format!(
                "The {} price reached ${} USD, at or above your ${} USD threshold.\n\n\
                This alert has now been closed and will not fire again.",
                chain.display_name(),
                price,
                threshold,
            ),
            Notification::PriceIncrease {
                chain,
                pct,
                current_price,
                window_hours,
            } => format!(
                "The {} price rose {:.2}% over the last {:.1}h and is now ${:.4} USD.",
                chain.display_name(),
                pct,
                window_hours,
                current_price,
            ),
        }
    }
}

/// Outbound notification transport. Fire-and-log semantics; delivery to the
/// recipient's inbox is not guaranteed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        to: &str,
        notification: &Notification,
    ) -> std::result::Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_template_mentions_chain_and_prices() {
        let n = Notification::ThresholdCrossed {
            chain: Chain::Eth,
            price: "2500.50".parse().unwrap(),
            threshold: "2500".parse().unwrap(),
        };

        assert_eq!(n.subject(), "Ethereum Price Alert");
        let body = n.body();
        assert!(body.contains("$2500.50 USD"));
        assert!(body.contains("$2500 USD"));
    }

    #[test]
    fn test_increase_template_formats_percentage() {
        let n = Notification::PriceIncrease {
            chain: Chain::Pol,
            pct: 4.236,
            current_price: 0.52,
            window_hours: 1.0,
        };

        assert_eq!(n.subject(), "Polygon Price Increase");
        assert!(n.body().contains("4.24%"));
    }
}
