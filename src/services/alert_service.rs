use std::str::FromStr;
use std::sync::Arc;

use sea_orm::prelude::Decimal;
use uuid::Uuid;

use crate::db::alert_repository::{AlertRepository, AlertUpdate, NewAlert};
use crate::db::entity::alert;
use crate::enums::Chain;
use crate::error::{AppError, Result};

pub struct AlertService {
    repository: Arc<AlertRepository>,
}

#[derive(Debug, Clone)]
pub struct CreateAlertRequest {
    pub chain: String,
    pub threshold_usd: f64,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAlertRequest {
    pub chain: Option<String>,
    pub threshold_usd: Option<f64>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_email(email: &str) -> Result<()> {
    if email.contains('@') && !email.starts_with('@') && !email.ends_with('@') {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Invalid email address: {}",
            email
        )))
    }
}

fn validate_threshold(threshold: f64) -> Result<Decimal> {
    if threshold < 0.0 {
        return Err(AppError::InvalidInput(
            "threshold_usd must be non-negative".to_string(),
        ));
    }
    Decimal::from_f64_retain(threshold).ok_or_else(|| {
        AppError::InvalidInput(format!("Unrepresentable threshold: {}", threshold))
    })
}

impl AlertService {
    pub fn new(repository: Arc<AlertRepository>) -> Self {
        Self { repository }
    }

    /// Create a new threshold alert.
    pub async fn create_alert(&self, req: CreateAlertRequest) -> Result<alert::Model> {
        let chain = Chain::from_str(&req.chain)?;
        let threshold_usd = validate_threshold(req.threshold_usd)?;
        validate_email(&req.email)?;

        let alert = self
            .repository
            .create(NewAlert {
                chain,
                threshold_usd,
                email: req.email,
            })
            .await?;

        tracing::info!(alert_id = %alert.id, chain = %alert.chain, threshold = %alert.threshold_usd, "alert created");
        Ok(alert)
    }

    pub async fn list_alerts(&self) -> Result<Vec<alert::Model>> {
        self.repository.list().await
    }

    pub async fn list_active_alerts(&self) -> Result<Vec<alert::Model>> {
        use crate::stores::AlertStore;
        self.repository.list_active().await
    }

    pub async fn get_alert(&self, id: Uuid) -> Result<alert::Model> {
        self.repository.get(id).await?.ok_or(AppError::AlertNotFound)
    }

    /// Partial update. Setting `is_active: true` here is the administrative
    /// reactivation path; the background evaluator only ever deactivates.
    pub async fn update_alert(&self, id: Uuid, req: UpdateAlertRequest) -> Result<alert::Model> {
        let chain = match req.chain {
            Some(raw) => Some(Chain::from_str(&raw)?),
            None => None,
        };
        let threshold_usd = match req.threshold_usd {
            Some(raw) => Some(validate_threshold(raw)?),
            None => None,
        };
        if let Some(ref email) = req.email {
            validate_email(email)?;
        }

        self.repository
            .update(
                id,
                AlertUpdate {
                    chain,
                    threshold_usd,
                    email: req.email,
                    is_active: req.is_active,
                },
            )
            .await
    }

    pub async fn delete_alert(&self, id: Uuid) -> Result<()> {
        self.repository.delete(id).await?;
        tracing::info!(alert_id = %id, "alert deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
    }

    #[test]
    fn test_threshold_validation() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(2500.55).is_ok());
        assert!(validate_threshold(-1.0).is_err());
    }
}
