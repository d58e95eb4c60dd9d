use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::entity::alert;
use crate::error::Result;
use crate::services::alert_service::{CreateAlertRequest, UpdateAlertRequest};

use super::AppState;

#[derive(Deserialize)]
pub struct CreateAlertBody {
    pub chain: String,
    pub threshold_usd: f64,
    pub email: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateAlertBody {
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub threshold_usd: Option<f64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct AlertResponse {
    pub id: Uuid,
    pub chain: String,
    pub threshold_usd: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: String,
}

impl From<alert::Model> for AlertResponse {
    fn from(alert: alert::Model) -> Self {
        Self {
            id: alert.id,
            chain: alert.chain,
            threshold_usd: alert.threshold_usd.to_string(),
            email: alert.email,
            is_active: alert.is_active,
            created_at: alert.created_at.to_rfc3339(),
        }
    }
}

pub async fn create_alert(
    State(state): State<AppState>,
    Json(body): Json<CreateAlertBody>,
) -> Result<(StatusCode, Json<AlertResponse>)> {
    let alert = state
        .alert_service
        .create_alert(CreateAlertRequest {
            chain: body.chain,
            threshold_usd: body.threshold_usd,
            email: body.email,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(alert.into())))
}

pub async fn list_alerts(State(state): State<AppState>) -> Result<Json<Vec<AlertResponse>>> {
    let alerts = state.alert_service.list_alerts().await?;
    Ok(Json(alerts.into_iter().map(Into::into).collect()))
}

pub async fn list_active_alerts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AlertResponse>>> {
    let alerts = state.alert_service.list_active_alerts().await?;
    Ok(Json(alerts.into_iter().map(Into::into).collect()))
}

pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AlertResponse>> {
    let alert = state.alert_service.get_alert(alert_id).await?;
    Ok(Json(alert.into()))
}

pub async fn update_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
    Json(body): Json<UpdateAlertBody>,
) -> Result<Json<AlertResponse>> {
    let alert = state
        .alert_service
        .update_alert(
            alert_id,
            UpdateAlertRequest {
                chain: body.chain,
                threshold_usd: body.threshold_usd,
                email: body.email,
                is_active: body.is_active,
            },
        )
        .await?;

    Ok(Json(alert.into()))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.alert_service.delete_alert(alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
