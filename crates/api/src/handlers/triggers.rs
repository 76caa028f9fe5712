//! Trigger creation (spec §4.10 / §6) — one trigger per workflow, enforced
//! at the handler layer (the `UNIQUE (workflow_id)` constraint backstops
//! it at the database layer too).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::workflows::DEFAULT_OWNER_ID;
use crate::state::AppState;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTriggerDto {
    pub workflow_id: Uuid,
    #[serde(rename = "type")]
    pub trigger_type: String,
    #[serde(default)]
    pub config: Value,
}

/// 24 bytes of cryptographic randomness, base64url-encoded (spec §4.10).
fn generate_webhook_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 12 random bytes hex-encoded, embedded as `trigger-<hex>@<domain>`.
fn generate_email_token() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateTriggerDto>,
) -> ApiResult<(StatusCode, Json<db::models::TriggerRow>)> {
    db::repository::workflows::get_workflow(&state.pool, payload.workflow_id).await?;

    if db::repository::triggers::get_trigger_for_workflow(&state.pool, payload.workflow_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "workflow '{}' already has a trigger",
            payload.workflow_id
        )));
    }

    let (config, token) = match payload.trigger_type.as_str() {
        "WEBHOOK" => {
            let token = generate_webhook_token();
            let mut config = payload.config;
            if !config.is_object() {
                config = serde_json::json!({});
            }
            (config, Some(token))
        }
        "SCHEDULE" => {
            let cron = payload
                .config
                .get("cron")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::BadRequest("schedule trigger requires a 'cron' field".into()))?;
            queue::validate_cron(cron)?;
            (payload.config, None)
        }
        "EMAIL" => {
            let token = generate_email_token();
            let address = format!("trigger-{token}@{}", state.config.inbound_email_domain);
            (serde_json::json!({ "address": address }), Some(token))
        }
        other => return Err(ApiError::BadRequest(format!("unknown trigger type '{other}'"))),
    };

    let trigger = db::repository::triggers::upsert_trigger(
        &state.pool,
        payload.workflow_id,
        &payload.trigger_type,
        config,
        token.as_deref(),
    )
    .await?;

    if trigger.trigger_type == "SCHEDULE" {
        let cron = trigger.config.get("cron").and_then(Value::as_str).unwrap_or_default().to_string();
        let timezone = trigger.config.get("timezone").and_then(Value::as_str).map(str::to_string);
        let trigger_id = trigger.id;
        let workflow_id = trigger.workflow_id;
        let factory: queue::PayloadFactory = std::sync::Arc::new(move || {
            serde_json::json!({ "triggerId": trigger_id, "workflowId": workflow_id, "ownerId": DEFAULT_OWNER_ID })
        });
        state
            .scheduler
            .upsert_repeatable(&format!("schedule-trigger:{trigger_id}"), "scheduled-execution", &cron, timezone, factory)
            .await?;
    }

    Ok((StatusCode::CREATED, Json(trigger)))
}
