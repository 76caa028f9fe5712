//! Webhook ingress (spec §4.10) — the public, unauthenticated fast path
//! from an external HTTP call into a queued execution.
//!
//! Trigger lookup is an indexed `db::repository::triggers::get_trigger_by_token`
//! lookup, not a linear scan over every workflow's definition.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Json;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Headers never forwarded into `triggerData.headers` — credentials the
/// workflow author should never see echoed back in a step log (spec
/// §4.10).
const REDACTED_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key", "x-auth-token"];

fn sanitized_headers(headers: &HeaderMap) -> serde_json::Map<String, Value> {
    headers
        .iter()
        .filter(|(name, _)| !REDACTED_HEADERS.contains(&name.as_str().to_ascii_lowercase().as_str()))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect()
}

/// Verify `sha256=<hex>` against `HMAC-SHA256(raw_body, secret)` with a
/// timing-safe comparison (`Mac::verify_slice` is constant-time).
fn verify_signature(secret: &str, raw_body: &[u8], header_value: &str) -> bool {
    let Some(provided_hex) = header_value.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided_tag) = hex::decode(provided_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    mac.verify_slice(&provided_tag).is_ok()
}

pub async fn handle_webhook(
    Path(token): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let trigger = db::repository::triggers::get_trigger_by_token(&state.pool, &token)
        .await?
        .filter(|t| t.trigger_type == "WEBHOOK")
        .ok_or_else(|| ApiError::NotFound("no webhook trigger registered for this token".into()))?;

    let workflow = db::repository::workflows::get_workflow(&state.pool, trigger.workflow_id).await?;
    if !workflow.is_active {
        return Err(ApiError::Forbidden("workflow is not active".into()));
    }

    if let Some(secret) = trigger.config.get("secret").and_then(Value::as_str) {
        let signature = headers
            .get("x-webhook-signature")
            .or_else(|| headers.get("x-hub-signature-256"))
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("missing webhook signature header".into()))?;

        if !verify_signature(secret, &body, signature) {
            return Err(ApiError::BadRequest("webhook signature verification failed".into()));
        }
    }

    let parsed_body: Value = serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

    let trigger_data = serde_json::json!({
        "body": parsed_body,
        "headers": sanitized_headers(&headers),
        "query": query,
        "method": method.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let execution = db::repository::executions::create_execution(&state.pool, workflow.id, trigger_data).await?;

    state
        .queue
        .enqueue(
            "execute",
            serde_json::json!({ "executionId": execution.id }),
            queue::EnqueueOptions::with_job_id(execution.id.to_string()),
        )
        .await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true, "executionId": execution.id }))))
}
