//! Inbound email ingress (spec §4.10) — `POST /webhooks/email`.
//!
//! Content-type-driven: SendGrid posts `multipart/form-data`, Mailgun and
//! the generic fallback post JSON. A missing trigger or an inactive
//! workflow both resolve to `{success:false}` with 200 — suppressing the
//! provider's retry behaviour rather than surfacing an error.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default)]
struct InboundEmail {
    from: String,
    to: String,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Value>,
}

async fn parse_multipart(content_type: &str, body: Bytes) -> ApiResult<InboundEmail> {
    let boundary = multer::parse_boundary(content_type).map_err(|_| ApiError::BadRequest("missing multipart boundary".into()))?;
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut email = InboundEmail::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());

        if let Some(filename) = file_name {
            let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
            let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            email.attachments.push(serde_json::json!({
                "filename": filename,
                "contentType": content_type,
                "content": STANDARD.encode(&bytes),
            }));
            continue;
        }

        let text = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        match name.as_str() {
            "from" | "envelope_from" => email.from = text,
            "to" | "envelope_to" => email.to = text,
            "subject" => email.subject = text,
            "text" | "body-plain" => email.text = Some(text),
            "html" | "body-html" => email.html = Some(text),
            _ => {}
        }
    }

    Ok(email)
}

fn parse_json(body: &Bytes) -> ApiResult<InboundEmail> {
    let value: Value = serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;

    let field = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|k| value.get(k).and_then(Value::as_str))
            .map(str::to_string)
    };

    let attachments = value
        .get("attachments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(InboundEmail {
        from: field(&["from", "sender"]).unwrap_or_default(),
        to: field(&["to", "recipient"]).unwrap_or_default(),
        subject: field(&["subject"]).unwrap_or_default(),
        text: field(&["text", "body-plain", "plain"]),
        html: field(&["html", "body-html"]),
        attachments,
    })
}

/// Extract the trigger token from `trigger-<hex>@<domain>` — the address
/// shape minted in `handlers::triggers::create`.
fn extract_token(to: &str) -> Option<String> {
    let local = to.split('@').next()?;
    local.strip_prefix("trigger-").map(str::to_string)
}

pub async fn handle_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();

    let email = if content_type.starts_with("multipart/form-data") {
        parse_multipart(&content_type, body).await?
    } else {
        parse_json(&body)?
    };

    let Some(token) = extract_token(&email.to) else {
        return Ok((StatusCode::OK, Json(serde_json::json!({ "success": false }))));
    };

    let trigger = db::repository::triggers::get_trigger_by_token(&state.pool, &token)
        .await?
        .filter(|t| t.trigger_type == "EMAIL");

    let Some(trigger) = trigger else {
        return Ok((StatusCode::OK, Json(serde_json::json!({ "success": false }))));
    };

    let workflow = db::repository::workflows::get_workflow(&state.pool, trigger.workflow_id).await?;
    if !workflow.is_active {
        return Ok((StatusCode::OK, Json(serde_json::json!({ "success": false }))));
    }

    let trigger_data = serde_json::json!({
        "from": email.from,
        "to": email.to,
        "subject": email.subject,
        "text": email.text,
        "html": email.html,
        "attachments": email.attachments,
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
