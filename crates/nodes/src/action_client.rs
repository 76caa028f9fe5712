//! Typed clients for every I/O-bound action kind.
//!
//! Per spec §1, the concrete side effects (real HTTP calls, real SMTP, the
//! real Telegram Bot API, a real SQL driver, a real AI completion API) are
//! external collaborators out of the engine's scope — the engine only
//! needs a uniform interface to invoke them through. Each trait here is
//! that interface; the `NotConfigured` stub implementations let the engine
//! and its tests run end-to-end without a live integration wired in.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::NodeError;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> Result<Value, NodeError>;
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<Value, NodeError>;
}

#[async_trait]
pub trait TelegramClient: Send + Sync {
    async fn send_message(&self, chat_id: &str, message: &str) -> Result<Value, NodeError>;
}

#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn query(&self, query: &str) -> Result<Value, NodeError>;
}

#[async_trait]
pub trait AiClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        output_schema: Option<&Value>,
        temperature: Option<f64>,
        max_tokens: Option<u32>,
    ) -> Result<Value, NodeError>;
}

/// A client stub that always returns a fatal "not configured" error. Used
/// as the default wiring in tests and anywhere a concrete integration
/// hasn't been plugged in — never used to fabricate a fake success.
pub struct NotConfigured;

#[async_trait]
impl HttpClient for NotConfigured {
    async fn request(
        &self,
        _method: &str,
        _url: &str,
        _headers: &HashMap<String, String>,
        _body: Option<&Value>,
    ) -> Result<Value, NodeError> {
        Err(NodeError::Fatal("no HTTP client configured".into()))
    }
}

#[async_trait]
impl EmailClient for NotConfigured {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<Value, NodeError> {
        Err(NodeError::Fatal("no email client configured".into()))
    }
}

#[async_trait]
impl TelegramClient for NotConfigured {
    async fn send_message(&self, _chat_id: &str, _message: &str) -> Result<Value, NodeError> {
        Err(NodeError::Fatal("no Telegram client configured".into()))
    }
}

#[async_trait]
impl DatabaseClient for NotConfigured {
    async fn query(&self, _query: &str) -> Result<Value, NodeError> {
        Err(NodeError::Fatal("no database client configured".into()))
    }
}

#[async_trait]
impl AiClient for NotConfigured {
    async fn complete(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _output_schema: Option<&Value>,
        _temperature: Option<f64>,
        _max_tokens: Option<u32>,
    ) -> Result<Value, NodeError> {
        Err(NodeError::Fatal("no AI client configured".into()))
    }
}
