//! Environment-driven configuration (spec §6), collected once at startup
//! and threaded through [`crate::AppState`].

/// Every environment variable the API/worker processes read, collected
/// into one struct the way `cli`'s `Serve`/`Worker` commands already read
/// `DATABASE_URL`.
#[derive(Clone)]
pub struct ApiConfig {
    pub api_base_url: String,
    pub inbound_email_domain: String,
    pub cors_origin: String,
    pub encryption_key: [u8; 32],
    pub resend_api_key: Option<String>,
    pub notification_from_email: Option<String>,
}

impl ApiConfig {
    /// Read every variable from the environment, falling back to
    /// development-friendly defaults where spec §6 doesn't mandate a
    /// hard failure.
    pub fn from_env() -> Self {
        let encryption_key_raw =
            std::env::var("ENCRYPTION_KEY").unwrap_or_else(|_| "dev-only-insecure-encryption-key".to_string());

        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            inbound_email_domain: std::env::var("INBOUND_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "inbound.example.com".to_string()),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            encryption_key: db::crypto::derive_key(&encryption_key_raw),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            notification_from_email: std::env::var("NOTIFICATION_FROM_EMAIL").ok(),
        }
    }
}
