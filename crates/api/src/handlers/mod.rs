pub mod email;
pub mod executions;
pub mod triggers;
pub mod webhooks;
pub mod workflows;
pub mod ws;
