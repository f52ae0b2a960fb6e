//! Email provider implementations.
//!
//! This module contains the `EmailProvider` trait and the transports the
//! invitation mailer can send through.

mod recording;
mod smtp;

pub use recording::RecordingProvider;
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::InvitationResult;
use async_trait::async_trait;

/// Represents a sent email with provider-specific message ID.
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Provider-specific message ID for tracking.
    pub message_id: Option<String>,
    /// Whether the email was accepted for delivery.
    pub accepted: bool,
}

/// Email content ready for sending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailContent {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    /// Reply-To address, taken from `MailerConfig::reply_to`.
    pub reply_to: Option<String>,
}

/// Trait for email sending providers.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &EmailContent) -> InvitationResult<SentEmail>;

    /// Get the provider name for logging.
    fn name(&self) -> &'static str;

    /// Check if the provider is healthy/configured.
    async fn health_check(&self) -> InvitationResult<bool>;
}
