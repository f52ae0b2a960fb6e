//! Provider that records emails instead of delivering them.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{InvitationError, InvitationResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Captures every email handed to it. Used in tests and local runs.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    sent: Arc<Mutex<Vec<EmailContent>>>,
    failure: Option<String>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every send fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failure: Some(message.into()),
        }
    }

    pub async fn sent(&self) -> Vec<EmailContent> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn was_sent_to(&self, email: &str) -> bool {
        self.sent.lock().await.iter().any(|e| e.to_email == email)
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl EmailProvider for RecordingProvider {
    async fn send(&self, email: &EmailContent) -> InvitationResult<SentEmail> {
        if let Some(message) = &self.failure {
            return Err(InvitationError::Mailer(message.clone()));
        }

        let mut sent = self.sent.lock().await;
        sent.push(email.clone());

        Ok(SentEmail {
            message_id: Some(format!("recorded-{}", sent.len())),
            accepted: true,
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }

    async fn health_check(&self) -> InvitationResult<bool> {
        Ok(self.failure.is_none())
    }
}
