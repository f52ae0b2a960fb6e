//! Error types for the invitations domain.

use thiserror::Error;
use uuid::Uuid;

/// Result type for invitation operations.
pub type InvitationResult<T> = Result<T, InvitationError>;

/// Errors that can occur while dispatching invitations.
///
/// A failed invitation save is not surfaced through this type by the
/// dispatcher: the member is skipped and the loop continues.
#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("Workshop not found: {0}")]
    WorkshopNotFound(Uuid),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Chapter not found: {0}")]
    ChapterNotFound(Uuid),

    #[error("Member not found: {0}")]
    MemberNotFound(Uuid),

    #[error("Sponsor not found: {0}")]
    SponsorNotFound(Uuid),

    /// The workshop has no host, so its capacity is unknown.
    #[error("Workshop {0} has no host")]
    MissingHost(Uuid),

    /// An invitation record failed validation and was not persisted.
    #[error("Invalid invitation: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Template rendering error: {0}")]
    Template(String),

    #[error("Mailer error: {0}")]
    Mailer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for InvitationError {
    fn from(err: sea_orm::DbErr) -> Self {
        InvitationError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for InvitationError {
    fn from(err: redis::RedisError) -> Self {
        InvitationError::Queue(err.to_string())
    }
}

impl From<handlebars::RenderError> for InvitationError {
    fn from(err: handlebars::RenderError) -> Self {
        InvitationError::Template(err.to_string())
    }
}

impl From<serde_json::Error> for InvitationError {
    fn from(err: serde_json::Error) -> Self {
        InvitationError::Internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = Uuid::nil();
        assert_eq!(
            InvitationError::MissingHost(id).to_string(),
            format!("Workshop {} has no host", id)
        );
        assert_eq!(
            InvitationError::Validation("member must exist".to_string()).to_string(),
            "Invalid invitation: member must exist"
        );
    }

    #[test]
    fn test_from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted: InvitationError = err.into();
        assert!(matches!(converted, InvitationError::Internal(_)));
    }
}
