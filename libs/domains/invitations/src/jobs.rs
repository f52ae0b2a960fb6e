//! Deferred invitation work.
//!
//! Workshop and event dispatches run in the background: callers enqueue an
//! [`InvitationJob`] naming the operation and its arguments, and a worker
//! runs it later through the
//! [`InvitationJobProcessor`](crate::processor::InvitationJobProcessor).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The operation a job runs, with its serialized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum InvitationJobKind {
    #[serde(rename = "send_workshop_emails")]
    WorkshopEmails {
        workshop_id: Uuid,
        audience: Option<String>,
    },
    #[serde(rename = "send_event_emails")]
    EventEmails { event_id: Uuid, chapter_id: Uuid },
}

impl InvitationJobKind {
    pub fn method(&self) -> &'static str {
        match self {
            InvitationJobKind::WorkshopEmails { .. } => "send_workshop_emails",
            InvitationJobKind::EventEmails { .. } => "send_event_emails",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationJob {
    /// Identifies one enqueue; a job id is processed at most once.
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: InvitationJobKind,
    pub enqueued_at: DateTime<Utc>,
}

impl InvitationJob {
    pub fn new(kind: InvitationJobKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            enqueued_at: Utc::now(),
        }
    }

    pub fn workshop_emails(workshop_id: Uuid, audience: Option<&str>) -> Self {
        Self::new(InvitationJobKind::WorkshopEmails {
            workshop_id,
            audience: audience.map(str::to_string),
        })
    }

    pub fn event_emails(event_id: Uuid, chapter_id: Uuid) -> Self {
        Self::new(InvitationJobKind::EventEmails {
            event_id,
            chapter_id,
        })
    }
}
