//! Invitations Domain
//!
//! Invitation and reminder emails for workshops, events, courses and
//! monthly meetings.
//!
//! # Features
//!
//! - Workshop invitations for students and/or coaches of a chapter
//! - Event invitations by the event's audience
//! - Course invitations
//! - Attendance and waiting-list reminders
//! - Change-of-details notices
//! - Waiting-list promotion within the host's capacity
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Request / cron │  ← Enqueues workshop & event dispatches
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │    JobQueue     │  ← Redis stream (invitations:jobs) or local task
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  JobProcessor   │  ← Resolves ids, runs each job id once
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Dispatcher    │  ← Audience, invitation records, reminders
//! └───┬─────────┬───┘
//!     │         │
//! ┌───▼────┐ ┌──▼──────────┐
//! │  Repo  │ │   Mailer    │  ← Handlebars templates → SMTP
//! └────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_invitations::{
//!     InvitationDispatcher, JobQueue, MailerConfig, PgInvitationRepository,
//!     RedisJobQueue, SmtpConfig, SmtpProvider, TemplateEngine, TemplateMailer,
//! };
//!
//! let mailer = TemplateMailer::new(
//!     SmtpProvider::new(SmtpConfig::from_env())?,
//!     TemplateEngine::new()?,
//!     MailerConfig::from_env(),
//! );
//! let dispatcher = InvitationDispatcher::new(PgInvitationRepository::new(db), mailer);
//!
//! // Synchronous operations run in the caller
//! dispatcher.send_workshop_attendance_reminders(&workshop).await?;
//!
//! // Workshop and event dispatches go through the queue
//! let queue = RedisJobQueue::new(redis);
//! queue.enqueue_workshop_emails(workshop.id, Some("coaches")).await?;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod models;
pub mod postgres;
pub mod processor;
pub mod providers;
pub mod queue;
pub mod repository;
pub mod service;
pub mod streams;
pub mod templates;

// Re-export commonly used types
pub use config::MailerConfig;
pub use error::{InvitationError, InvitationResult};
pub use jobs::{InvitationJob, InvitationJobKind};
pub use mailer::{InvitationMailer, TemplateMailer};
pub use models::{
    Audience, Chapter, Course, CourseInvitation, DispatchOutcome, DispatchSummary, Event,
    EventInvitation, Group, GroupKind, Meeting, MeetingAttendance, Member, PromotionSummary,
    Role, Sponsor, WaitingListEntry, Workshop, WorkshopInvitation,
};
pub use postgres::PgInvitationRepository;
pub use processor::InvitationJobProcessor;
pub use providers::{EmailContent, EmailProvider, RecordingProvider, SmtpConfig, SmtpProvider};
pub use queue::{JobQueue, LocalJobQueue, RedisJobQueue};
pub use repository::{InMemoryInvitationRepository, InvitationRepository};
pub use service::InvitationDispatcher;
pub use streams::InvitationJobStream;
pub use templates::TemplateEngine;
