//! Invitation mailer.
//!
//! [`InvitationMailer`] has one method per activity, role and purpose. The
//! dispatcher only talks to this trait; [`TemplateMailer`] is the
//! implementation that renders templates and hands them to an
//! [`EmailProvider`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::MailerConfig;
use crate::error::InvitationResult;
use crate::models::{
    Course, CourseInvitation, Event, EventInvitation, Meeting, Member, Sponsor, Workshop,
    WorkshopInvitation,
};
use crate::providers::{EmailContent, EmailProvider};
use crate::templates::{InvitationEmail, TemplateEngine};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationMailer: Send + Sync {
    async fn workshop_invite_student(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()>;

    async fn workshop_invite_coach(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()>;

    async fn workshop_attending_reminder(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()>;

    async fn workshop_waiting_list_reminder(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()>;

    async fn workshop_change_of_details(
        &self,
        workshop: &Workshop,
        sponsor: &Sponsor,
        member: &Member,
        invitation: &WorkshopInvitation,
        title: &str,
    ) -> InvitationResult<()>;

    /// Tell a waiting-list member that a spot is available.
    async fn workshop_notify_waiting_list(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()>;

    async fn event_invite_student(
        &self,
        event: &Event,
        member: &Member,
        invitation: &EventInvitation,
    ) -> InvitationResult<()>;

    async fn event_invite_coach(
        &self,
        event: &Event,
        member: &Member,
        invitation: &EventInvitation,
    ) -> InvitationResult<()>;

    async fn meeting_attendance_reminder(
        &self,
        meeting: &Meeting,
        member: &Member,
    ) -> InvitationResult<()>;

    async fn course_invite(
        &self,
        course: &Course,
        member: &Member,
        invitation: &CourseInvitation,
    ) -> InvitationResult<()>;
}

fn humanize_date(date: &DateTime<Utc>) -> String {
    date.format("%A %-d %B %Y, %H:%M").to_string()
}

/// Mailer that renders handlebars templates and sends through a provider.
pub struct TemplateMailer<P: EmailProvider> {
    provider: Arc<P>,
    templates: Arc<TemplateEngine>,
    config: MailerConfig,
}

impl<P: EmailProvider> TemplateMailer<P> {
    pub fn new(provider: P, templates: TemplateEngine, config: MailerConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            templates: Arc::new(templates),
            config,
        }
    }

    pub fn with_arcs(provider: Arc<P>, templates: Arc<TemplateEngine>, config: MailerConfig) -> Self {
        Self {
            provider,
            templates,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn deliver(
        &self,
        email: InvitationEmail,
        member: &Member,
        subject: String,
        data: serde_json::Value,
    ) -> InvitationResult<()> {
        let rendered = self.templates.render(email, &data)?;

        let content = EmailContent {
            to_email: member.email.clone(),
            to_name: member.full_name(),
            subject,
            html_body: rendered.html,
            text_body: rendered.text,
            reply_to: self.config.reply_to.clone(),
        };

        let sent = self.provider.send(&content).await?;

        info!(
            email = %email,
            member_id = %member.id,
            to = %member.email,
            provider = self.provider.name(),
            message_id = ?sent.message_id,
            "Sent invitation email"
        );

        Ok(())
    }

    fn workshop_data(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> serde_json::Value {
        json!({
            "member_name": member.name,
            "workshop_title": workshop.title,
            "workshop_date": humanize_date(&workshop.date_and_time),
            "role": invitation.role.to_string(),
            "rsvp_url": self.config.workshop_invitation_url(&invitation.token),
        })
    }

    fn event_data(
        &self,
        event: &Event,
        member: &Member,
        invitation: &EventInvitation,
    ) -> serde_json::Value {
        json!({
            "member_name": member.name,
            "event_name": event.name,
            "event_date": humanize_date(&event.date_and_time),
            "role": invitation.role.to_string(),
            "rsvp_url": self.config.event_invitation_url(&invitation.token),
        })
    }
}

#[async_trait]
impl<P: EmailProvider + 'static> InvitationMailer for TemplateMailer<P> {
    async fn workshop_invite_student(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()> {
        let subject = format!("Workshop Invitation {}", humanize_date(&workshop.date_and_time));
        let data = self.workshop_data(workshop, member, invitation);
        self.deliver(InvitationEmail::WorkshopInviteStudent, member, subject, data)
            .await
    }

    async fn workshop_invite_coach(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()> {
        let subject = format!(
            "Workshop Coach Invitation {}",
            humanize_date(&workshop.date_and_time)
        );
        let data = self.workshop_data(workshop, member, invitation);
        self.deliver(InvitationEmail::WorkshopInviteCoach, member, subject, data)
            .await
    }

    async fn workshop_attending_reminder(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()> {
        let subject = format!("Workshop Reminder {}", humanize_date(&workshop.date_and_time));
        let data = self.workshop_data(workshop, member, invitation);
        self.deliver(InvitationEmail::WorkshopAttendingReminder, member, subject, data)
            .await
    }

    async fn workshop_waiting_list_reminder(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()> {
        let subject = format!(
            "Waiting List Reminder {}",
            humanize_date(&workshop.date_and_time)
        );
        let data = self.workshop_data(workshop, member, invitation);
        self.deliver(InvitationEmail::WorkshopWaitingListReminder, member, subject, data)
            .await
    }

    async fn workshop_change_of_details(
        &self,
        workshop: &Workshop,
        sponsor: &Sponsor,
        member: &Member,
        invitation: &WorkshopInvitation,
        title: &str,
    ) -> InvitationResult<()> {
        let subject = format!("{}: {}", title, workshop.title);
        let mut data = self.workshop_data(workshop, member, invitation);
        data["title"] = json!(title);
        data["sponsor_name"] = json!(sponsor.name);
        data["sponsor_address"] = json!(sponsor.address);
        self.deliver(InvitationEmail::WorkshopChangeOfDetails, member, subject, data)
            .await
    }

    async fn workshop_notify_waiting_list(
        &self,
        workshop: &Workshop,
        member: &Member,
        invitation: &WorkshopInvitation,
    ) -> InvitationResult<()> {
        let subject = format!(
            "A spot opened up for the workshop on {}",
            humanize_date(&workshop.date_and_time)
        );
        let data = self.workshop_data(workshop, member, invitation);
        self.deliver(InvitationEmail::WorkshopSpotAvailable, member, subject, data)
            .await
    }

    async fn event_invite_student(
        &self,
        event: &Event,
        member: &Member,
        invitation: &EventInvitation,
    ) -> InvitationResult<()> {
        let subject = format!("Invitation: {}", event.name);
        let data = self.event_data(event, member, invitation);
        self.deliver(InvitationEmail::EventInviteStudent, member, subject, data)
            .await
    }

    async fn event_invite_coach(
        &self,
        event: &Event,
        member: &Member,
        invitation: &EventInvitation,
    ) -> InvitationResult<()> {
        let subject = format!("Coach Invitation: {}", event.name);
        let data = self.event_data(event, member, invitation);
        self.deliver(InvitationEmail::EventInviteCoach, member, subject, data)
            .await
    }

    async fn meeting_attendance_reminder(
        &self,
        meeting: &Meeting,
        member: &Member,
    ) -> InvitationResult<()> {
        let subject = format!("Reminder: {}", meeting.name);
        let data = json!({
            "member_name": member.name,
            "meeting_name": meeting.name,
            "meeting_date": humanize_date(&meeting.date_and_time),
        });
        self.deliver(InvitationEmail::MeetingAttendanceReminder, member, subject, data)
            .await
    }

    async fn course_invite(
        &self,
        course: &Course,
        member: &Member,
        invitation: &CourseInvitation,
    ) -> InvitationResult<()> {
        let subject = format!("Course Invitation: {}", course.title);
        let data = json!({
            "member_name": member.name,
            "course_title": course.title,
            "course_date": humanize_date(&course.date_and_time),
            "rsvp_url": self.config.course_invitation_url(&invitation.token),
        });
        self.deliver(InvitationEmail::CourseInvite, member, subject, data)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCourseInvitation, NewWorkshopInvitation, Role};
    use crate::providers::RecordingProvider;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn mailer(provider: RecordingProvider) -> TemplateMailer<RecordingProvider> {
        TemplateMailer::new(
            provider,
            TemplateEngine::new().unwrap(),
            MailerConfig::new("https://example.com").with_reply_to("london@example.com"),
        )
    }

    fn member() -> Member {
        Member {
            id: Uuid::now_v7(),
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            banned: false,
        }
    }

    fn workshop() -> Workshop {
        Workshop {
            id: Uuid::now_v7(),
            chapter_id: Uuid::now_v7(),
            host_id: None,
            title: "Intro to Rust".to_string(),
            date_and_time: Utc.with_ymd_and_hms(2026, 3, 3, 18, 30, 0).unwrap(),
            invitable: true,
        }
    }

    #[test]
    fn test_humanize_date() {
        let date = Utc.with_ymd_and_hms(2026, 3, 3, 18, 30, 0).unwrap();
        assert_eq!(humanize_date(&date), "Tuesday 3 March 2026, 18:30");
    }

    #[tokio::test]
    async fn test_workshop_coach_invite_email() {
        let provider = RecordingProvider::new();
        let mailer = mailer(provider.clone());
        let member = member();
        let workshop = workshop();
        let invitation =
            NewWorkshopInvitation::new(workshop.id, member.id, Role::Coach).into_invitation();

        mailer
            .workshop_invite_coach(&workshop, &member, &invitation)
            .await
            .unwrap();

        let sent = provider.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "ada@example.com");
        assert_eq!(sent[0].to_name, "Ada Lovelace");
        assert_eq!(sent[0].subject, "Workshop Coach Invitation Tuesday 3 March 2026, 18:30");
        assert_eq!(sent[0].reply_to.as_deref(), Some("london@example.com"));
        assert!(sent[0]
            .text_body
            .contains(&format!("https://example.com/invitation/{}", invitation.token)));
    }

    #[tokio::test]
    async fn test_change_of_details_uses_title_and_sponsor() {
        let provider = RecordingProvider::new();
        let mailer = mailer(provider.clone());
        let member = member();
        let workshop = workshop();
        let invitation =
            NewWorkshopInvitation::new(workshop.id, member.id, Role::Student).into_invitation();
        let sponsor = Sponsor {
            id: Uuid::now_v7(),
            name: "Acme".to_string(),
            address: "1 Main Street".to_string(),
            seats: 20,
            coach_spots: 10,
        };

        mailer
            .workshop_change_of_details(&workshop, &sponsor, &member, &invitation, "New venue")
            .await
            .unwrap();

        let sent = provider.sent().await;
        assert_eq!(sent[0].subject, "New venue: Intro to Rust");
        assert!(sent[0].text_body.contains("hosted by Acme, 1 Main Street"));
    }

    #[tokio::test]
    async fn test_course_invite_links_course_token() {
        let provider = RecordingProvider::new();
        let mailer = mailer(provider.clone());
        let member = member();
        let course = Course {
            id: Uuid::now_v7(),
            chapter_id: Uuid::now_v7(),
            title: "Python Basics".to_string(),
            date_and_time: Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
        };
        let invitation = NewCourseInvitation::new(course.id, member.id).into_invitation();

        mailer.course_invite(&course, &member, &invitation).await.unwrap();

        let sent = provider.sent().await;
        assert_eq!(sent[0].subject, "Course Invitation: Python Basics");
        assert!(sent[0]
            .text_body
            .contains(&format!("/course/invitation/{}", invitation.token)));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let mailer = mailer(RecordingProvider::failing("connection refused"));
        let meeting = Meeting {
            id: Uuid::now_v7(),
            name: "Monthly".to_string(),
            date_and_time: Utc::now(),
        };

        let result = mailer.meeting_attendance_reminder(&meeting, &member()).await;
        assert!(result.is_err());
    }
}
