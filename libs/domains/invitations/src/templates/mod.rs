//! Email template rendering engine.
//!
//! Handlebars templates for every invitation email, one HTML and one plain
//! text body per [`InvitationEmail`].

use crate::error::{InvitationError, InvitationResult};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::debug;

/// Every email the invitation mailer can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvitationEmail {
    WorkshopInviteStudent,
    WorkshopInviteCoach,
    WorkshopAttendingReminder,
    WorkshopWaitingListReminder,
    WorkshopChangeOfDetails,
    WorkshopSpotAvailable,
    EventInviteStudent,
    EventInviteCoach,
    MeetingAttendanceReminder,
    CourseInvite,
}

impl InvitationEmail {
    fn sources(&self) -> (&'static str, &'static str) {
        match self {
            InvitationEmail::WorkshopInviteStudent => {
                (WORKSHOP_INVITE_STUDENT_HTML, WORKSHOP_INVITE_STUDENT_TEXT)
            }
            InvitationEmail::WorkshopInviteCoach => {
                (WORKSHOP_INVITE_COACH_HTML, WORKSHOP_INVITE_COACH_TEXT)
            }
            InvitationEmail::WorkshopAttendingReminder => {
                (WORKSHOP_ATTENDING_REMINDER_HTML, WORKSHOP_ATTENDING_REMINDER_TEXT)
            }
            InvitationEmail::WorkshopWaitingListReminder => {
                (WORKSHOP_WAITING_LIST_REMINDER_HTML, WORKSHOP_WAITING_LIST_REMINDER_TEXT)
            }
            InvitationEmail::WorkshopChangeOfDetails => {
                (WORKSHOP_CHANGE_OF_DETAILS_HTML, WORKSHOP_CHANGE_OF_DETAILS_TEXT)
            }
            InvitationEmail::WorkshopSpotAvailable => {
                (WORKSHOP_SPOT_AVAILABLE_HTML, WORKSHOP_SPOT_AVAILABLE_TEXT)
            }
            InvitationEmail::EventInviteStudent => (EVENT_INVITE_HTML, EVENT_INVITE_STUDENT_TEXT),
            InvitationEmail::EventInviteCoach => (EVENT_INVITE_HTML, EVENT_INVITE_COACH_TEXT),
            InvitationEmail::MeetingAttendanceReminder => {
                (MEETING_ATTENDANCE_REMINDER_HTML, MEETING_ATTENDANCE_REMINDER_TEXT)
            }
            InvitationEmail::CourseInvite => (COURSE_INVITE_HTML, COURSE_INVITE_TEXT),
        }
    }

    fn html_name(&self) -> String {
        format!("{}_html", self)
    }

    fn text_name(&self) -> String {
        format!("{}_text", self)
    }
}

/// Rendered email bodies.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Template engine for rendering invitation emails.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> InvitationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        for email in InvitationEmail::iter() {
            let (html, text) = email.sources();
            handlebars
                .register_template_string(&email.html_name(), html)
                .map_err(|e| {
                    InvitationError::Template(format!("Failed to register {}: {}", email.html_name(), e))
                })?;
            handlebars
                .register_template_string(&email.text_name(), text)
                .map_err(|e| {
                    InvitationError::Template(format!("Failed to register {}: {}", email.text_name(), e))
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Render both bodies of `email` with `data`.
    pub fn render<T: Serialize>(
        &self,
        email: InvitationEmail,
        data: &T,
    ) -> InvitationResult<RenderedEmail> {
        debug!(email = %email, "Rendering invitation email");

        let html = self.handlebars.render(&email.html_name(), data)?;
        let text = self.handlebars.render(&email.text_name(), data)?;

        Ok(RenderedEmail { html, text })
    }
}

// ============================================================================
// Templates
// ============================================================================

const WORKSHOP_INVITE_STUDENT_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>You are invited to <strong>{{workshop_title}}</strong> on {{workshop_date}}.</p>
<p>Seats are limited and given out on a first come, first served basis.</p>
<p><a href="{{rsvp_url}}">RSVP to the workshop</a></p>"#;

const WORKSHOP_INVITE_STUDENT_TEXT: &str = r#"Hi {{member_name}},

You are invited to {{workshop_title}} on {{workshop_date}}.
Seats are limited and given out on a first come, first served basis.

RSVP: {{rsvp_url}}"#;

const WORKSHOP_INVITE_COACH_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>We are looking for coaches for <strong>{{workshop_title}}</strong> on {{workshop_date}}.</p>
<p><a href="{{rsvp_url}}">Let us know if you can coach</a></p>"#;

const WORKSHOP_INVITE_COACH_TEXT: &str = r#"Hi {{member_name}},

We are looking for coaches for {{workshop_title}} on {{workshop_date}}.

Let us know if you can coach: {{rsvp_url}}"#;

const WORKSHOP_ATTENDING_REMINDER_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>This is a reminder that you are attending <strong>{{workshop_title}}</strong> on {{workshop_date}}.</p>
<p>If you can no longer make it, please <a href="{{rsvp_url}}">free up your spot</a> for someone on the waiting list.</p>"#;

const WORKSHOP_ATTENDING_REMINDER_TEXT: &str = r#"Hi {{member_name}},

This is a reminder that you are attending {{workshop_title}} on {{workshop_date}}.
If you can no longer make it, please free up your spot: {{rsvp_url}}"#;

const WORKSHOP_WAITING_LIST_REMINDER_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>You are still on the waiting list for <strong>{{workshop_title}}</strong> on {{workshop_date}}.</p>
<p>We will email you if a spot opens up. <a href="{{rsvp_url}}">Manage your invitation</a></p>"#;

const WORKSHOP_WAITING_LIST_REMINDER_TEXT: &str = r#"Hi {{member_name}},

You are still on the waiting list for {{workshop_title}} on {{workshop_date}}.
We will email you if a spot opens up.

Manage your invitation: {{rsvp_url}}"#;

const WORKSHOP_CHANGE_OF_DETAILS_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p><strong>{{title}}</strong>: the details of {{workshop_title}} on {{workshop_date}} have changed.</p>
<p>The workshop is now hosted by {{sponsor_name}}, {{sponsor_address}}.</p>
<p><a href="{{rsvp_url}}">View your invitation</a></p>"#;

const WORKSHOP_CHANGE_OF_DETAILS_TEXT: &str = r#"Hi {{member_name}},

{{title}}: the details of {{workshop_title}} on {{workshop_date}} have changed.
The workshop is now hosted by {{sponsor_name}}, {{sponsor_address}}.

View your invitation: {{rsvp_url}}"#;

const WORKSHOP_SPOT_AVAILABLE_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>A spot opened up for <strong>{{workshop_title}}</strong> on {{workshop_date}}.</p>
<p><a href="{{rsvp_url}}">Confirm your spot</a></p>"#;

const WORKSHOP_SPOT_AVAILABLE_TEXT: &str = r#"Hi {{member_name}},

A spot opened up for {{workshop_title}} on {{workshop_date}}.

Confirm your spot: {{rsvp_url}}"#;

const EVENT_INVITE_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>You are invited to <strong>{{event_name}}</strong> on {{event_date}} as a {{role}}.</p>
<p><a href="{{rsvp_url}}">RSVP to the event</a></p>"#;

const EVENT_INVITE_STUDENT_TEXT: &str = r#"Hi {{member_name}},

You are invited to {{event_name}} on {{event_date}}.

RSVP: {{rsvp_url}}"#;

const EVENT_INVITE_COACH_TEXT: &str = r#"Hi {{member_name}},

We would love you to coach at {{event_name}} on {{event_date}}.

RSVP: {{rsvp_url}}"#;

const MEETING_ATTENDANCE_REMINDER_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>See you at <strong>{{meeting_name}}</strong> on {{meeting_date}}.</p>"#;

const MEETING_ATTENDANCE_REMINDER_TEXT: &str = r#"Hi {{member_name}},

See you at {{meeting_name}} on {{meeting_date}}."#;

const COURSE_INVITE_HTML: &str = r#"<p>Hi {{member_name}},</p>
<p>You are invited to the course <strong>{{course_title}}</strong> starting {{course_date}}.</p>
<p><a href="{{rsvp_url}}">Sign up for the course</a></p>"#;

const COURSE_INVITE_TEXT: &str = r#"Hi {{member_name}},

You are invited to the course {{course_title}} starting {{course_date}}.

Sign up: {{rsvp_url}}"#;
