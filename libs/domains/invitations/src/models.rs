//! Data models for the invitations domain.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

// ============================================================================
// Roles and audiences
// ============================================================================

/// Role a member is invited with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invitation_role")]
pub enum Role {
    #[sea_orm(string_value = "Student")]
    Student,
    #[sea_orm(string_value = "Coach")]
    Coach,
}

/// Kind of a chapter group. Each chapter has student and coach groups.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "group_kind")]
pub enum GroupKind {
    #[sea_orm(string_value = "Students")]
    Students,
    #[sea_orm(string_value = "Coaches")]
    Coaches,
}

impl GroupKind {
    /// Role given to members invited through this kind of group.
    pub fn role(&self) -> Role {
        match self {
            GroupKind::Students => Role::Student,
            GroupKind::Coaches => Role::Coach,
        }
    }
}

impl From<Role> for GroupKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => GroupKind::Students,
            Role::Coach => GroupKind::Coaches,
        }
    }
}

/// Which roles receive invitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Students,
    Coaches,
    Everyone,
}

impl Audience {
    /// Parse the audience selector passed alongside a workshop dispatch.
    ///
    /// Matching is exact: only `"students"` and `"coaches"` narrow the
    /// audience, every other value (including `None`, `""` and
    /// `"STUDENTS"`) invites both roles.
    pub fn from_workshop_selector(selector: Option<&str>) -> Self {
        match selector {
            Some("students") => Audience::Students,
            Some("coaches") => Audience::Coaches,
            _ => Audience::Everyone,
        }
    }

    /// Parse the `audience` column stored on an event (`"Students"`/`"Coaches"`).
    pub fn from_event_field(audience: Option<&str>) -> Self {
        match audience {
            Some("Students") => Audience::Students,
            Some("Coaches") => Audience::Coaches,
            _ => Audience::Everyone,
        }
    }

    pub fn includes(&self, role: Role) -> bool {
        match self {
            Audience::Students => role == Role::Student,
            Audience::Coaches => role == Role::Coach,
            Audience::Everyone => true,
        }
    }
}

// ============================================================================
// Members, chapters and groups
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    /// Banned members are never invited to workshops or events.
    pub banned: bool,
}

impl Member {
    pub fn full_name(&self) -> String {
        if self.surname.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.surname)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub kind: GroupKind,
}

/// Query for members of a chapter's groups of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberQuery {
    pub chapter_id: Uuid,
    pub kind: GroupKind,
    pub include_banned: bool,
}

impl MemberQuery {
    /// Non-banned members of the chapter's groups of `kind`.
    pub fn invitable(chapter_id: Uuid, kind: GroupKind) -> Self {
        Self {
            chapter_id,
            kind,
            include_banned: false,
        }
    }

    /// Every member of the chapter's groups of `kind`, banned or not.
    pub fn all(chapter_id: Uuid, kind: GroupKind) -> Self {
        Self {
            chapter_id,
            kind,
            include_banned: true,
        }
    }
}

// ============================================================================
// Activities
// ============================================================================

/// A sponsor hosting workshops; the host's limits cap attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub seats: u32,
    pub coach_spots: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workshop {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub host_id: Option<Uuid>,
    pub title: String,
    pub date_and_time: DateTime<Utc>,
    pub invitable: bool,
}

impl Workshop {
    pub fn is_invitable(&self) -> bool {
        self.invitable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub date_and_time: DateTime<Utc>,
    /// Free-form audience column; see [`Audience::from_event_field`].
    pub audience: Option<String>,
    pub invitable: bool,
}

impl Event {
    pub fn is_invitable(&self) -> bool {
        self.invitable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub title: String,
    pub date_and_time: DateTime<Utc>,
}

/// A monthly meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub name: String,
    pub date_and_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingAttendance {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub member_id: Uuid,
    pub attending: bool,
}

// ============================================================================
// Invitations
// ============================================================================

/// Generate a random RSVP token for an invitation link.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopInvitation {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub member_id: Uuid,
    pub role: Role,
    /// `None` until the member answers.
    pub attending: Option<bool>,
    pub token: String,
    /// Set once a reminder has gone out.
    pub reminded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WorkshopInvitation {
    pub fn is_attending(&self) -> bool {
        self.attending == Some(true)
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkshopInvitation {
    pub workshop_id: Uuid,
    pub member_id: Uuid,
    pub role: Role,
}

impl NewWorkshopInvitation {
    pub fn new(workshop_id: Uuid, member_id: Uuid, role: Role) -> Self {
        Self {
            workshop_id,
            member_id,
            role,
        }
    }

    pub fn into_invitation(self) -> WorkshopInvitation {
        WorkshopInvitation {
            id: Uuid::now_v7(),
            workshop_id: self.workshop_id,
            member_id: self.member_id,
            role: self.role,
            attending: None,
            token: generate_token(),
            reminded_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInvitation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub member_id: Uuid,
    pub role: Role,
    pub attending: Option<bool>,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEventInvitation {
    pub event_id: Uuid,
    pub member_id: Uuid,
    pub role: Role,
}

impl NewEventInvitation {
    pub fn new(event_id: Uuid, member_id: Uuid, role: Role) -> Self {
        Self {
            event_id,
            member_id,
            role,
        }
    }

    pub fn into_invitation(self) -> EventInvitation {
        EventInvitation {
            id: Uuid::now_v7(),
            event_id: self.event_id,
            member_id: self.member_id,
            role: self.role,
            attending: None,
            token: generate_token(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseInvitation {
    pub id: Uuid,
    pub course_id: Uuid,
    pub member_id: Uuid,
    pub attending: Option<bool>,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCourseInvitation {
    pub course_id: Uuid,
    pub member_id: Uuid,
}

impl NewCourseInvitation {
    pub fn new(course_id: Uuid, member_id: Uuid) -> Self {
        Self {
            course_id,
            member_id,
        }
    }

    pub fn into_invitation(self) -> CourseInvitation {
        CourseInvitation {
            id: Uuid::now_v7(),
            course_id: self.course_id,
            member_id: self.member_id,
            attending: None,
            token: generate_token(),
            created_at: Utc::now(),
        }
    }
}

/// Filter for workshop invitations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkshopInvitationFilter {
    pub workshop_id: Uuid,
    pub role: Option<Role>,
    /// `Some(true)` selects attendances.
    pub attending: Option<bool>,
    /// `Some(false)` selects invitations whose `reminded_at` is unset.
    pub reminded: Option<bool>,
}

impl WorkshopInvitationFilter {
    pub fn for_workshop(workshop_id: Uuid) -> Self {
        Self {
            workshop_id,
            ..Default::default()
        }
    }

    /// Invitations the member has accepted.
    pub fn attendances(workshop_id: Uuid) -> Self {
        Self {
            workshop_id,
            attending: Some(true),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn unreminded(mut self) -> Self {
        self.reminded = Some(false);
        self
    }

    pub fn matches(&self, invitation: &WorkshopInvitation) -> bool {
        if invitation.workshop_id != self.workshop_id {
            return false;
        }
        if let Some(role) = self.role {
            if invitation.role != role {
                return false;
            }
        }
        if let Some(attending) = self.attending {
            if invitation.is_attending() != attending {
                return false;
            }
        }
        if let Some(reminded) = self.reminded {
            if invitation.reminded_at.is_some() != reminded {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Waiting list
// ============================================================================

/// A workshop invitation parked on the waiting list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingListEntry {
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub auto_rsvp: bool,
    pub created_at: DateTime<Utc>,
}

/// A waiting-list entry joined with its invitation.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitingListSlot {
    pub entry: WaitingListEntry,
    pub invitation: WorkshopInvitation,
}

impl WaitingListSlot {
    pub fn role(&self) -> Role {
        self.invitation.role
    }
}

// ============================================================================
// Dispatch outcomes
// ============================================================================

/// Counts for one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Invitations persisted and emailed.
    pub invited: usize,
    /// Members skipped because their invitation could not be saved.
    pub skipped: usize,
}

impl DispatchSummary {
    pub fn merge(self, other: DispatchSummary) -> Self {
        Self {
            invited: self.invited + other.invited,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Outcome of an invitation dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Dispatched(DispatchSummary),
    /// The job carrying this dispatch already ran.
    AlreadyProcessed,
    NotInvitable { message: String },
}

impl DispatchOutcome {
    pub fn summary(&self) -> Option<DispatchSummary> {
        match self {
            DispatchOutcome::Dispatched(summary) => Some(*summary),
            _ => None,
        }
    }
}

/// Waiting-list entries promoted in one run, per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromotionSummary {
    pub coaches: usize,
    pub students: usize,
}
