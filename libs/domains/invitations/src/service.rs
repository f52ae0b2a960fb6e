use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{InvitationError, InvitationResult};
use crate::mailer::InvitationMailer;
use crate::models::{
    Audience, Chapter, Course, DispatchOutcome, DispatchSummary, Event, GroupKind, Meeting,
    Member, MemberQuery, NewCourseInvitation, NewEventInvitation, NewWorkshopInvitation,
    PromotionSummary, Role, Sponsor, WaitingListSlot, Workshop, WorkshopInvitation,
    WorkshopInvitationFilter,
};
use crate::repository::InvitationRepository;

const DEFAULT_CHANGE_OF_DETAILS_TITLE: &str = "Change of details";

/// Creates invitations and sends invitation, reminder and waiting-list emails.
pub struct InvitationDispatcher<R: InvitationRepository, M: InvitationMailer> {
    repository: Arc<R>,
    mailer: Arc<M>,
    rng: Arc<Mutex<StdRng>>,
}

impl<R: InvitationRepository, M: InvitationMailer> Clone for InvitationDispatcher<R, M> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            mailer: Arc::clone(&self.mailer),
            rng: Arc::clone(&self.rng),
        }
    }
}

impl<R: InvitationRepository, M: InvitationMailer> InvitationDispatcher<R, M> {
    pub fn new(repository: R, mailer: M) -> Self {
        Self::with_arcs(Arc::new(repository), Arc::new(mailer))
    }

    pub fn with_arcs(repository: Arc<R>, mailer: Arc<M>) -> Self {
        Self {
            repository,
            mailer,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Seed the generator used to shuffle workshop audiences.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Invite the selected audience of the workshop's chapter.
    ///
    /// `audience` is matched exactly against `"students"` and `"coaches"`;
    /// anything else invites students and then coaches.
    pub async fn send_workshop_emails(
        &self,
        workshop: &Workshop,
        audience: Option<&str>,
    ) -> InvitationResult<DispatchOutcome> {
        if !workshop.is_invitable() {
            return Ok(DispatchOutcome::NotInvitable {
                message: "The workshop is not invitable".to_string(),
            });
        }

        let summary = match Audience::from_workshop_selector(audience) {
            Audience::Students => self.invite_students(workshop).await?,
            Audience::Coaches => self.invite_coaches(workshop).await?,
            Audience::Everyone => {
                let students = self.invite_students(workshop).await?;
                students.merge(self.invite_coaches(workshop).await?)
            }
        };

        info!(
            workshop_id = %workshop.id,
            invited = summary.invited,
            skipped = summary.skipped,
            "Workshop invitations dispatched"
        );

        Ok(DispatchOutcome::Dispatched(summary))
    }

    /// Invite the event's audience from the given chapter.
    pub async fn send_event_emails(
        &self,
        event: &Event,
        chapter: &Chapter,
    ) -> InvitationResult<DispatchOutcome> {
        if !event.is_invitable() {
            return Ok(DispatchOutcome::NotInvitable {
                message: "The event is not invitable".to_string(),
            });
        }

        let students = self
            .repository
            .list_group_members(MemberQuery::invitable(chapter.id, GroupKind::Students))
            .await?;
        let coaches = self
            .repository
            .list_group_members(MemberQuery::invitable(chapter.id, GroupKind::Coaches))
            .await?;

        let audience = Audience::from_event_field(event.audience.as_deref());
        let mut summary = DispatchSummary::default();

        if audience.includes(Role::Student) {
            summary = summary.merge(self.invite_to_event(event, &students, Role::Student).await?);
        }
        if audience.includes(Role::Coach) {
            summary = summary.merge(self.invite_to_event(event, &coaches, Role::Coach).await?);
        }

        info!(
            event_id = %event.id,
            chapter_id = %chapter.id,
            invited = summary.invited,
            skipped = summary.skipped,
            "Event invitations dispatched"
        );

        Ok(DispatchOutcome::Dispatched(summary))
    }

    /// Remind everyone attending a monthly meeting. Returns the number of reminders.
    pub async fn send_monthly_attendance_reminder_emails(
        &self,
        meeting: &Meeting,
    ) -> InvitationResult<usize> {
        let members = self.repository.list_meeting_attendees(meeting.id).await?;

        for member in &members {
            self.mailer.meeting_attendance_reminder(meeting, member).await?;
        }

        debug!(meeting_id = %meeting.id, count = members.len(), "Sent meeting reminders");
        Ok(members.len())
    }

    /// Invite every student of the course's chapter, banned members included.
    pub async fn send_course_emails(&self, course: &Course) -> InvitationResult<DispatchSummary> {
        let students = self
            .repository
            .list_group_members(MemberQuery::all(course.chapter_id, GroupKind::Students))
            .await?;

        let mut summary = DispatchSummary::default();
        for student in &students {
            let created = self
                .repository
                .create_course_invitation(NewCourseInvitation::new(course.id, student.id))
                .await;

            match created {
                Ok(invitation) => {
                    self.mailer.course_invite(course, student, &invitation).await?;
                    summary.invited += 1;
                }
                Err(_) => summary.skipped += 1,
            }
        }

        Ok(summary)
    }

    /// Remind attendees who have not been reminded yet and stamp `reminded_at`.
    pub async fn send_workshop_attendance_reminders(
        &self,
        workshop: &Workshop,
    ) -> InvitationResult<usize> {
        let invitations = self
            .repository
            .list_workshop_invitations(WorkshopInvitationFilter::attendances(workshop.id).unreminded())
            .await?;

        let now = Utc::now();
        for invitation in &invitations {
            let member = self.invitation_member(invitation).await?;
            self.mailer
                .workshop_attending_reminder(workshop, &member, invitation)
                .await?;
            self.repository.mark_reminded(invitation.id, now).await?;
        }

        debug!(workshop_id = %workshop.id, count = invitations.len(), "Sent attendance reminders");
        Ok(invitations.len())
    }

    /// Remind waiting-list members who have not been reminded yet.
    pub async fn send_workshop_waiting_list_reminders(
        &self,
        workshop: &Workshop,
    ) -> InvitationResult<usize> {
        let pending: Vec<WorkshopInvitation> = self
            .repository
            .list_waiting_list(workshop.id, None)
            .await?
            .into_iter()
            .map(|slot| slot.invitation)
            .filter(|invitation| invitation.reminded_at.is_none())
            .collect();

        let now = Utc::now();
        for invitation in &pending {
            let member = self.invitation_member(invitation).await?;
            self.mailer
                .workshop_waiting_list_reminder(workshop, &member, invitation)
                .await?;
            self.repository.mark_reminded(invitation.id, now).await?;
        }

        debug!(workshop_id = %workshop.id, count = pending.len(), "Sent waiting list reminders");
        Ok(pending.len())
    }

    /// Tell everyone attending that the workshop details changed.
    pub async fn send_change_of_details(
        &self,
        workshop: &Workshop,
        title: Option<&str>,
        sponsor: &Sponsor,
    ) -> InvitationResult<usize> {
        let title = title.unwrap_or(DEFAULT_CHANGE_OF_DETAILS_TITLE);
        let accepted = self
            .repository
            .list_workshop_invitations(WorkshopInvitationFilter::attendances(workshop.id))
            .await?;

        for invitation in &accepted {
            let member = self.invitation_member(invitation).await?;
            self.mailer
                .workshop_change_of_details(workshop, sponsor, &member, invitation, title)
                .await?;
        }

        Ok(accepted.len())
    }

    /// Promote waiting-list entries while the host has room.
    ///
    /// Students are only considered when there is coach capacity as well.
    pub async fn send_waiting_list_emails(
        &self,
        workshop: &Workshop,
    ) -> InvitationResult<PromotionSummary> {
        let host_id = workshop
            .host_id
            .ok_or(InvitationError::MissingHost(workshop.id))?;
        let host = self
            .repository
            .get_sponsor(host_id)
            .await?
            .ok_or(InvitationError::SponsorNotFound(host_id))?;

        let mut summary = PromotionSummary::default();

        let attending_coaches = self.attending_count(workshop, Role::Coach).await?;
        if host.coach_spots as usize > attending_coaches {
            let coaches = self.repository.list_waiting_list(workshop.id, Some(Role::Coach)).await?;
            summary.coaches = self.promote(workshop, coaches).await?;

            let attending_students = self.attending_count(workshop, Role::Student).await?;
            if host.seats as usize > attending_students {
                let students = self
                    .repository
                    .list_waiting_list(workshop.id, Some(Role::Student))
                    .await?;
                summary.students = self.promote(workshop, students).await?;
            }
        }

        info!(
            workshop_id = %workshop.id,
            coaches = summary.coaches,
            students = summary.students,
            "Waiting list promoted"
        );

        Ok(summary)
    }

    async fn invite_students(&self, workshop: &Workshop) -> InvitationResult<DispatchSummary> {
        let students = self.shuffled_members(workshop, GroupKind::Students).await?;

        let mut summary = DispatchSummary::default();
        for student in &students {
            let created = self
                .repository
                .create_workshop_invitation(NewWorkshopInvitation::new(
                    workshop.id,
                    student.id,
                    Role::Student,
                ))
                .await;

            match created {
                Ok(invitation) => {
                    self.mailer
                        .workshop_invite_student(workshop, student, &invitation)
                        .await?;
                    summary.invited += 1;
                }
                Err(_) => summary.skipped += 1,
            }
        }

        Ok(summary)
    }

    async fn invite_coaches(&self, workshop: &Workshop) -> InvitationResult<DispatchSummary> {
        let coaches = self.shuffled_members(workshop, GroupKind::Coaches).await?;

        let mut summary = DispatchSummary::default();
        for coach in &coaches {
            let created = self
                .repository
                .create_workshop_invitation(NewWorkshopInvitation::new(
                    workshop.id,
                    coach.id,
                    Role::Coach,
                ))
                .await;

            match created {
                Ok(invitation) => {
                    self.mailer
                        .workshop_invite_coach(workshop, coach, &invitation)
                        .await?;
                    debug!("Invitation to {} sent", coach.email);
                    summary.invited += 1;
                }
                Err(e) => {
                    debug!(
                        error = %e,
                        "Invitation to {} not sent as invitation could not be saved",
                        coach.email
                    );
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn invite_to_event(
        &self,
        event: &Event,
        members: &[Member],
        role: Role,
    ) -> InvitationResult<DispatchSummary> {
        let mut summary = DispatchSummary::default();

        for member in members {
            let created = self
                .repository
                .create_event_invitation(NewEventInvitation::new(event.id, member.id, role))
                .await;

            let Ok(invitation) = created else {
                summary.skipped += 1;
                continue;
            };

            match role {
                Role::Student => self.mailer.event_invite_student(event, member, &invitation).await?,
                Role::Coach => self.mailer.event_invite_coach(event, member, &invitation).await?,
            }
            summary.invited += 1;
        }

        Ok(summary)
    }

    async fn shuffled_members(
        &self,
        workshop: &Workshop,
        kind: GroupKind,
    ) -> InvitationResult<Vec<Member>> {
        let mut members = self
            .repository
            .list_group_members(MemberQuery::invitable(workshop.chapter_id, kind))
            .await?;

        let mut rng = self.rng.lock().await;
        members.shuffle(&mut *rng);

        Ok(members)
    }

    async fn attending_count(&self, workshop: &Workshop, role: Role) -> InvitationResult<usize> {
        let attending = self
            .repository
            .list_workshop_invitations(WorkshopInvitationFilter::attendances(workshop.id).with_role(role))
            .await?;
        Ok(attending.len())
    }

    async fn promote(
        &self,
        workshop: &Workshop,
        slots: Vec<WaitingListSlot>,
    ) -> InvitationResult<usize> {
        let mut promoted = 0;

        for slot in slots {
            let member = self.invitation_member(&slot.invitation).await?;
            self.mailer
                .workshop_notify_waiting_list(workshop, &member, &slot.invitation)
                .await?;
            self.repository.delete_waiting_list_entry(slot.entry.id).await?;
            promoted += 1;
        }

        Ok(promoted)
    }

    async fn invitation_member(&self, invitation: &WorkshopInvitation) -> InvitationResult<Member> {
        self.repository
            .get_member(invitation.member_id)
            .await?
            .ok_or(InvitationError::MemberNotFound(invitation.member_id))
    }
}
