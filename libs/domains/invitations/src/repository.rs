use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{InvitationError, InvitationResult};
use crate::models::{
    Chapter, CourseInvitation, Event, EventInvitation, Group, MeetingAttendance, Member,
    MemberQuery, NewCourseInvitation, NewEventInvitation, NewWorkshopInvitation, Role, Sponsor,
    WaitingListEntry, WaitingListSlot, Workshop, WorkshopInvitation, WorkshopInvitationFilter,
};

/// Repository trait for members, activities and invitation records.
///
/// The schema is owned elsewhere; the dispatcher only reads activities and
/// members, creates invitations, stamps reminders and removes promoted
/// waiting-list entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn get_workshop(&self, id: Uuid) -> InvitationResult<Option<Workshop>>;

    async fn get_event(&self, id: Uuid) -> InvitationResult<Option<Event>>;

    async fn get_chapter(&self, id: Uuid) -> InvitationResult<Option<Chapter>>;

    async fn get_sponsor(&self, id: Uuid) -> InvitationResult<Option<Sponsor>>;

    async fn get_member(&self, id: Uuid) -> InvitationResult<Option<Member>>;

    /// Distinct members of a chapter's groups of one kind.
    async fn list_group_members(&self, query: MemberQuery) -> InvitationResult<Vec<Member>>;

    /// Distinct members attending a monthly meeting.
    async fn list_meeting_attendees(&self, meeting_id: Uuid) -> InvitationResult<Vec<Member>>;

    /// Persist a workshop invitation. An `Err` means the record was not saved.
    async fn create_workshop_invitation(
        &self,
        input: NewWorkshopInvitation,
    ) -> InvitationResult<WorkshopInvitation>;

    async fn create_event_invitation(
        &self,
        input: NewEventInvitation,
    ) -> InvitationResult<EventInvitation>;

    async fn create_course_invitation(
        &self,
        input: NewCourseInvitation,
    ) -> InvitationResult<CourseInvitation>;

    async fn list_workshop_invitations(
        &self,
        filter: WorkshopInvitationFilter,
    ) -> InvitationResult<Vec<WorkshopInvitation>>;

    /// Waiting-list entries for a workshop, oldest first, optionally by role.
    async fn list_waiting_list(
        &self,
        workshop_id: Uuid,
        role: Option<Role>,
    ) -> InvitationResult<Vec<WaitingListSlot>>;

    async fn delete_waiting_list_entry(&self, id: Uuid) -> InvitationResult<bool>;

    /// Stamp `reminded_at` on a workshop invitation.
    async fn mark_reminded(
        &self,
        invitation_id: Uuid,
        at: DateTime<Utc>,
    ) -> InvitationResult<WorkshopInvitation>;
}

#[derive(Debug, Default)]
struct Store {
    members: Vec<Member>,
    chapters: HashMap<Uuid, Chapter>,
    groups: Vec<Group>,
    memberships: Vec<(Uuid, Uuid)>,
    sponsors: HashMap<Uuid, Sponsor>,
    workshops: HashMap<Uuid, Workshop>,
    events: HashMap<Uuid, Event>,
    meeting_attendances: Vec<MeetingAttendance>,
    workshop_invitations: Vec<WorkshopInvitation>,
    event_invitations: Vec<EventInvitation>,
    course_invitations: Vec<CourseInvitation>,
    waiting_list: Vec<WaitingListEntry>,
    rejected_members: HashSet<Uuid>,
}

impl Store {
    fn validate_member(&self, member_id: Uuid) -> InvitationResult<()> {
        if self.rejected_members.contains(&member_id) {
            return Err(InvitationError::Validation(format!(
                "invitation for member {} was rejected",
                member_id
            )));
        }
        if !self.members.iter().any(|m| m.id == member_id) {
            return Err(InvitationError::Validation(format!(
                "member {} must exist",
                member_id
            )));
        }
        Ok(())
    }
}

/// In-memory implementation of InvitationRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryInvitationRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryInvitationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_member(&self, member: Member) {
        self.store.write().await.members.push(member);
    }

    pub async fn insert_chapter(&self, chapter: Chapter) {
        self.store.write().await.chapters.insert(chapter.id, chapter);
    }

    pub async fn insert_group(&self, group: Group) {
        self.store.write().await.groups.push(group);
    }

    pub async fn add_to_group(&self, group_id: Uuid, member_id: Uuid) {
        self.store.write().await.memberships.push((group_id, member_id));
    }

    pub async fn insert_sponsor(&self, sponsor: Sponsor) {
        self.store.write().await.sponsors.insert(sponsor.id, sponsor);
    }

    pub async fn insert_workshop(&self, workshop: Workshop) {
        self.store.write().await.workshops.insert(workshop.id, workshop);
    }

    pub async fn insert_event(&self, event: Event) {
        self.store.write().await.events.insert(event.id, event);
    }

    pub async fn insert_meeting_attendance(&self, attendance: MeetingAttendance) {
        self.store.write().await.meeting_attendances.push(attendance);
    }

    /// Insert an invitation as-is, bypassing validation (fixtures).
    pub async fn insert_workshop_invitation(&self, invitation: WorkshopInvitation) {
        self.store.write().await.workshop_invitations.push(invitation);
    }

    pub async fn insert_waiting_list_entry(&self, entry: WaitingListEntry) {
        self.store.write().await.waiting_list.push(entry);
    }

    /// Make every invitation create for `member_id` fail validation.
    pub async fn reject_invitations_for(&self, member_id: Uuid) {
        self.store.write().await.rejected_members.insert(member_id);
    }

    pub async fn workshop_invitations(&self) -> Vec<WorkshopInvitation> {
        self.store.read().await.workshop_invitations.clone()
    }

    pub async fn event_invitations(&self) -> Vec<EventInvitation> {
        self.store.read().await.event_invitations.clone()
    }

    pub async fn course_invitations(&self) -> Vec<CourseInvitation> {
        self.store.read().await.course_invitations.clone()
    }

    pub async fn waiting_list_entries(&self) -> Vec<WaitingListEntry> {
        self.store.read().await.waiting_list.clone()
    }
}

#[async_trait]
impl InvitationRepository for InMemoryInvitationRepository {
    async fn get_workshop(&self, id: Uuid) -> InvitationResult<Option<Workshop>> {
        Ok(self.store.read().await.workshops.get(&id).cloned())
    }

    async fn get_event(&self, id: Uuid) -> InvitationResult<Option<Event>> {
        Ok(self.store.read().await.events.get(&id).cloned())
    }

    async fn get_chapter(&self, id: Uuid) -> InvitationResult<Option<Chapter>> {
        Ok(self.store.read().await.chapters.get(&id).cloned())
    }

    async fn get_sponsor(&self, id: Uuid) -> InvitationResult<Option<Sponsor>> {
        Ok(self.store.read().await.sponsors.get(&id).cloned())
    }

    async fn get_member(&self, id: Uuid) -> InvitationResult<Option<Member>> {
        let store = self.store.read().await;
        Ok(store.members.iter().find(|m| m.id == id).cloned())
    }

    async fn list_group_members(&self, query: MemberQuery) -> InvitationResult<Vec<Member>> {
        let store = self.store.read().await;

        let group_ids: HashSet<Uuid> = store
            .groups
            .iter()
            .filter(|g| g.chapter_id == query.chapter_id && g.kind == query.kind)
            .map(|g| g.id)
            .collect();

        let member_ids: HashSet<Uuid> = store
            .memberships
            .iter()
            .filter(|(group_id, _)| group_ids.contains(group_id))
            .map(|(_, member_id)| *member_id)
            .collect();

        let members = store
            .members
            .iter()
            .filter(|m| member_ids.contains(&m.id))
            .filter(|m| query.include_banned || !m.banned)
            .cloned()
            .collect();

        Ok(members)
    }

    async fn list_meeting_attendees(&self, meeting_id: Uuid) -> InvitationResult<Vec<Member>> {
        let store = self.store.read().await;

        let member_ids: HashSet<Uuid> = store
            .meeting_attendances
            .iter()
            .filter(|a| a.meeting_id == meeting_id && a.attending)
            .map(|a| a.member_id)
            .collect();

        Ok(store
            .members
            .iter()
            .filter(|m| member_ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn create_workshop_invitation(
        &self,
        input: NewWorkshopInvitation,
    ) -> InvitationResult<WorkshopInvitation> {
        let mut store = self.store.write().await;
        store.validate_member(input.member_id)?;

        let invitation = input.into_invitation();
        store.workshop_invitations.push(invitation.clone());

        tracing::debug!(invitation_id = %invitation.id, role = %invitation.role, "Created workshop invitation");
        Ok(invitation)
    }

    async fn create_event_invitation(
        &self,
        input: NewEventInvitation,
    ) -> InvitationResult<EventInvitation> {
        let mut store = self.store.write().await;
        store.validate_member(input.member_id)?;

        let invitation = input.into_invitation();
        store.event_invitations.push(invitation.clone());

        tracing::debug!(invitation_id = %invitation.id, role = %invitation.role, "Created event invitation");
        Ok(invitation)
    }

    async fn create_course_invitation(
        &self,
        input: NewCourseInvitation,
    ) -> InvitationResult<CourseInvitation> {
        let mut store = self.store.write().await;
        store.validate_member(input.member_id)?;

        let invitation = input.into_invitation();
        store.course_invitations.push(invitation.clone());

        tracing::debug!(invitation_id = %invitation.id, "Created course invitation");
        Ok(invitation)
    }

    async fn list_workshop_invitations(
        &self,
        filter: WorkshopInvitationFilter,
    ) -> InvitationResult<Vec<WorkshopInvitation>> {
        let store = self.store.read().await;
        Ok(store
            .workshop_invitations
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn list_waiting_list(
        &self,
        workshop_id: Uuid,
        role: Option<Role>,
    ) -> InvitationResult<Vec<WaitingListSlot>> {
        let store = self.store.read().await;

        let mut slots: Vec<WaitingListSlot> = store
            .waiting_list
            .iter()
            .filter_map(|entry| {
                store
                    .workshop_invitations
                    .iter()
                    .find(|i| i.id == entry.invitation_id)
                    .map(|invitation| WaitingListSlot {
                        entry: entry.clone(),
                        invitation: invitation.clone(),
                    })
            })
            .filter(|slot| slot.invitation.workshop_id == workshop_id)
            .filter(|slot| role.is_none_or(|r| slot.role() == r))
            .collect();

        slots.sort_by(|a, b| a.entry.created_at.cmp(&b.entry.created_at));
        Ok(slots)
    }

    async fn delete_waiting_list_entry(&self, id: Uuid) -> InvitationResult<bool> {
        let mut store = self.store.write().await;
        let before = store.waiting_list.len();
        store.waiting_list.retain(|e| e.id != id);

        if store.waiting_list.len() < before {
            tracing::debug!(waiting_list_id = %id, "Deleted waiting list entry");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn mark_reminded(
        &self,
        invitation_id: Uuid,
        at: DateTime<Utc>,
    ) -> InvitationResult<WorkshopInvitation> {
        let mut store = self.store.write().await;
        let invitation = store
            .workshop_invitations
            .iter_mut()
            .find(|i| i.id == invitation_id)
            .ok_or_else(|| {
                InvitationError::Database(format!("workshop invitation {} not found", invitation_id))
            })?;

        invitation.reminded_at = Some(at);
        Ok(invitation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupKind;

    fn member(name: &str, banned: bool) -> Member {
        Member {
            id: Uuid::now_v7(),
            name: name.to_string(),
            surname: "Tester".to_string(),
            email: format!("{}@example.com", name),
            banned,
        }
    }

    #[tokio::test]
    async fn test_list_group_members_filters_kind_chapter_and_bans() {
        let repo = InMemoryInvitationRepository::new();
        let chapter_id = Uuid::now_v7();
        let other_chapter = Uuid::now_v7();
        let students = Group { id: Uuid::now_v7(), chapter_id, kind: GroupKind::Students };
        let coaches = Group { id: Uuid::now_v7(), chapter_id, kind: GroupKind::Coaches };
        let elsewhere = Group { id: Uuid::now_v7(), chapter_id: other_chapter, kind: GroupKind::Students };

        let ada = member("ada", false);
        let bob = member("bob", true);
        let cy = member("cy", false);
        let dee = member("dee", false);
        for m in [&ada, &bob, &cy, &dee] {
            repo.insert_member(m.clone()).await;
        }
        for g in [&students, &coaches, &elsewhere] {
            repo.insert_group(g.clone()).await;
        }
        repo.add_to_group(students.id, ada.id).await;
        repo.add_to_group(students.id, bob.id).await;
        repo.add_to_group(coaches.id, cy.id).await;
        repo.add_to_group(elsewhere.id, dee.id).await;

        let invitable = repo
            .list_group_members(MemberQuery::invitable(chapter_id, GroupKind::Students))
            .await
            .unwrap();
        assert_eq!(invitable, vec![ada.clone()]);

        let all = repo
            .list_group_members(MemberQuery::all(chapter_id, GroupKind::Students))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_member_in_two_groups_listed_once() {
        let repo = InMemoryInvitationRepository::new();
        let chapter_id = Uuid::now_v7();
        let first = Group { id: Uuid::now_v7(), chapter_id, kind: GroupKind::Students };
        let second = Group { id: Uuid::now_v7(), chapter_id, kind: GroupKind::Students };
        let ada = member("ada", false);
        repo.insert_member(ada.clone()).await;
        repo.insert_group(first.clone()).await;
        repo.insert_group(second.clone()).await;
        repo.add_to_group(first.id, ada.id).await;
        repo.add_to_group(second.id, ada.id).await;

        let members = repo
            .list_group_members(MemberQuery::invitable(chapter_id, GroupKind::Students))
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn test_create_invitation_requires_known_member() {
        let repo = InMemoryInvitationRepository::new();
        let result = repo
            .create_workshop_invitation(NewWorkshopInvitation::new(
                Uuid::now_v7(),
                Uuid::now_v7(),
                Role::Student,
            ))
            .await;
        assert!(matches!(result, Err(InvitationError::Validation(_))));
        assert!(repo.workshop_invitations().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_member_is_not_saved() {
        let repo = InMemoryInvitationRepository::new();
        let ada = member("ada", false);
        repo.insert_member(ada.clone()).await;
        repo.reject_invitations_for(ada.id).await;

        let result = repo
            .create_event_invitation(NewEventInvitation::new(Uuid::now_v7(), ada.id, Role::Coach))
            .await;
        assert!(result.is_err());
        assert!(repo.event_invitations().await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_reminded_and_waiting_list_delete() {
        let repo = InMemoryInvitationRepository::new();
        let workshop_id = Uuid::now_v7();
        let ada = member("ada", false);
        repo.insert_member(ada.clone()).await;

        let invitation = repo
            .create_workshop_invitation(NewWorkshopInvitation::new(workshop_id, ada.id, Role::Student))
            .await
            .unwrap();
        let entry = WaitingListEntry {
            id: Uuid::now_v7(),
            invitation_id: invitation.id,
            auto_rsvp: true,
            created_at: Utc::now(),
        };
        repo.insert_waiting_list_entry(entry.clone()).await;

        let slots = repo.list_waiting_list(workshop_id, Some(Role::Student)).await.unwrap();
        assert_eq!(slots.len(), 1);
        assert!(repo.list_waiting_list(workshop_id, Some(Role::Coach)).await.unwrap().is_empty());

        let now = Utc::now();
        let reminded = repo.mark_reminded(invitation.id, now).await.unwrap();
        assert_eq!(reminded.reminded_at, Some(now));

        assert!(repo.delete_waiting_list_entry(entry.id).await.unwrap());
        assert!(!repo.delete_waiting_list_entry(entry.id).await.unwrap());
    }
}
