use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use uuid::Uuid;

use crate::{
    entity::{
        chapters, course_invitations, event_invitations, events, group_members, groups,
        meeting_attendances, members, sponsors, waiting_lists, workshop_invitations, workshops,
    },
    error::{InvitationError, InvitationResult},
    models::{
        Chapter, CourseInvitation, Event, EventInvitation, Member, MemberQuery,
        NewCourseInvitation, NewEventInvitation, NewWorkshopInvitation, Role, Sponsor,
        WaitingListSlot, Workshop, WorkshopInvitation, WorkshopInvitationFilter,
    },
    repository::InvitationRepository,
};

pub struct PgInvitationRepository {
    db: DatabaseConnection,
}

impl PgInvitationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Members of the chapter's groups of `query.kind`, oldest first.
fn group_members_select(query: &MemberQuery) -> Select<members::Entity> {
    let mut select = members::Entity::find()
        .join(JoinType::InnerJoin, members::Relation::GroupMembers.def())
        .join(JoinType::InnerJoin, group_members::Relation::Group.def())
        .filter(groups::Column::ChapterId.eq(query.chapter_id))
        .filter(groups::Column::Kind.eq(query.kind))
        .distinct();

    if !query.include_banned {
        select = select.filter(members::Column::Banned.eq(false));
    }

    select.order_by_asc(members::Column::CreatedAt)
}

fn meeting_attendees_select(meeting_id: Uuid) -> Select<members::Entity> {
    members::Entity::find()
        .join(JoinType::InnerJoin, members::Relation::MeetingAttendances.def())
        .filter(meeting_attendances::Column::MeetingId.eq(meeting_id))
        .filter(meeting_attendances::Column::Attending.eq(true))
        .distinct()
        .order_by_asc(members::Column::CreatedAt)
}

#[async_trait]
impl InvitationRepository for PgInvitationRepository {
    async fn get_workshop(&self, id: Uuid) -> InvitationResult<Option<Workshop>> {
        let model = workshops::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_event(&self, id: Uuid) -> InvitationResult<Option<Event>> {
        let model = events::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_chapter(&self, id: Uuid) -> InvitationResult<Option<Chapter>> {
        let model = chapters::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_sponsor(&self, id: Uuid) -> InvitationResult<Option<Sponsor>> {
        let model = sponsors::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_member(&self, id: Uuid) -> InvitationResult<Option<Member>> {
        let model = members::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_group_members(&self, query: MemberQuery) -> InvitationResult<Vec<Member>> {
        let models = group_members_select(&query).all(&self.db).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_meeting_attendees(&self, meeting_id: Uuid) -> InvitationResult<Vec<Member>> {
        let models = meeting_attendees_select(meeting_id).all(&self.db).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn create_workshop_invitation(
        &self,
        input: NewWorkshopInvitation,
    ) -> InvitationResult<WorkshopInvitation> {
        let active_model: workshop_invitations::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(invitation_id = %model.id, role = %model.role, "Created workshop invitation");
        Ok(model.into())
    }

    async fn create_event_invitation(
        &self,
        input: NewEventInvitation,
    ) -> InvitationResult<EventInvitation> {
        let active_model: event_invitations::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(invitation_id = %model.id, role = %model.role, "Created event invitation");
        Ok(model.into())
    }

    async fn create_course_invitation(
        &self,
        input: NewCourseInvitation,
    ) -> InvitationResult<CourseInvitation> {
        let active_model: course_invitations::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(invitation_id = %model.id, "Created course invitation");
        Ok(model.into())
    }

    async fn list_workshop_invitations(
        &self,
        filter: WorkshopInvitationFilter,
    ) -> InvitationResult<Vec<WorkshopInvitation>> {
        let mut query = workshop_invitations::Entity::find()
            .filter(workshop_invitations::Column::WorkshopId.eq(filter.workshop_id));

        if let Some(role) = filter.role {
            query = query.filter(workshop_invitations::Column::Role.eq(role));
        }

        match filter.attending {
            Some(true) => {
                query = query.filter(workshop_invitations::Column::Attending.eq(true));
            }
            Some(false) => {
                query = query.filter(
                    Condition::any()
                        .add(workshop_invitations::Column::Attending.is_null())
                        .add(workshop_invitations::Column::Attending.eq(false)),
                );
            }
            None => {}
        }

        match filter.reminded {
            Some(true) => {
                query = query.filter(workshop_invitations::Column::RemindedAt.is_not_null());
            }
            Some(false) => {
                query = query.filter(workshop_invitations::Column::RemindedAt.is_null());
            }
            None => {}
        }

        let models = query
            .order_by_asc(workshop_invitations::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_waiting_list(
        &self,
        workshop_id: Uuid,
        role: Option<Role>,
    ) -> InvitationResult<Vec<WaitingListSlot>> {
        let mut select = waiting_lists::Entity::find()
            .find_also_related(workshop_invitations::Entity)
            .filter(workshop_invitations::Column::WorkshopId.eq(workshop_id));

        if let Some(role) = role {
            select = select.filter(workshop_invitations::Column::Role.eq(role));
        }

        let rows = select
            .order_by_asc(waiting_lists::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(entry, invitation)| {
                invitation.map(|invitation| WaitingListSlot {
                    entry: entry.into(),
                    invitation: invitation.into(),
                })
            })
            .collect())
    }

    async fn delete_waiting_list_entry(&self, id: Uuid) -> InvitationResult<bool> {
        let result = waiting_lists::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
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
        let model = workshop_invitations::Entity::find_by_id(invitation_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                InvitationError::Database(format!("workshop invitation {} not found", invitation_id))
            })?;

        let mut active_model: workshop_invitations::ActiveModel = model.into();
        active_model.reminded_at = Set(Some(at.into()));
        let updated = active_model.update(&self.db).await?;

        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupKind;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};

    fn member_model(name: &str, banned: bool) -> members::Model {
        members::Model {
            id: Uuid::now_v7(),
            name: name.to_string(),
            surname: "Tester".to_string(),
            email: format!("{}@example.com", name),
            banned,
            created_at: Utc::now().into(),
        }
    }

    fn invitation_model(workshop_id: Uuid, role: Role) -> workshop_invitations::Model {
        workshop_invitations::Model {
            id: Uuid::now_v7(),
            workshop_id,
            member_id: Uuid::now_v7(),
            role,
            attending: Some(true),
            token: "token".to_string(),
            reminded_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_workshop_maps_model() {
        let workshop = workshops::Model {
            id: Uuid::now_v7(),
            chapter_id: Uuid::now_v7(),
            host_id: Some(Uuid::now_v7()),
            title: "Intro to Rust".to_string(),
            date_and_time: Utc::now().into(),
            invitable: true,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![workshop.clone()]])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let found = repo.get_workshop(workshop.id).await.unwrap().unwrap();
        assert_eq!(found.id, workshop.id);
        assert_eq!(found.host_id, workshop.host_id);
        assert!(found.is_invitable());
    }

    #[test]
    fn test_group_members_select_joins_groups() {
        let chapter_id = Uuid::now_v7();

        let sql = group_members_select(&MemberQuery::invitable(chapter_id, GroupKind::Coaches))
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.starts_with("SELECT DISTINCT"));
        assert!(sql.contains(
            r#"INNER JOIN "group_members" ON "members"."id" = "group_members"."member_id""#
        ));
        assert!(sql.contains(r#"INNER JOIN "groups" ON "group_members"."group_id" = "groups"."id""#));
        assert!(sql.contains(&chapter_id.to_string()));
        assert!(sql.contains(r#""members"."banned""#));
        assert!(sql.contains(r#"ORDER BY "members"."created_at" ASC"#));

        let sql = group_members_select(&MemberQuery::all(chapter_id, GroupKind::Coaches))
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(!sql.contains(r#""members"."banned""#));
    }

    #[test]
    fn test_meeting_attendees_select_joins_attendances() {
        let sql = meeting_attendees_select(Uuid::now_v7())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(
            r#"INNER JOIN "meeting_attendances" ON "members"."id" = "meeting_attendances"."member_id""#
        ));
        assert!(sql.contains(r#""meeting_attendances"."attending""#));
    }

    #[tokio::test]
    async fn test_list_group_members_is_one_query() {
        let chapter_id = Uuid::now_v7();
        let ada = member_model("ada", false);
        let grace = member_model("grace", false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ada.clone(), grace.clone()]])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let members = repo
            .list_group_members(MemberQuery::invitable(chapter_id, GroupKind::Coaches))
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].email, "ada@example.com");
        assert_eq!(members[1].id, grace.id);

        assert_eq!(repo.db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn test_list_group_members_without_matches_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<members::Model>::new()])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let members = repo
            .list_group_members(MemberQuery::all(Uuid::now_v7(), GroupKind::Students))
            .await
            .unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn test_create_workshop_invitation_returns_saved_row() {
        let saved = invitation_model(Uuid::now_v7(), Role::Coach);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![saved.clone()]])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let invitation = repo
            .create_workshop_invitation(NewWorkshopInvitation::new(
                saved.workshop_id,
                saved.member_id,
                Role::Coach,
            ))
            .await
            .unwrap();
        assert_eq!(invitation.id, saved.id);
        assert_eq!(invitation.role, Role::Coach);
    }

    #[tokio::test]
    async fn test_create_failure_is_an_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom("duplicate key".to_string())])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let result = repo
            .create_event_invitation(NewEventInvitation::new(Uuid::now_v7(), Uuid::now_v7(), Role::Student))
            .await;
        assert!(matches!(result, Err(InvitationError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_waiting_list_joins_invitations() {
        let workshop_id = Uuid::now_v7();
        let invitation = invitation_model(workshop_id, Role::Student);
        let entry = waiting_lists::Model {
            id: Uuid::now_v7(),
            invitation_id: invitation.id,
            auto_rsvp: true,
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(entry.clone(), invitation.clone())]])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let slots = repo
            .list_waiting_list(workshop_id, Some(Role::Student))
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].entry.id, entry.id);
        assert_eq!(slots[0].invitation.id, invitation.id);

        let log = repo.db.into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(format!("{:?}", log[0]).contains("JOIN"));
    }

    #[tokio::test]
    async fn test_delete_waiting_list_entry() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let id = Uuid::now_v7();
        assert!(repo.delete_waiting_list_entry(id).await.unwrap());
        assert!(!repo.delete_waiting_list_entry(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_reminded_missing_invitation() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<workshop_invitations::Model>::new()])
            .into_connection();
        let repo = PgInvitationRepository::new(db);

        let result = repo.mark_reminded(Uuid::now_v7(), Utc::now()).await;
        assert!(matches!(result, Err(InvitationError::Database(_))));
    }
}
