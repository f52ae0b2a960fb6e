use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(InvitationRole::Enum)
                    .values([InvitationRole::Student, InvitationRole::Coach])
                    .to_owned(),
            )
            .await?;

        // No unique (workshop_id, member_id): dispatching twice invites twice
        manager
            .create_table(
                Table::create()
                    .table(WorkshopInvitations::Table)
                    .if_not_exists()
                    .col(pk_uuid(WorkshopInvitations::Id))
                    .col(uuid(WorkshopInvitations::WorkshopId))
                    .col(uuid(WorkshopInvitations::MemberId))
                    .col(role_column(WorkshopInvitations::Role))
                    .col(boolean_null(WorkshopInvitations::Attending))
                    .col(string_uniq(WorkshopInvitations::Token))
                    .col(timestamp_with_time_zone_null(WorkshopInvitations::RemindedAt))
                    .col(
                        timestamp_with_time_zone(WorkshopInvitations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workshop_invitations_workshop_id")
                            .from(WorkshopInvitations::Table, WorkshopInvitations::WorkshopId)
                            .to(Workshops::Table, Workshops::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workshop_invitations_member_id")
                            .from(WorkshopInvitations::Table, WorkshopInvitations::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventInvitations::Table)
                    .if_not_exists()
                    .col(pk_uuid(EventInvitations::Id))
                    .col(uuid(EventInvitations::EventId))
                    .col(uuid(EventInvitations::MemberId))
                    .col(role_column(EventInvitations::Role))
                    .col(boolean_null(EventInvitations::Attending))
                    .col(string_uniq(EventInvitations::Token))
                    .col(
                        timestamp_with_time_zone(EventInvitations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_invitations_event_id")
                            .from(EventInvitations::Table, EventInvitations::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_invitations_member_id")
                            .from(EventInvitations::Table, EventInvitations::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CourseInvitations::Table)
                    .if_not_exists()
                    .col(pk_uuid(CourseInvitations::Id))
                    .col(uuid(CourseInvitations::CourseId))
                    .col(uuid(CourseInvitations::MemberId))
                    .col(boolean_null(CourseInvitations::Attending))
                    .col(string_uniq(CourseInvitations::Token))
                    .col(
                        timestamp_with_time_zone(CourseInvitations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_invitations_course_id")
                            .from(CourseInvitations::Table, CourseInvitations::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_invitations_member_id")
                            .from(CourseInvitations::Table, CourseInvitations::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WaitingLists::Table)
                    .if_not_exists()
                    .col(pk_uuid(WaitingLists::Id))
                    .col(uuid_uniq(WaitingLists::InvitationId))
                    .col(boolean(WaitingLists::AutoRsvp).default(true))
                    .col(
                        timestamp_with_time_zone(WaitingLists::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_waiting_lists_invitation_id")
                            .from(WaitingLists::Table, WaitingLists::InvitationId)
                            .to(WorkshopInvitations::Table, WorkshopInvitations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workshop_invitations_workshop_id_role")
                    .table(WorkshopInvitations::Table)
                    .col(WorkshopInvitations::WorkshopId)
                    .col(WorkshopInvitations::Role)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_waiting_lists_created_at")
                    .table(WaitingLists::Table)
                    .col(WaitingLists::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WaitingLists::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CourseInvitations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(EventInvitations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(WorkshopInvitations::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(InvitationRole::Enum).to_owned())
            .await?;

        Ok(())
    }
}

fn role_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .enumeration(
            InvitationRole::Enum,
            [InvitationRole::Student, InvitationRole::Coach],
        )
        .not_null()
        .to_owned()
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Workshops {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum WorkshopInvitations {
    Table,
    Id,
    WorkshopId,
    MemberId,
    Role,
    Attending,
    Token,
    RemindedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EventInvitations {
    Table,
    Id,
    EventId,
    MemberId,
    Role,
    Attending,
    Token,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CourseInvitations {
    Table,
    Id,
    CourseId,
    MemberId,
    Attending,
    Token,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WaitingLists {
    Table,
    Id,
    InvitationId,
    AutoRsvp,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InvitationRole {
    #[sea_orm(iden = "invitation_role")]
    Enum,
    #[sea_orm(iden = "Student")]
    Student,
    #[sea_orm(iden = "Coach")]
    Coach,
}
