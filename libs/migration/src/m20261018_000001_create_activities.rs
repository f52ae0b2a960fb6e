use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Sponsors host workshops; seats and coach_spots cap attendance
        manager
            .create_table(
                Table::create()
                    .table(Sponsors::Table)
                    .if_not_exists()
                    .col(pk_uuid(Sponsors::Id))
                    .col(string(Sponsors::Name))
                    .col(text(Sponsors::Address).default(""))
                    .col(integer(Sponsors::Seats).default(0))
                    .col(integer(Sponsors::CoachSpots).default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Workshops::Table)
                    .if_not_exists()
                    .col(pk_uuid(Workshops::Id))
                    .col(uuid(Workshops::ChapterId))
                    .col(uuid_null(Workshops::HostId))
                    .col(string(Workshops::Title))
                    .col(timestamp_with_time_zone(Workshops::DateAndTime))
                    .col(boolean(Workshops::Invitable).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workshops_chapter_id")
                            .from(Workshops::Table, Workshops::ChapterId)
                            .to(Chapters::Table, Chapters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workshops_host_id")
                            .from(Workshops::Table, Workshops::HostId)
                            .to(Sponsors::Table, Sponsors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(pk_uuid(Events::Id))
                    .col(string(Events::Name))
                    .col(timestamp_with_time_zone(Events::DateAndTime))
                    .col(string_null(Events::Audience))
                    .col(boolean(Events::Invitable).default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(pk_uuid(Courses::Id))
                    .col(uuid(Courses::ChapterId))
                    .col(string(Courses::Title))
                    .col(timestamp_with_time_zone(Courses::DateAndTime))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_courses_chapter_id")
                            .from(Courses::Table, Courses::ChapterId)
                            .to(Chapters::Table, Chapters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Meetings::Table)
                    .if_not_exists()
                    .col(pk_uuid(Meetings::Id))
                    .col(string(Meetings::Name))
                    .col(timestamp_with_time_zone(Meetings::DateAndTime))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MeetingAttendances::Table)
                    .if_not_exists()
                    .col(pk_uuid(MeetingAttendances::Id))
                    .col(uuid(MeetingAttendances::MeetingId))
                    .col(uuid(MeetingAttendances::MemberId))
                    .col(boolean(MeetingAttendances::Attending).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_attendances_meeting_id")
                            .from(MeetingAttendances::Table, MeetingAttendances::MeetingId)
                            .to(Meetings::Table, Meetings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_attendances_member_id")
                            .from(MeetingAttendances::Table, MeetingAttendances::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meeting_attendances_meeting_id")
                    .table(MeetingAttendances::Table)
                    .col(MeetingAttendances::MeetingId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MeetingAttendances::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Meetings::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Workshops::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sponsors::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Chapters {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Sponsors {
    Table,
    Id,
    Name,
    Address,
    Seats,
    CoachSpots,
}

#[derive(DeriveIden)]
enum Workshops {
    Table,
    Id,
    ChapterId,
    HostId,
    Title,
    DateAndTime,
    Invitable,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Name,
    DateAndTime,
    Audience,
    Invitable,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    ChapterId,
    Title,
    DateAndTime,
}

#[derive(DeriveIden)]
enum Meetings {
    Table,
    Id,
    Name,
    DateAndTime,
}

#[derive(DeriveIden)]
enum MeetingAttendances {
    Table,
    Id,
    MeetingId,
    MemberId,
    Attending,
}
