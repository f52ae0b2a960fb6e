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
                    .as_enum(GroupKind::Enum)
                    .values([GroupKind::Students, GroupKind::Coaches])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Chapters::Table)
                    .if_not_exists()
                    .col(pk_uuid(Chapters::Id))
                    .col(string(Chapters::Name))
                    .col(string(Chapters::Email))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(pk_uuid(Members::Id))
                    .col(string(Members::Name))
                    .col(string(Members::Surname).default(""))
                    .col(string(Members::Email))
                    .col(boolean(Members::Banned).default(false))
                    .col(
                        timestamp_with_time_zone(Members::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(pk_uuid(Groups::Id))
                    .col(uuid(Groups::ChapterId))
                    .col(
                        ColumnDef::new(Groups::Kind)
                            .enumeration(GroupKind::Enum, [GroupKind::Students, GroupKind::Coaches])
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_groups_chapter_id")
                            .from(Groups::Table, Groups::ChapterId)
                            .to(Chapters::Table, Chapters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(pk_uuid(GroupMembers::Id))
                    .col(uuid(GroupMembers::GroupId))
                    .col(uuid(GroupMembers::MemberId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_members_group_id")
                            .from(GroupMembers::Table, GroupMembers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_members_member_id")
                            .from(GroupMembers::Table, GroupMembers::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_groups_chapter_id_kind")
                    .table(Groups::Table)
                    .col(Groups::ChapterId)
                    .col(Groups::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_members_group_id")
                    .table(GroupMembers::Table)
                    .col(GroupMembers::GroupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Chapters::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(GroupKind::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Chapters {
    Table,
    Id,
    Name,
    Email,
}

#[derive(DeriveIden)]
enum Members {
    Table,
    Id,
    Name,
    Surname,
    Email,
    Banned,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    ChapterId,
    Kind,
}

#[derive(DeriveIden)]
enum GroupMembers {
    Table,
    Id,
    GroupId,
    MemberId,
}

#[derive(DeriveIden)]
enum GroupKind {
    #[sea_orm(iden = "group_kind")]
    Enum,
    #[sea_orm(iden = "Students")]
    Students,
    #[sea_orm(iden = "Coaches")]
    Coaches,
}
