//! Schema for the invitations domain: chapters and their groups, hosted
//! activities, and the invitation and waiting-list tables.

pub use sea_orm_migration::prelude::*;

mod m20261018_000000_create_chapters_and_members;
mod m20261018_000001_create_activities;
mod m20261018_000002_create_invitations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261018_000000_create_chapters_and_members::Migration),
            Box::new(m20261018_000001_create_activities::Migration),
            Box::new(m20261018_000002_create_invitations::Migration),
        ]
    }
}
