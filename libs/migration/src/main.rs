//! Migration CLI for the invitations database.
//!
//! Reads `DATABASE_URL`; run `migration up` to apply, `migration status` to inspect.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
