//! Invitations Worker Service - Entry Point
//!
//! Background worker that runs deferred invitation dispatches from the Redis stream.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    zerg_invitations_worker::run().await
}
