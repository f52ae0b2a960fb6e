//! Invitations Worker Service
//!
//! Runs deferred workshop and event invitation dispatches queued on a Redis
//! stream.
//!
//! ## Architecture
//!
//! ```text
//! Redis Stream (invitations:jobs)
//!   ↓ (Consumer Group: invitation_workers)
//! RedisJobConsumer
//!   ↓ (one job at a time, ack after every job)
//! InvitationJobProcessor
//!   ↓
//! InvitationDispatcher<PgInvitationRepository, TemplateMailer<SmtpProvider>>
//!   ↓                          ↓
//! PostgreSQL               SMTP
//! ```
//!
//! A health server (`/health`, `/ready`, `/metrics`) runs alongside the
//! consumer on `health_port`.

pub mod config;
pub mod consumer;
pub mod health;
pub mod metrics;
pub mod telemetry;

use domain_invitations::{
    InvitationDispatcher, InvitationJobProcessor, MailerConfig, PgInvitationRepository,
    SmtpConfig, SmtpProvider, TemplateEngine, TemplateMailer,
};
use eyre::{Result, WrapErr};
use redis::Client;
use redis::aio::ConnectionManager;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::WorkerSettings;
use crate::consumer::{ConsumerConfig, RedisJobConsumer};
use crate::health::{HealthState, PostgresCheck, RedisCheck};

async fn connect_postgres(database_url: &str) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    Database::connect(opt)
        .await
        .wrap_err("Failed to connect to PostgreSQL")
}

async fn connect_redis(url: &str) -> Result<ConnectionManager> {
    let client = Client::open(url).wrap_err("Invalid Redis URL")?;
    let manager = ConnectionManager::new(client)
        .await
        .wrap_err("Failed to connect to Redis")?;

    // Verify connection with PING
    let mut conn = manager.clone();
    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .wrap_err("Redis did not answer PING")?;

    Ok(manager)
}

/// Run the invitations worker until SIGINT or SIGTERM.
pub async fn run() -> Result<()> {
    telemetry::install_color_eyre();

    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker settings")?;
    telemetry::init_tracing(settings.log_format);
    let metrics_handle = metrics::init_metrics()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus recorder: {}", e))?;

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting invitations worker"
    );

    info!("Connecting to PostgreSQL...");
    let db = connect_postgres(&settings.database_url).await?;
    info!("Connected to PostgreSQL successfully");

    info!("Connecting to Redis...");
    let redis = connect_redis(&settings.redis_url).await?;
    info!("Connected to Redis successfully");

    let provider =
        SmtpProvider::new(SmtpConfig::from_env()).wrap_err("Failed to set up SMTP provider")?;
    let templates = TemplateEngine::new().wrap_err("Failed to load email templates")?;
    let mailer = TemplateMailer::new(provider, templates, MailerConfig::from_env());

    let health_state = HealthState::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .with_check(RedisCheck::new(redis.clone()))
        .with_check(PostgresCheck::new(db.clone()))
        .with_metrics(metrics_handle.clone());
    let health_port = settings.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    let dispatcher = InvitationDispatcher::new(PgInvitationRepository::new(db), mailer);
    let processor = InvitationJobProcessor::new(dispatcher);

    let consumer_config = ConsumerConfig::new(settings.consumer_id.clone())
        .with_blocking(settings.block_ms)
        .with_batch_size(settings.batch_size);
    info!(
        stream = %consumer_config.stream_name,
        consumer_group = %consumer_config.consumer_group,
        consumer_id = %consumer_config.consumer_id,
        block_ms = consumer_config.block_ms,
        batch_size = consumer_config.batch_size,
        "Worker configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let consumer = RedisJobConsumer::new(redis, processor, consumer_config);
    consumer
        .run(shutdown_rx)
        .await
        .wrap_err("Invitation consumer failed")?;

    info!("Invitations worker stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .wrap_err("Failed to install SIGTERM handler")?;

    #[cfg(unix)]
    let terminate = sigterm.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = signal::ctrl_c() => {
            result.wrap_err("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
