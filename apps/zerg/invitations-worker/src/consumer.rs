//! Redis stream consumer for invitation jobs
//!
//! Reads `invitations:jobs` through the `invitation_workers` consumer group
//! and runs each job through the [`InvitationJobProcessor`]. Every message is
//! acknowledged once handled, whether the job succeeded, failed or could not
//! be parsed. Failed jobs are logged and never retried.
//!
//! If the consumer group disappears while running (the stream key was
//! deleted, say), the next read recreates it.

use domain_invitations::{
    DispatchOutcome, InvitationJob, InvitationJobProcessor, InvitationJobStream,
    InvitationMailer, InvitationRepository,
};
use redis::RedisResult;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::metrics::JobMetrics;

type StreamReply = Vec<(String, Vec<(String, Vec<(String, String)>)>)>;

/// One stream entry. `job` is `None` when the entry held no parseable job.
#[derive(Debug)]
pub struct StreamMessage {
    pub stream_id: String,
    pub job: Option<InvitationJob>,
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub stream_name: String,
    pub consumer_group: String,
    pub consumer_id: String,
    pub block_ms: u64,
    pub batch_size: usize,
}

impl ConsumerConfig {
    pub fn new(consumer_id: impl Into<String>) -> Self {
        Self {
            stream_name: InvitationJobStream::STREAM_NAME.to_string(),
            consumer_group: InvitationJobStream::CONSUMER_GROUP.to_string(),
            consumer_id: consumer_id.into(),
            block_ms: 1000,
            batch_size: 10,
        }
    }

    pub fn with_blocking(mut self, block_ms: u64) -> Self {
        self.block_ms = block_ms;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

pub struct RedisJobConsumer<R: InvitationRepository, M: InvitationMailer> {
    redis: Arc<ConnectionManager>,
    processor: InvitationJobProcessor<R, M>,
    config: ConsumerConfig,
    metrics: JobMetrics,
}

impl<R, M> RedisJobConsumer<R, M>
where
    R: InvitationRepository + 'static,
    M: InvitationMailer + 'static,
{
    pub fn new(
        redis: ConnectionManager,
        processor: InvitationJobProcessor<R, M>,
        config: ConsumerConfig,
    ) -> Self {
        let metrics = JobMetrics::new(config.stream_name.clone());
        Self {
            redis: Arc::new(redis),
            processor,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Create the consumer group if it doesn't exist
    pub async fn init_consumer_group(&self) -> RedisResult<()> {
        let mut conn = (*self.redis).clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if group_already_exists(&e.to_string()) => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Read new messages, blocking up to `block_ms`.
    ///
    /// A missing group is recreated and the read returns no messages. If the
    /// group cannot be recreated the error is returned.
    pub async fn read_new(&self) -> RedisResult<Vec<StreamMessage>> {
        let mut conn = (*self.redis).clone();

        let result: RedisResult<Option<StreamReply>> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("BLOCK")
            .arg(self.config.block_ms)
            .arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(Some(streams)) => Ok(streams
                .into_iter()
                .flat_map(|(_stream, entries)| parse_entries(entries))
                .collect()),
            Ok(None) => Ok(vec![]),
            Err(e) if is_missing_group(&e.to_string()) => {
                warn!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group missing, recreating"
                );
                self.init_consumer_group().await?;
                Ok(vec![])
            }
            Err(e) => Err(e),
        }
    }

    pub async fn ack(&self, stream_id: &str) -> RedisResult<()> {
        let mut conn = (*self.redis).clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(stream_id = %stream_id, "Acknowledged message");
        Ok(())
    }

    /// Run one message through the processor, then acknowledge it.
    pub async fn handle(&self, message: StreamMessage) {
        match &message.job {
            Some(job) => {
                let method = job.kind.method();
                let started = Instant::now();

                match self.processor.process(job).await {
                    Ok(DispatchOutcome::Dispatched(summary)) => {
                        self.metrics.job_dispatched(method, &summary, started.elapsed());
                        info!(
                            job_id = %job.id,
                            invited = summary.invited,
                            skipped = summary.skipped,
                            "Invitation job dispatched"
                        );
                    }
                    Ok(DispatchOutcome::NotInvitable { message }) => {
                        self.metrics.job_not_invitable(method);
                        info!(job_id = %job.id, %message, "Invitation job not dispatched");
                    }
                    Ok(DispatchOutcome::AlreadyProcessed) => {
                        self.metrics.job_already_processed(method);
                    }
                    Err(e) => {
                        self.metrics.job_failed(method, started.elapsed());
                        error!(job_id = %job.id, method, error = %e, "Invitation job failed");
                    }
                }
            }
            None => self.metrics.job_unparseable(),
        }

        if let Err(e) = self.ack(&message.stream_id).await {
            error!(stream_id = %message.stream_id, error = %e, "Failed to acknowledge message");
        }
    }

    /// Consume until `shutdown` flips to `true`. Messages already read finish
    /// before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> RedisResult<()> {
        self.init_consumer_group().await?;

        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            consumer = %self.config.consumer_id,
            "Invitation consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                result = self.read_new() => match result {
                    Ok(messages) => {
                        for message in messages {
                            self.handle(message).await;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read from stream");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        info!(consumer = %self.config.consumer_id, "Invitation consumer stopped");
        Ok(())
    }
}

/// `XGROUP CREATE` reply when the group is already there.
pub fn group_already_exists(error: &str) -> bool {
    error.contains("BUSYGROUP")
}

/// `XREADGROUP` reply when the stream or its group no longer exists.
pub fn is_missing_group(error: &str) -> bool {
    error.contains("NOGROUP")
}

/// Turn raw stream entries into messages, keeping unparseable ones so they
/// still get acknowledged.
pub fn parse_entries(entries: Vec<(String, Vec<(String, String)>)>) -> Vec<StreamMessage> {
    entries
        .into_iter()
        .map(|(stream_id, fields)| {
            let job = match fields
                .iter()
                .find(|(k, _)| k == InvitationJobStream::JOB_FIELD)
            {
                Some((_, json)) => match serde_json::from_str::<InvitationJob>(json) {
                    Ok(job) => Some(job),
                    Err(e) => {
                        warn!(stream_id = %stream_id, error = %e, "Failed to parse job, skipping");
                        None
                    }
                },
                None => {
                    warn!(
                        stream_id = %stream_id,
                        fields = ?fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
                        "Missing 'job' field in message"
                    );
                    None
                }
            };

            StreamMessage { stream_id, job }
        })
        .collect()
}
