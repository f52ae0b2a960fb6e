//! Job queues for deferred invitation dispatches.
//!
//! Enqueueing returns as soon as the job is handed over; the dispatch itself
//! runs later on a worker. Nothing orders jobs across enqueues.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{InvitationError, InvitationResult};
use crate::jobs::InvitationJob;
use crate::mailer::InvitationMailer;
use crate::models::DispatchOutcome;
use crate::processor::InvitationJobProcessor;
use crate::repository::InvitationRepository;
use crate::streams::InvitationJobStream;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Hand a job to the background worker. Returns the job id.
    async fn enqueue(&self, job: InvitationJob) -> InvitationResult<Uuid>;

    /// Queue `send_workshop_emails` for a workshop.
    async fn enqueue_workshop_emails(
        &self,
        workshop_id: Uuid,
        audience: Option<&str>,
    ) -> InvitationResult<Uuid> {
        self.enqueue(InvitationJob::workshop_emails(workshop_id, audience))
            .await
    }

    /// Queue `send_event_emails` for an event and the chapter to invite from.
    async fn enqueue_event_emails(&self, event_id: Uuid, chapter_id: Uuid) -> InvitationResult<Uuid> {
        self.enqueue(InvitationJob::event_emails(event_id, chapter_id))
            .await
    }
}

/// Queue backed by the `invitations:jobs` Redis stream.
pub struct RedisJobQueue {
    redis: Arc<ConnectionManager>,
    stream_name: String,
    max_length: i64,
}

impl RedisJobQueue {
    pub fn new(redis: ConnectionManager) -> Self {
        Self::with_stream(redis, InvitationJobStream::STREAM_NAME)
    }

    pub fn with_stream(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: stream_name.into(),
            max_length: InvitationJobStream::MAX_LENGTH,
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: InvitationJob) -> InvitationResult<Uuid> {
        let mut conn = (*self.redis).clone();

        let job_json = serde_json::to_string(&job)?;

        // Add to stream with auto-trim
        let stream_id: String = redis::cmd("XADD")
            .arg(&self.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(InvitationJobStream::JOB_FIELD)
            .arg(&job_json)
            .query_async(&mut conn)
            .await?;

        debug!(
            job_id = %job.id,
            stream_id = %stream_id,
            method = job.kind.method(),
            "Queued invitation job"
        );

        Ok(job.id)
    }
}

/// In-process queue: one spawned task runs jobs sequentially.
///
/// Jobs cross the channel serialized, the same way they are stored in the
/// stream. The task stops once every `LocalJobQueue` handle is dropped and
/// the channel is drained.
#[derive(Clone)]
pub struct LocalJobQueue {
    sender: mpsc::UnboundedSender<String>,
}

impl LocalJobQueue {
    /// Spawn the runner task. Await the handle after dropping the queue to
    /// wait for outstanding jobs.
    pub fn spawn<R, M>(processor: InvitationJobProcessor<R, M>) -> (Self, JoinHandle<()>)
    where
        R: InvitationRepository + 'static,
        M: InvitationMailer + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

        let handle = tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                let job: InvitationJob = match serde_json::from_str(&payload) {
                    Ok(job) => job,
                    Err(e) => {
                        error!(error = %e, "Failed to parse invitation job, skipping");
                        continue;
                    }
                };

                match processor.process(&job).await {
                    Ok(DispatchOutcome::NotInvitable { message }) => {
                        info!(job_id = %job.id, %message, "Invitation job not dispatched");
                    }
                    Ok(outcome) => {
                        debug!(job_id = %job.id, outcome = ?outcome, "Invitation job finished");
                    }
                    Err(e) => {
                        error!(job_id = %job.id, error = %e, "Invitation job failed");
                    }
                }
            }

            debug!("Local job queue closed");
        });

        (Self { sender }, handle)
    }
}

#[async_trait]
impl JobQueue for LocalJobQueue {
    async fn enqueue(&self, job: InvitationJob) -> InvitationResult<Uuid> {
        let payload = serde_json::to_string(&job)?;
        self.sender
            .send(payload)
            .map_err(|_| InvitationError::Queue("local job queue has shut down".to_string()))?;

        debug!(job_id = %job.id, method = job.kind.method(), "Queued invitation job locally");
        Ok(job.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockInvitationMailer;
    use crate::models::{Chapter, Group, GroupKind, Member, Workshop};
    use crate::repository::InMemoryInvitationRepository;
    use crate::service::InvitationDispatcher;
    use chrono::Utc;

    async fn workshop_with_coach(repo: &InMemoryInvitationRepository, invitable: bool) -> Workshop {
        let chapter = Chapter {
            id: Uuid::now_v7(),
            name: "Brighton".to_string(),
            email: "brighton@example.com".to_string(),
        };
        let coaches = Group {
            id: Uuid::now_v7(),
            chapter_id: chapter.id,
            kind: GroupKind::Coaches,
        };
        let coach = Member {
            id: Uuid::now_v7(),
            name: "Grace".to_string(),
            surname: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            banned: false,
        };
        let workshop = Workshop {
            id: Uuid::now_v7(),
            chapter_id: chapter.id,
            host_id: None,
            title: "Intro to Rust".to_string(),
            date_and_time: Utc::now(),
            invitable,
        };
        repo.insert_chapter(chapter).await;
        repo.insert_group(coaches.clone()).await;
        repo.insert_member(coach.clone()).await;
        repo.add_to_group(coaches.id, coach.id).await;
        repo.insert_workshop(workshop.clone()).await;
        workshop
    }

    #[tokio::test]
    async fn test_local_queue_runs_jobs_in_background() {
        let repo = InMemoryInvitationRepository::new();
        let workshop = workshop_with_coach(&repo, true).await;

        let mut mailer = MockInvitationMailer::new();
        mailer
            .expect_workshop_invite_coach()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let processor = InvitationJobProcessor::new(InvitationDispatcher::new(repo.clone(), mailer));

        let (queue, handle) = LocalJobQueue::spawn(processor);
        let job_id = queue
            .enqueue_workshop_emails(workshop.id, Some("coaches"))
            .await
            .unwrap();
        drop(queue);
        handle.await.unwrap();

        let invitations = repo.workshop_invitations().await;
        assert_eq!(invitations.len(), 1);
        assert_ne!(job_id, Uuid::nil());
    }

    #[tokio::test]
    async fn test_local_queue_runs_a_job_id_once() {
        let repo = InMemoryInvitationRepository::new();
        let workshop = workshop_with_coach(&repo, true).await;

        let mut mailer = MockInvitationMailer::new();
        mailer
            .expect_workshop_invite_coach()
            .times(2)
            .returning(|_, _, _| Ok(()));
        let processor = InvitationJobProcessor::new(InvitationDispatcher::new(repo.clone(), mailer));

        let (queue, handle) = LocalJobQueue::spawn(processor);
        let job = InvitationJob::workshop_emails(workshop.id, None);
        queue.enqueue(job.clone()).await.unwrap();
        queue.enqueue(job).await.unwrap();
        // A fresh enqueue of the same dispatch is a new job and runs again.
        queue.enqueue_workshop_emails(workshop.id, None).await.unwrap();
        drop(queue);
        handle.await.unwrap();

        assert_eq!(repo.workshop_invitations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_the_queue() {
        let repo = InMemoryInvitationRepository::new();
        let closed = workshop_with_coach(&repo, false).await;
        let open = workshop_with_coach(&repo, true).await;

        let mut mailer = MockInvitationMailer::new();
        mailer
            .expect_workshop_invite_coach()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let processor = InvitationJobProcessor::new(InvitationDispatcher::new(repo.clone(), mailer));

        let (queue, handle) = LocalJobQueue::spawn(processor);
        queue.enqueue_workshop_emails(Uuid::now_v7(), None).await.unwrap();
        queue.enqueue_workshop_emails(closed.id, None).await.unwrap();
        queue.enqueue_workshop_emails(open.id, None).await.unwrap();
        drop(queue);
        handle.await.unwrap();

        let invitations = repo.workshop_invitations().await;
        assert_eq!(invitations.len(), 1);
        assert_eq!(invitations[0].workshop_id, open.id);
    }

    #[tokio::test]
    async fn test_enqueue_after_runner_stopped_fails() {
        let processor = InvitationJobProcessor::new(InvitationDispatcher::new(
            InMemoryInvitationRepository::new(),
            MockInvitationMailer::new(),
        ));
        let (queue, handle) = LocalJobQueue::spawn(processor);
        handle.abort();
        let _ = handle.await;

        let result = queue.enqueue_event_emails(Uuid::now_v7(), Uuid::now_v7()).await;
        assert!(matches!(result, Err(InvitationError::Queue(_))));
    }
}
