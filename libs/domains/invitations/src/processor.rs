//! Job processor for deferred invitation dispatches.
//!
//! Resolves the ids carried by an [`InvitationJob`] and runs the matching
//! dispatcher operation. Used by the in-process [`LocalJobQueue`] and by the
//! Redis stream worker.
//!
//! [`LocalJobQueue`]: crate::queue::LocalJobQueue

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{InvitationError, InvitationResult};
use crate::jobs::{InvitationJob, InvitationJobKind};
use crate::mailer::InvitationMailer;
use crate::models::DispatchOutcome;
use crate::repository::InvitationRepository;
use crate::service::InvitationDispatcher;

/// Most recent job ids, oldest evicted first once `capacity` is reached.
#[derive(Debug)]
struct ProcessedJobs {
    ids: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl ProcessedJobs {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record `id`; `false` if it is still remembered.
    fn insert(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

pub struct InvitationJobProcessor<R: InvitationRepository, M: InvitationMailer> {
    dispatcher: InvitationDispatcher<R, M>,
    processed: Arc<Mutex<ProcessedJobs>>,
}

impl<R: InvitationRepository, M: InvitationMailer> Clone for InvitationJobProcessor<R, M> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            processed: Arc::clone(&self.processed),
        }
    }
}

impl<R: InvitationRepository, M: InvitationMailer> InvitationJobProcessor<R, M> {
    /// Job ids remembered for redelivery checks.
    pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

    pub fn new(dispatcher: InvitationDispatcher<R, M>) -> Self {
        Self::with_dedup_capacity(dispatcher, Self::DEFAULT_DEDUP_CAPACITY)
    }

    /// Remember at most `capacity` job ids. A redelivery older than that
    /// window runs again.
    pub fn with_dedup_capacity(dispatcher: InvitationDispatcher<R, M>, capacity: usize) -> Self {
        Self {
            dispatcher,
            processed: Arc::new(Mutex::new(ProcessedJobs::new(capacity))),
        }
    }

    pub fn dispatcher(&self) -> &InvitationDispatcher<R, M> {
        &self.dispatcher
    }

    /// Run a job. A job id still in the dedup window yields
    /// [`DispatchOutcome::AlreadyProcessed`].
    ///
    /// The id is recorded before the dispatch runs, so a job that fails is
    /// not run again either.
    pub async fn process(&self, job: &InvitationJob) -> InvitationResult<DispatchOutcome> {
        if !self.processed.lock().await.insert(job.id) {
            warn!(job_id = %job.id, method = job.kind.method(), "Job already processed");
            return Ok(DispatchOutcome::AlreadyProcessed);
        }

        info!(
            job_id = %job.id,
            method = job.kind.method(),
            enqueued_at = %job.enqueued_at,
            "Processing invitation job"
        );

        let repository = self.dispatcher.repository();

        match &job.kind {
            InvitationJobKind::WorkshopEmails {
                workshop_id,
                audience,
            } => {
                let workshop = repository
                    .get_workshop(*workshop_id)
                    .await?
                    .ok_or(InvitationError::WorkshopNotFound(*workshop_id))?;

                self.dispatcher
                    .send_workshop_emails(&workshop, audience.as_deref())
                    .await
            }
            InvitationJobKind::EventEmails {
                event_id,
                chapter_id,
            } => {
                let event = repository
                    .get_event(*event_id)
                    .await?
                    .ok_or(InvitationError::EventNotFound(*event_id))?;
                let chapter = repository
                    .get_chapter(*chapter_id)
                    .await?
                    .ok_or(InvitationError::ChapterNotFound(*chapter_id))?;

                self.dispatcher.send_event_emails(&event, &chapter).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockInvitationMailer;
    use crate::models::{Chapter, DispatchSummary, Event, Group, GroupKind, Member, Workshop};
    use crate::repository::InMemoryInvitationRepository;
    use chrono::Utc;

    async fn seeded_repo() -> (InMemoryInvitationRepository, Chapter) {
        let repo = InMemoryInvitationRepository::new();
        let chapter = Chapter {
            id: Uuid::now_v7(),
            name: "Glasgow".to_string(),
            email: "glasgow@example.com".to_string(),
        };
        let group = Group {
            id: Uuid::now_v7(),
            chapter_id: chapter.id,
            kind: GroupKind::Students,
        };
        let ada = Member {
            id: Uuid::now_v7(),
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            banned: false,
        };
        repo.insert_chapter(chapter.clone()).await;
        repo.insert_group(group.clone()).await;
        repo.insert_member(ada.clone()).await;
        repo.add_to_group(group.id, ada.id).await;
        (repo, chapter)
    }

    #[tokio::test]
    async fn test_workshop_job_runs_once() {
        let (repo, chapter) = seeded_repo().await;
        let workshop = Workshop {
            id: Uuid::now_v7(),
            chapter_id: chapter.id,
            host_id: None,
            title: "Intro to Rust".to_string(),
            date_and_time: Utc::now(),
            invitable: true,
        };
        repo.insert_workshop(workshop.clone()).await;

        let mut mailer = MockInvitationMailer::new();
        mailer
            .expect_workshop_invite_student()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let processor = InvitationJobProcessor::new(InvitationDispatcher::new(repo.clone(), mailer));

        let job = InvitationJob::workshop_emails(workshop.id, Some("students"));
        let first = processor.process(&job).await.unwrap();
        let again = processor.process(&job).await.unwrap();

        assert_eq!(first, DispatchOutcome::Dispatched(DispatchSummary { invited: 1, skipped: 0 }));
        assert_eq!(again, DispatchOutcome::AlreadyProcessed);
        assert_eq!(repo.workshop_invitations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_event_job_resolves_event_and_chapter() {
        let (repo, chapter) = seeded_repo().await;
        let event = Event {
            id: Uuid::now_v7(),
            name: "Hack night".to_string(),
            date_and_time: Utc::now(),
            audience: Some("Students".to_string()),
            invitable: true,
        };
        repo.insert_event(event.clone()).await;

        let mut mailer = MockInvitationMailer::new();
        mailer
            .expect_event_invite_student()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let processor = InvitationJobProcessor::new(InvitationDispatcher::new(repo.clone(), mailer));

        let outcome = processor
            .process(&InvitationJob::event_emails(event.id, chapter.id))
            .await
            .unwrap();
        assert_eq!(outcome.summary().map(|s| s.invited), Some(1));
    }

    #[tokio::test]
    async fn test_missing_workshop_is_an_error_and_not_retried() {
        let repo = InMemoryInvitationRepository::new();
        let processor =
            InvitationJobProcessor::new(InvitationDispatcher::new(repo, MockInvitationMailer::new()));

        let missing = Uuid::now_v7();
        let job = InvitationJob::workshop_emails(missing, None);

        let result = processor.process(&job).await;
        assert!(matches!(result, Err(InvitationError::WorkshopNotFound(id)) if id == missing));
        assert_eq!(processor.process(&job).await.unwrap(), DispatchOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn test_processed_ids_stay_bounded() {
        let processor = InvitationJobProcessor::with_dedup_capacity(
            InvitationDispatcher::new(InMemoryInvitationRepository::new(), MockInvitationMailer::new()),
            100,
        );

        let jobs: Vec<InvitationJob> = (0..1000)
            .map(|_| InvitationJob::workshop_emails(Uuid::now_v7(), None))
            .collect();
        for job in &jobs {
            let result = processor.process(job).await;
            assert!(matches!(result, Err(InvitationError::WorkshopNotFound(_))));
        }

        assert_eq!(processor.processed.lock().await.len(), 100);

        // The newest ids are still remembered, the oldest were evicted
        let newest = &jobs[999];
        assert_eq!(processor.process(newest).await.unwrap(), DispatchOutcome::AlreadyProcessed);
        assert!(processor.process(&jobs[0]).await.is_err());
        assert_eq!(processor.processed.lock().await.len(), 100);
    }

    #[test]
    fn test_processed_jobs_evicts_oldest_first() {
        let mut processed = ProcessedJobs::new(2);
        let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        assert!(processed.insert(a));
        assert!(processed.insert(b));
        assert!(!processed.insert(a));
        assert!(processed.insert(c));

        assert_eq!(processed.len(), 2);
        assert!(processed.insert(a));
        assert!(!processed.insert(c));
    }

    #[tokio::test]
    async fn test_missing_chapter_is_an_error() {
        let (repo, _) = seeded_repo().await;
        let event = Event {
            id: Uuid::now_v7(),
            name: "Hack night".to_string(),
            date_and_time: Utc::now(),
            audience: None,
            invitable: true,
        };
        repo.insert_event(event.clone()).await;
        let processor =
            InvitationJobProcessor::new(InvitationDispatcher::new(repo, MockInvitationMailer::new()));

        let result = processor
            .process(&InvitationJob::event_emails(event.id, Uuid::now_v7()))
            .await;
        assert!(matches!(result, Err(InvitationError::ChapterNotFound(_))));
    }
}
