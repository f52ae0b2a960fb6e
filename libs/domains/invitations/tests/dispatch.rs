//! End-to-end dispatch over the in-memory repository and a recording provider.

use chrono::{Duration, TimeZone, Utc};
use domain_invitations::{
    Chapter, DispatchOutcome, DispatchSummary, Event, Group, GroupKind, InMemoryInvitationRepository,
    InvitationDispatcher, InvitationJobProcessor, JobQueue, LocalJobQueue, MailerConfig, Member,
    PromotionSummary, RecordingProvider, Role, Sponsor, TemplateEngine, TemplateMailer,
    WaitingListEntry, Workshop, WorkshopInvitation,
};
use uuid::Uuid;

type Dispatcher = InvitationDispatcher<InMemoryInvitationRepository, TemplateMailer<RecordingProvider>>;

struct Harness {
    repo: InMemoryInvitationRepository,
    provider: RecordingProvider,
    dispatcher: Dispatcher,
    chapter: Chapter,
    students: Group,
    coaches: Group,
}

impl Harness {
    async fn new() -> Self {
        let repo = InMemoryInvitationRepository::new();
        let provider = RecordingProvider::new();
        let mailer = TemplateMailer::new(
            provider.clone(),
            TemplateEngine::new().unwrap(),
            MailerConfig::new("https://workshops.example.com"),
        );
        let dispatcher = InvitationDispatcher::new(repo.clone(), mailer).with_rng_seed(1);

        let chapter = Chapter {
            id: Uuid::now_v7(),
            name: "Manchester".to_string(),
            email: "manchester@example.com".to_string(),
        };
        let students = Group { id: Uuid::now_v7(), chapter_id: chapter.id, kind: GroupKind::Students };
        let coaches = Group { id: Uuid::now_v7(), chapter_id: chapter.id, kind: GroupKind::Coaches };
        repo.insert_chapter(chapter.clone()).await;
        repo.insert_group(students.clone()).await;
        repo.insert_group(coaches.clone()).await;

        Self { repo, provider, dispatcher, chapter, students, coaches }
    }

    async fn member(&self, name: &str, group: &Group, banned: bool) -> Member {
        let member = Member {
            id: Uuid::now_v7(),
            name: name.to_string(),
            surname: "Example".to_string(),
            email: format!("{}@example.com", name),
            banned,
        };
        self.repo.insert_member(member.clone()).await;
        self.repo.add_to_group(group.id, member.id).await;
        member
    }

    async fn workshop(&self, host: Option<&Sponsor>) -> Workshop {
        let workshop = Workshop {
            id: Uuid::now_v7(),
            chapter_id: self.chapter.id,
            host_id: host.map(|h| h.id),
            title: "Build a website".to_string(),
            date_and_time: Utc.with_ymd_and_hms(2026, 11, 10, 18, 30, 0).unwrap(),
            invitable: true,
        };
        self.repo.insert_workshop(workshop.clone()).await;
        workshop
    }

    async fn invitation(
        &self,
        workshop: &Workshop,
        member: &Member,
        role: Role,
        attending: Option<bool>,
    ) -> WorkshopInvitation {
        let invitation = WorkshopInvitation {
            id: Uuid::now_v7(),
            workshop_id: workshop.id,
            member_id: member.id,
            role,
            attending,
            token: format!("token-{}", member.name),
            reminded_at: None,
            created_at: Utc::now(),
        };
        self.repo.insert_workshop_invitation(invitation.clone()).await;
        invitation
    }

    async fn attending(&self, workshop: &Workshop, member: &Member, role: Role) -> WorkshopInvitation {
        self.invitation(workshop, member, role, Some(true)).await
    }

    async fn waiting(&self, workshop: &Workshop, member: &Member, role: Role, minutes_ago: i64) {
        let invitation = self.invitation(workshop, member, role, None).await;
        self.repo
            .insert_waiting_list_entry(WaitingListEntry {
                id: Uuid::now_v7(),
                invitation_id: invitation.id,
                auto_rsvp: false,
                created_at: Utc::now() - Duration::minutes(minutes_ago),
            })
            .await;
    }
}

#[tokio::test]
async fn coaches_only_dispatch_skips_banned_coach() {
    let h = Harness::new().await;
    h.member("grace", &h.coaches, false).await;
    h.member("mallory", &h.coaches, true).await;
    h.member("ada", &h.students, false).await;
    let workshop = h.workshop(None).await;

    let outcome = h
        .dispatcher
        .send_workshop_emails(&workshop, Some("coaches"))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Dispatched(DispatchSummary { invited: 1, skipped: 0 }));

    let invitations = h.repo.workshop_invitations().await;
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].role, Role::Coach);

    let sent = h.provider.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "grace@example.com");
    assert!(sent[0].subject.starts_with("Workshop Coach Invitation"));
    assert!(sent[0].text_body.contains(&format!(
        "https://workshops.example.com/invitation/{}",
        invitations[0].token
    )));
}

#[tokio::test]
async fn everyone_dispatch_emails_each_saved_invitation() {
    let h = Harness::new().await;
    h.member("ada", &h.students, false).await;
    let bob = h.member("bob", &h.students, false).await;
    h.member("grace", &h.coaches, false).await;
    h.repo.reject_invitations_for(bob.id).await;
    let workshop = h.workshop(None).await;

    let outcome = h.dispatcher.send_workshop_emails(&workshop, None).await.unwrap();

    assert_eq!(outcome.summary(), Some(DispatchSummary { invited: 2, skipped: 1 }));
    assert_eq!(h.provider.sent_count().await, 2);
    assert!(!h.provider.was_sent_to("bob@example.com").await);
}

#[tokio::test]
async fn event_dispatch_follows_event_audience() {
    let h = Harness::new().await;
    h.member("ada", &h.students, false).await;
    h.member("grace", &h.coaches, false).await;
    let event = Event {
        id: Uuid::now_v7(),
        name: "Summer Social".to_string(),
        date_and_time: Utc::now() + Duration::days(10),
        audience: Some("Coaches".to_string()),
        invitable: true,
    };

    h.dispatcher.send_event_emails(&event, &h.chapter).await.unwrap();

    let invitations = h.repo.event_invitations().await;
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].role, Role::Coach);
    let sent = h.provider.sent().await;
    assert_eq!(sent[0].subject, "Coach Invitation: Summer Social");
    assert!(sent[0].text_body.contains("/events/invitation/"));
}

#[tokio::test]
async fn attendance_reminders_are_sent_once() {
    let h = Harness::new().await;
    let ada = h.member("ada", &h.students, false).await;
    let grace = h.member("grace", &h.coaches, false).await;
    let workshop = h.workshop(None).await;
    h.attending(&workshop, &ada, Role::Student).await;
    h.attending(&workshop, &grace, Role::Coach).await;

    assert_eq!(h.dispatcher.send_workshop_attendance_reminders(&workshop).await.unwrap(), 2);
    assert_eq!(h.dispatcher.send_workshop_attendance_reminders(&workshop).await.unwrap(), 0);

    assert_eq!(h.provider.sent_count().await, 2);
    assert!(h
        .repo
        .workshop_invitations()
        .await
        .iter()
        .all(|i| i.reminded_at.is_some()));
}

#[tokio::test]
async fn waiting_list_promotion_respects_capacity() {
    let h = Harness::new().await;
    let host = Sponsor {
        id: Uuid::now_v7(),
        name: "Acme".to_string(),
        address: "1 Main Street".to_string(),
        seats: 1,
        coach_spots: 2,
    };
    h.repo.insert_sponsor(host.clone()).await;
    let workshop = h.workshop(Some(&host)).await;

    let grace = h.member("grace", &h.coaches, false).await;
    let linus = h.member("linus", &h.coaches, false).await;
    let ada = h.member("ada", &h.students, false).await;
    let bob = h.member("bob", &h.students, false).await;
    h.attending(&workshop, &grace, Role::Coach).await;
    h.attending(&workshop, &ada, Role::Student).await;
    h.waiting(&workshop, &linus, Role::Coach, 5).await;
    h.waiting(&workshop, &bob, Role::Student, 10).await;

    let summary = h.dispatcher.send_waiting_list_emails(&workshop).await.unwrap();

    // One coach spot is free; every seat is taken.
    assert_eq!(summary, PromotionSummary { coaches: 1, students: 0 });
    assert!(h.provider.was_sent_to("linus@example.com").await);
    assert!(!h.provider.was_sent_to("bob@example.com").await);
    assert_eq!(h.repo.waiting_list_entries().await.len(), 1);
}

#[tokio::test]
async fn local_queue_dispatches_in_background() {
    let h = Harness::new().await;
    h.member("ada", &h.students, false).await;
    let workshop = h.workshop(None).await;

    let processor = InvitationJobProcessor::new(h.dispatcher.clone());
    let (queue, handle) = LocalJobQueue::spawn(processor);
    queue
        .enqueue_workshop_emails(workshop.id, Some("students"))
        .await
        .unwrap();
    drop(queue);
    handle.await.unwrap();

    assert_eq!(h.repo.workshop_invitations().await.len(), 1);
    assert!(h.provider.was_sent_to("ada@example.com").await);
}
