//! Integration tests for the PostgreSQL session store.
//!
//! Exercises the constraints the real-time layer relies on:
//! - Room code uniqueness
//! - Idempotent participant insertion
//! - Gapless round numbering and one active round per topic
//! - One vote per (round, user)

use assert_matches::assert_matches;
use planpoker_core::planning::SessionStatus;
use planpoker_core::roles::{MANAGING_ROLES, PROJECT_ROLE_MEMBER, PROJECT_ROLE_PRODUCT_MANAGER};
use planpoker_db::models::planning_session::CreatePlanningSession;
use planpoker_db::models::project::CreateProject;
use planpoker_db::models::topic::CreateTopic;
use planpoker_db::models::user::{CreateUser, User};
use planpoker_db::repositories::{
    ParticipantRepo, PlanningSessionRepo, ProjectMemberRepo, ProjectRepo, TopicRepo, UserRepo,
};
use planpoker_db::store::constraints;
use planpoker_db::{PgSessionStore, SessionStore, StoreError};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, name: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            role: "user".to_string(),
        },
    )
    .await
    .unwrap()
}

fn new_session(project_id: i64, created_by: i64, room_code: &str) -> CreatePlanningSession {
    CreatePlanningSession {
        title: "Sprint planning".to_string(),
        project_id,
        created_by,
        room_code: room_code.to_string(),
        metrics: None,
        status_id: SessionStatus::Draft.id(),
        allow_chat: true,
        allow_emoticons: true,
        notify_email: false,
        scheduled_at: None,
    }
}

fn new_topic(title: &str, order_index: i32) -> CreateTopic {
    CreateTopic {
        title: title.to_string(),
        description: None,
        parent_id: None,
        order_index,
    }
}

/// Project, owner, session and one topic. Returns (session_id, topic_id, owner).
async fn seed_session(pool: &PgPool) -> (i64, i64, User) {
    let owner = seed_user(pool, "Olive").await;
    let project = ProjectRepo::create(
        pool,
        &CreateProject {
            name: "Checkout".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    let session = PlanningSessionRepo::create_with_members(
        pool,
        &new_session(project.id, owner.id, "ABC123"),
        &[new_topic("Payment form", 0)],
        &[],
    )
    .await
    .unwrap();
    let topics = TopicRepo::list_for_session(pool, session.id).await.unwrap();
    (session.id, topics[0].id, owner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn room_code_is_unique(pool: PgPool) {
    let (session_id, _, owner) = seed_session(&pool).await;
    let session = PlanningSessionRepo::find_by_id(&pool, session_id)
        .await
        .unwrap()
        .unwrap();

    let err = PlanningSessionRepo::create(&pool, &new_session(session.project_id, owner.id, "ABC123"))
        .await
        .unwrap_err();
    assert!(StoreError::from(err).is_conflict_on(constraints::ROOM_CODE));
    assert!(PlanningSessionRepo::room_code_exists(&pool, "ABC123").await.unwrap());
    assert!(!PlanningSessionRepo::room_code_exists(&pool, "ZZZ999").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn participants_are_added_once(pool: PgPool) {
    let (session_id, _, owner) = seed_session(&pool).await;
    let store = PgSessionStore::new(pool.clone());

    assert!(store.add_participant(session_id, owner.id).await.unwrap());
    assert!(!store.add_participant(session_id, owner.id).await.unwrap());
    assert_eq!(store.count_participants(session_id).await.unwrap(), 1);

    let participants = store.list_participants(session_id).await.unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].name, "Olive");
}

#[sqlx::test(migrations = "./migrations")]
async fn rounds_are_numbered_without_gaps(pool: PgPool) {
    let (session_id, topic_id, _) = seed_session(&pool).await;
    let store = PgSessionStore::new(pool.clone());

    let first = store.create_round(session_id, topic_id).await.unwrap();
    assert_eq!(first.round_number, 1);
    assert!(first.is_active());

    let err = store.create_round(session_id, topic_id).await.unwrap_err();
    assert_matches!(err, StoreError::Conflict { .. });

    let done = store.complete_round(first.id, Some("5")).await.unwrap().unwrap();
    assert_eq!(done.final_score.as_deref(), Some("5"));
    assert!(done.ended_at.is_some());
    assert!(store.complete_round(first.id, None).await.unwrap().is_none());

    let second = store.create_round(session_id, topic_id).await.unwrap();
    assert_eq!(second.round_number, 2);
    assert_eq!(
        store.get_active_round_for_topic(topic_id).await.unwrap().map(|r| r.id),
        Some(second.id)
    );
    assert_eq!(
        store.get_active_round_for_session(session_id).await.unwrap().map(|r| r.id),
        Some(second.id)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_round_starts_yield_one_winner(pool: PgPool) {
    let (session_id, topic_id, _) = seed_session(&pool).await;
    let store = PgSessionStore::new(pool.clone());

    let (a, b) = tokio::join!(
        store.create_round(session_id, topic_id),
        store.create_round(session_id, topic_id)
    );
    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let loser = if a.is_err() { a } else { b };
    assert_matches!(loser, Err(StoreError::Conflict { .. }));

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM voting_rounds WHERE topic_id = $1")
        .bind(topic_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_vote_keeps_first_score(pool: PgPool) {
    let (session_id, topic_id, owner) = seed_session(&pool).await;
    let store = PgSessionStore::new(pool.clone());
    let round = store.create_round(session_id, topic_id).await.unwrap();

    store.insert_vote(round.id, owner.id, "8").await.unwrap().unwrap();
    let err = store.insert_vote(round.id, owner.id, "3").await.unwrap_err();
    assert!(err.is_conflict_on(constraints::VOTE));

    let vote = store.get_vote(round.id, owner.id).await.unwrap().unwrap();
    assert_eq!(vote.score, "8");

    let votes = store.list_votes_for_round(round.id).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].name, "Olive");

    store.complete_round(round.id, Some("8")).await.unwrap();
    let late = seed_user(&pool, "Late").await;
    assert!(store.insert_vote(round.id, late.id, "5").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_votes_yield_one_row(pool: PgPool) {
    let (session_id, topic_id, owner) = seed_session(&pool).await;
    let store = PgSessionStore::new(pool.clone());
    let round = store.create_round(session_id, topic_id).await.unwrap();

    let (a, b) = tokio::join!(
        store.insert_vote(round.id, owner.id, "5"),
        store.insert_vote(round.id, owner.id, "13")
    );
    let stored = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Ok(Some(_))))
        .count();
    assert_eq!(stored, 1);
    let loser = if matches!(a, Ok(Some(_))) { b } else { a };
    assert!(loser.unwrap_err().is_conflict_on(constraints::VOTE));
    assert_eq!(store.list_votes_for_round(round.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn project_role_check_follows_session_project(pool: PgPool) {
    let (session_id, _, owner) = seed_session(&pool).await;
    let member = seed_user(&pool, "Max").await;
    let session = PlanningSessionRepo::find_by_id(&pool, session_id)
        .await
        .unwrap()
        .unwrap();
    ProjectMemberRepo::upsert(&pool, session.project_id, owner.id, PROJECT_ROLE_PRODUCT_MANAGER)
        .await
        .unwrap();
    ProjectMemberRepo::upsert(&pool, session.project_id, member.id, PROJECT_ROLE_MEMBER)
        .await
        .unwrap();

    let store = PgSessionStore::new(pool.clone());
    assert!(store.has_project_role(session_id, owner.id, MANAGING_ROLES).await.unwrap());
    assert!(!store.has_project_role(session_id, member.id, MANAGING_ROLES).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn session_transitions_are_conditional(pool: PgPool) {
    let (session_id, _, _) = seed_session(&pool).await;

    let started = PlanningSessionRepo::transition(
        &pool,
        session_id,
        &[SessionStatus::Draft, SessionStatus::Scheduled],
        SessionStatus::Active,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(started.status(), SessionStatus::Active);
    assert!(started.started_at.is_some());

    let again = PlanningSessionRepo::transition(
        &pool,
        session_id,
        &[SessionStatus::Draft, SessionStatus::Scheduled],
        SessionStatus::Active,
    )
    .await
    .unwrap();
    assert!(again.is_none());

    let ended = PlanningSessionRepo::transition(
        &pool,
        session_id,
        &[SessionStatus::Active],
        SessionStatus::Completed,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(ended.status(), SessionStatus::Completed);
    assert!(ended.ended_at.is_some());
}

// ---------------------------------------------------------------------------
// Tests: session creation is all-or-nothing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_with_members_writes_topics_and_participants(pool: PgPool) {
    let (session_id, _, owner) = seed_session(&pool).await;
    let project_id = PlanningSessionRepo::find_by_id(&pool, session_id)
        .await
        .unwrap()
        .unwrap()
        .project_id;
    let guest = seed_user(&pool, "Gus").await;

    let session = PlanningSessionRepo::create_with_members(
        &pool,
        &new_session(project_id, owner.id, "TXN234"),
        &[new_topic("Cart", 0), new_topic("Refunds", 1)],
        &[owner.id, guest.id, owner.id],
    )
    .await
    .unwrap();

    let topics = TopicRepo::list_for_session(&pool, session.id).await.unwrap();
    let titles: Vec<_> = topics.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Cart", "Refunds"]);
    assert_eq!(ParticipantRepo::count_for_session(&pool, session.id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_participant_insert_rolls_back_the_session(pool: PgPool) {
    let (session_id, _, owner) = seed_session(&pool).await;
    let project_id = PlanningSessionRepo::find_by_id(&pool, session_id)
        .await
        .unwrap()
        .unwrap()
        .project_id;

    // No such user: the participant foreign key rejects the last write.
    let result = PlanningSessionRepo::create_with_members(
        &pool,
        &new_session(project_id, owner.id, "RBK234"),
        &[new_topic("Orphan", 0)],
        &[owner.id, 999_999],
    )
    .await;

    assert!(result.is_err());
    assert!(!PlanningSessionRepo::room_code_exists(&pool, "RBK234").await.unwrap());
    let topic_rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics WHERE title = 'Orphan'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(topic_rows.0, 0);
}
