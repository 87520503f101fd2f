mod common;

use arena_bot::announce::Announcement;
use arena_bot::model::TournamentStatus;
use arena_bot::{lifecycle, registry, Error};
use arena_core::MatchFormat;
use chrono::{Duration, Utc};

#[tokio::test]
async fn test_propose_validation() {
    let (state, _rx) = common::setup().await;
    let creator = common::member(1, "dusty");

    let mut proposal = common::proposal("ab", 8, MatchFormat::BestOf1);
    let err = lifecycle::propose(&state, &creator, common::action(), proposal.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    proposal.name = String::from("Noon Shootout");
    proposal.scheduled_at = Utc::now() - Duration::minutes(5);
    let err = lifecycle::propose(&state, &creator, common::action(), proposal.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    proposal.scheduled_at = Utc::now() + Duration::minutes(30);
    proposal.kind = lifecycle::ProposalKind::Individual { capacity: 1 };
    let err = lifecycle::propose(&state, &creator, common::action(), proposal)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_propose_replay_is_rejected() {
    let (state, _rx) = common::setup().await;
    let creator = common::member(1, "dusty");
    let action = common::action();

    let proposal = common::proposal("Noon Shootout", 8, MatchFormat::BestOf1);
    lifecycle::propose(&state, &creator, action, proposal.clone())
        .await
        .unwrap();

    let err = lifecycle::propose(&state, &creator, action, proposal)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate));
}

#[tokio::test]
async fn test_failed_action_frees_its_id() {
    let (state, _rx) = common::setup().await;
    let creator = common::member(1, "dusty");
    let action = common::action();

    let mut proposal = common::proposal("ab", 8, MatchFormat::BestOf1);
    let err = lifecycle::propose(&state, &creator, action, proposal.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // The same action id may retry after a failure.
    proposal.name = String::from("Noon Shootout");
    lifecycle::propose(&state, &creator, action, proposal)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_approve_requires_manager() {
    let (state, _rx) = common::setup().await;
    let creator = common::member(1, "dusty");

    let id = lifecycle::propose(
        &state,
        &creator,
        common::action(),
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await
    .unwrap();

    let err = lifecycle::approve(&state, &creator, id).await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));

    let moderator = common::manager(2, "marshal");
    lifecycle::approve(&state, &moderator, id).await.unwrap();

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert_eq!(tournament.status, TournamentStatus::Approved);
    assert_eq!(tournament.approved_by, Some(moderator.profile.id));

    // Only pending tournaments can be approved.
    let err = lifecycle::approve(&state, &moderator, id).await.unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}

#[tokio::test]
async fn test_reject_closes_enrollment() {
    let (state, mut rx) = common::setup().await;
    let creator = common::member(1, "dusty");
    let moderator = common::manager(2, "marshal");

    let id = lifecycle::propose(
        &state,
        &creator,
        common::action(),
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await
    .unwrap();

    lifecycle::reject(&state, &moderator, id, "duplicate of an existing event")
        .await
        .unwrap();

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert_eq!(tournament.status, TournamentStatus::Rejected);
    assert_eq!(
        tournament.status_reason.as_deref(),
        Some("duplicate of an existing event")
    );

    let profile = arena_bot::model::PlayerProfile::new(3, "latecomer");
    let err = registry::enroll_player(&state, common::action(), id, &profile)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));

    let announcements = common::drain(&mut rx).await;
    assert!(announcements
        .iter()
        .any(|a| matches!(a, Announcement::Rejected { .. })));
}

#[tokio::test]
async fn test_cancel_rules() {
    let (state, _rx) = common::setup().await;
    let moderator = common::manager(2, "marshal");

    let id = common::approved(
        &state,
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await;

    let err = lifecycle::cancel(&state, &moderator, id, "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    lifecycle::cancel(&state, &moderator, id, "venue burned down")
        .await
        .unwrap();

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert_eq!(tournament.status, TournamentStatus::Cancelled);
    assert_eq!(tournament.status_reason.as_deref(), Some("venue burned down"));

    let err = lifecycle::cancel(&state, &moderator, id, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}

#[tokio::test]
async fn test_sweep_cancels_underenrolled_past_due() {
    let (state, mut rx) = common::setup().await;

    let id = common::approved(
        &state,
        common::proposal("Ghost Town Cup", 8, MatchFormat::BestOf1),
    )
    .await;
    common::enroll_players(&state, id, &[10]).await;

    let scheduled = state
        .store
        .tournaments()
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .scheduled_at;

    lifecycle::sweep(&state, scheduled + Duration::seconds(1)).await;

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert_eq!(tournament.status, TournamentStatus::Cancelled);
    assert_eq!(
        tournament.status_reason.as_deref(),
        Some("insufficient participants")
    );
    assert!(state.store.matches().list(id).await.unwrap().is_empty());

    let announcements = common::drain(&mut rx).await;
    assert!(announcements
        .iter()
        .any(|a| matches!(a, Announcement::Cancelled { .. })));
}

#[tokio::test]
async fn test_sweep_cancels_underenrolled_before_start() {
    let (state, _rx) = common::setup().await;

    let id = common::approved(
        &state,
        common::proposal("Ghost Town Cup", 8, MatchFormat::BestOf1),
    )
    .await;
    common::enroll_players(&state, id, &[10]).await;

    let scheduled = state
        .store
        .tournaments()
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .scheduled_at;

    // Half an hour out, inside the one hour cancellation window.
    lifecycle::sweep(&state, scheduled - Duration::minutes(30)).await;

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert_eq!(tournament.status, TournamentStatus::Cancelled);
}

#[tokio::test]
async fn test_sweep_notifies_once() {
    let (state, mut rx) = common::setup().await;

    let id = common::approved(
        &state,
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await;
    common::enroll_players(&state, id, &[10, 11]).await;

    let scheduled = state
        .store
        .tournaments()
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .scheduled_at;
    let now = scheduled - Duration::minutes(10);

    lifecycle::sweep(&state, now).await;
    lifecycle::sweep(&state, now + Duration::minutes(1)).await;

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert!(tournament.notified);
    assert_eq!(tournament.status, TournamentStatus::Approved);

    let announcements = common::drain(&mut rx).await;
    let notices = announcements
        .iter()
        .filter(|a| matches!(a, Announcement::StartingSoon { .. }))
        .count();
    assert_eq!(notices, 1);
}

#[tokio::test]
async fn test_sweep_starts_due_tournament() {
    let (state, mut rx) = common::setup().await;

    let id = common::approved(
        &state,
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await;
    common::enroll_players(&state, id, &[10, 11]).await;

    let scheduled = state
        .store
        .tournaments()
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .scheduled_at;

    lifecycle::sweep(&state, scheduled + Duration::seconds(1)).await;

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert_eq!(tournament.status, TournamentStatus::InProgress);
    assert!(tournament.started);

    let matches = state.store.matches().list(id).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].round, 1);

    let announcements = common::drain(&mut rx).await;
    assert!(announcements
        .iter()
        .any(|a| matches!(a, Announcement::Started { .. })));
}

#[tokio::test]
async fn test_reschedule_rearms_notification() {
    let (state, mut rx) = common::setup().await;
    let moderator = common::manager(2, "marshal");

    let id = common::approved(
        &state,
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await;
    common::enroll_players(&state, id, &[10, 11]).await;

    let scheduled = state
        .store
        .tournaments()
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .scheduled_at;

    lifecycle::sweep(&state, scheduled - Duration::minutes(10)).await;
    assert!(
        state
            .store
            .tournaments()
            .get(id)
            .await
            .unwrap()
            .unwrap()
            .notified
    );

    let moved = scheduled + Duration::hours(2);
    lifecycle::reschedule(&state, &moderator, id, moved)
        .await
        .unwrap();

    let tournament = state.store.tournaments().get(id).await.unwrap().unwrap();
    assert!(!tournament.notified);
    assert_eq!(tournament.scheduled_at, moved);

    // The notice fires again for the new start.
    lifecycle::sweep(&state, moved - Duration::minutes(10)).await;

    let announcements = common::drain(&mut rx).await;
    let notices = announcements
        .iter()
        .filter(|a| matches!(a, Announcement::StartingSoon { .. }))
        .count();
    assert_eq!(notices, 2);
}

#[tokio::test]
async fn test_reschedule_rejects_started() {
    let (state, _rx) = common::setup().await;
    let moderator = common::manager(2, "marshal");

    let id = common::approved(
        &state,
        common::proposal("Noon Shootout", 8, MatchFormat::BestOf1),
    )
    .await;
    common::enroll_players(&state, id, &[10, 11]).await;

    lifecycle::next_match(&state, &moderator, common::action(), id)
        .await
        .unwrap();

    let err = lifecycle::reschedule(&state, &moderator, id, Utc::now() + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}
