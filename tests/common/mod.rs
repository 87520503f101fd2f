#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};

use arena_bot::announce::{self, Announcement, Channel};
use arena_bot::auth::{Actor, Role};
use arena_bot::ledger::ActionId;
use arena_bot::lifecycle::{self, Proposal, ProposalKind};
use arena_bot::model::PlayerProfile;
use arena_bot::{achievements, registry, Config, State};
use arena_core::{MatchFormat, TournamentId};
use chrono::{Duration, Utc};
use tokio::sync::mpsc;

/// Forwards announcements into a channel the test can read back.
pub struct Capture(mpsc::UnboundedSender<Announcement>);

impl Channel for Capture {
    fn publish(&self, announcement: Announcement) {
        let _ = self.0.send(announcement);
    }
}

/// A fresh service on an in-memory database.
pub async fn setup() -> (State, mpsc::UnboundedReceiver<Announcement>) {
    setup_with(Config::default()).await
}

/// Like [`setup`], but keeps everything of `config` except the database
/// location.
pub async fn setup_with(mut config: Config) -> (State, mpsc::UnboundedReceiver<Announcement>) {
    config.database.path = String::from(":memory:");
    // One connection, one in-memory database.
    config.database.max_connections = 1;

    let (tx, rx) = mpsc::unbounded_channel();
    let announcer = announce::spawn(Capture(tx));

    let state = State::new(config, announcer).unwrap();
    state.store.create_tables().await.unwrap();
    achievements::install_defaults(&state).await.unwrap();

    (state, rx)
}

static NEXT_ACTION: AtomicI64 = AtomicI64::new(1);

/// A fresh action id, as the chat adapter would supply per user action.
pub fn action() -> ActionId {
    ActionId(NEXT_ACTION.fetch_add(1, Ordering::Relaxed))
}

pub fn member(id: i64, name: &str) -> Actor {
    Actor::new(PlayerProfile::new(id, name), Role::Member)
}

pub fn manager(id: i64, name: &str) -> Actor {
    Actor::new(PlayerProfile::new(id, name), Role::Manager)
}

pub fn admin(id: i64, name: &str) -> Actor {
    Actor::new(PlayerProfile::new(id, name), Role::Admin)
}

/// An individual-tournament proposal starting half an hour from now.
pub fn proposal(name: &str, capacity: u32, format: MatchFormat) -> Proposal {
    Proposal {
        name: name.to_owned(),
        kind: ProposalKind::Individual { capacity },
        discipline: None,
        rules: None,
        format,
        entry_fee: 0,
        scheduled_at: Utc::now() + Duration::minutes(30),
    }
}

/// Proposes and approves a tournament, returning its id.
pub async fn approved(state: &State, proposal: Proposal) -> TournamentId {
    let moderator = manager(1000, "marshal");

    let id = lifecycle::propose(state, &moderator, action(), proposal)
        .await
        .unwrap();
    lifecycle::approve(state, &moderator, id).await.unwrap();

    id
}

/// Enrolls one player per id, named after it.
pub async fn enroll_players(state: &State, tournament: TournamentId, ids: &[i64]) {
    for id in ids {
        let profile = PlayerProfile::new(*id, format!("player-{}", id));

        registry::enroll_player(state, action(), tournament, &profile)
            .await
            .unwrap();
    }
}

/// Collects everything the announcement dispatcher has delivered so far.
pub async fn drain(rx: &mut mpsc::UnboundedReceiver<Announcement>) -> Vec<Announcement> {
    // Give the dispatcher task a chance to flush its queue.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    let mut out = Vec::new();
    while let Ok(announcement) = rx.try_recv() {
        out.push(announcement);
    }

    out
}
