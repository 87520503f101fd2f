//! Outbound notices about tournament events, for process logging see
//! `logger.rs`.
//!
//! Operations push [`Announcement`]s into a channel; a spawned task forwards
//! them to whatever [`Channel`] the binary wired up. A slow or broken channel
//! never blocks or fails the operation that produced the notice.

use std::collections::{BTreeMap, HashMap, HashSet};

use arena_core::{MatchId, Party, PlayerId, RoundName, TournamentId};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::model::{Match, Tournament};
use crate::store::Store;
use crate::Error;

/// A single outbound notice.
#[derive(Clone, Debug, PartialEq)]
pub enum Announcement {
    /// A new proposal awaits moderation.
    ReviewRequested {
        tournament: TournamentId,
        name: String,
    },
    /// A proposal was approved and is open for enrollment.
    Published {
        tournament: TournamentId,
        name: String,
        scheduled_at: DateTime<Utc>,
    },
    /// A proposal was turned down.
    Rejected {
        tournament: TournamentId,
        name: String,
        reason: String,
    },
    /// The scheduled start is inside the notice lead.
    StartingSoon {
        tournament: TournamentId,
        name: String,
        scheduled_at: DateTime<Utc>,
    },
    /// The bracket was drawn and play begins.
    Started { bracket: BracketView },
    /// A finished round produced the next set of pairings.
    RoundAdvanced {
        tournament: TournamentId,
        name: String,
        round: String,
        pairings: Vec<PairingView>,
    },
    /// A match result was recorded.
    ResultRecorded {
        tournament: TournamentId,
        match_id: MatchId,
        home: String,
        away: String,
        score: (u32, u32),
    },
    /// A series game was recorded and the series continues.
    SeriesScore {
        tournament: TournamentId,
        home: String,
        away: String,
        tally: (u32, u32),
        needed: u32,
    },
    /// A recorded result was undone.
    ResultVoided {
        tournament: TournamentId,
        match_id: MatchId,
    },
    /// The tournament resolved with a champion.
    Completed {
        tournament: TournamentId,
        name: String,
        winner: String,
    },
    /// The tournament was called off.
    Cancelled {
        tournament: TournamentId,
        name: String,
        reason: String,
    },
    /// The scheduled start moved.
    Rescheduled {
        tournament: TournamentId,
        name: String,
        scheduled_at: DateTime<Utc>,
    },
    /// A player earned a catalog achievement.
    AchievementUnlocked { player: PlayerId, name: String },
}

/// Where announcements end up. The binary decides; tests capture them.
pub trait Channel {
    fn publish(&self, announcement: Announcement);
}

/// Publishes announcements to the process log. The default channel.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogChannel;

impl Channel for LogChannel {
    fn publish(&self, announcement: Announcement) {
        log::info!("announcement: {:?}", announcement);
    }
}

pub fn spawn<C>(channel: C) -> Announcer
where
    C: Channel + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(32);

    tokio::task::spawn(async move {
        while let Some(announcement) = rx.recv().await {
            channel.publish(announcement);
        }

        log::debug!("All Announcers dropped, stopping announcements");
    });

    Announcer { tx }
}

#[derive(Clone, Debug)]
pub struct Announcer {
    tx: mpsc::Sender<Announcement>,
}

impl Announcer {
    pub async fn send(&self, announcement: Announcement) {
        let _ = self.tx.send(announcement).await;
    }
}

/// One slot pairing, rendered with display names. `away` is `None` for a
/// bye.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairingView {
    pub home: String,
    pub away: Option<String>,
}

/// One bracket round with its label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundView {
    pub label: String,
    pub pairings: Vec<PairingView>,
}

/// The whole bracket of a tournament, ready for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BracketView {
    pub tournament: TournamentId,
    pub name: String,
    pub rounds: Vec<RoundView>,
}

/// Builds the rendered bracket of the tournament from its stored matches.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn bracket_view(store: &Store, tournament: &Tournament) -> Result<BracketView, Error> {
    let matches = store.matches().list(tournament.id).await?;
    let names = store.party_names(tournament.id).await?;

    Ok(BracketView {
        tournament: tournament.id,
        name: tournament.name.clone(),
        rounds: round_views(&matches, &names),
    })
}

/// Groups matches by round and renders every slot with its display name.
pub fn round_views(matches: &[Match], names: &HashMap<Party, String>) -> Vec<RoundView> {
    let mut by_round: BTreeMap<u32, Vec<&Match>> = BTreeMap::new();
    for m in matches {
        by_round.entry(m.round).or_default().push(m);
    }

    let last = projected_last(matches);

    let mut rounds = Vec::with_capacity(by_round.len());
    for (round, entries) in by_round {
        let mut pairings = Vec::with_capacity(entries.len());
        for m in entries {
            pairings.push(PairingView {
                home: display_slot(names, m.slots[0]),
                away: m.slots[1].map(|party| display_party(names, party)),
            });
        }

        rounds.push(RoundView {
            label: RoundName::new(round, last).to_string(),
            pairings,
        });
    }

    rounds
}

/// Projects the last round of the bracket from the number of distinct
/// parties seeded into round 1.
///
/// The current highest round is no good as "last" while the bracket is
/// still being played; labels would call every fresh round the final.
pub fn projected_last(matches: &[Match]) -> u32 {
    let mut entrants = HashSet::new();
    for m in matches.iter().filter(|m| m.round == 1) {
        for party in m.slots.into_iter().flatten() {
            entrants.insert(party);
        }
    }

    match entrants.len() as u32 {
        0 | 1 => 1,
        n => u32::BITS - (n - 1).leading_zeros(),
    }
}

pub fn display_party(names: &HashMap<Party, String>, party: Party) -> String {
    names
        .get(&party)
        .cloned()
        .unwrap_or_else(|| party.to_string())
}

fn display_slot(names: &HashMap<Party, String>, slot: Option<Party>) -> String {
    match slot {
        Some(party) => display_party(names, party),
        None => String::from("tbd"),
    }
}
