//! Pairing parties into rounds and advancing winners.
//!
//! The bracket is single elimination: parties are paired consecutively in
//! the order the caller supplies (callers shuffle ahead of seeding), a
//! trailing unpaired party receives a bye, and the winners of a finished
//! round pair again until one champion remains.
//!
//! A tournament with exactly two parties and a multi-game format skips the
//! bracket entirely and plays a fixed series of single games instead; see
//! [`SeedPlan::Series`].

use std::fmt::{self, Display, Formatter};

use crate::format::MatchFormat;
use crate::resolve::{judge, Outcome, Side};
use crate::{Error, Party, Result};

/// A pairing for one match of a round.
///
/// `away` is `None` when the home party received a bye.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pair {
    pub home: Party,
    pub away: Option<Party>,
}

impl Pair {
    /// Returns `true` if the pairing is a bye.
    #[inline]
    pub fn is_bye(&self) -> bool {
        self.away.is_none()
    }
}

/// The plan for the opening round of a tournament.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedPlan {
    /// One match per consecutive pair, byes included.
    Bracket(Vec<Pair>),
    /// Two parties play a fixed series of `games` single games, all of them
    /// part of round 1.
    Series {
        home: Party,
        away: Party,
        games: u32,
    },
}

/// Builds the opening round from the enrolled parties.
///
/// The parties are paired in the order given; shuffle before calling to
/// avoid deterministic seeding. Exactly two parties with a multi-game
/// format become a [`SeedPlan::Series`].
///
/// # Errors
///
/// Returns [`Error::NotEnoughParties`] if fewer than two parties enrolled.
pub fn seed(parties: &[Party], format: MatchFormat) -> Result<SeedPlan> {
    if parties.len() < 2 {
        return Err(Error::NotEnoughParties(parties.len()));
    }

    if parties.len() == 2 && format.is_series() {
        return Ok(SeedPlan::Series {
            home: parties[0],
            away: parties[1],
            games: format.series_len(),
        });
    }

    Ok(SeedPlan::Bracket(pair_up(parties)))
}

/// Pairs parties consecutively, giving a trailing unpaired party a bye.
fn pair_up(parties: &[Party]) -> Vec<Pair> {
    let mut pairs = Vec::with_capacity((parties.len() + 1) / 2);

    for chunk in parties.chunks(2) {
        match *chunk {
            [home, away] => pairs.push(Pair {
                home,
                away: Some(away),
            }),
            [home] => {
                log::info!("{} is unpaired and receives a bye", home);

                pairs.push(Pair { home, away: None });
            }
            _ => unreachable!(),
        }
    }

    pairs
}

/// One match of a round, as needed to advance past it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RoundMatch {
    /// The parties in the two slots. A single occupied slot is a bye.
    pub slots: [Option<Party>; 2],
    pub score: Option<(u32, u32)>,
    pub completed: bool,
}

impl RoundMatch {
    /// Returns `true` if this match is a bye record.
    #[inline]
    pub fn is_bye(&self) -> bool {
        matches!(self.slots, [Some(_), None] | [None, Some(_)])
    }

    /// Returns the winner of the match under `format`.
    ///
    /// A bye record always yields its occupied slot. A contested match
    /// yields the decisive side of its score, or `None` when no score was
    /// reported or the score is undecided.
    pub fn winner(&self, format: MatchFormat) -> Option<Party> {
        match self.slots {
            [Some(party), None] | [None, Some(party)] => Some(party),
            [Some(home), Some(away)] => {
                let (a, b) = self.score?;

                match judge(format, a, b) {
                    Outcome::Decisive(Side::Home) => Some(home),
                    Outcome::Decisive(Side::Away) => Some(away),
                    Outcome::Undecided => None,
                }
            }
            [None, None] => None,
        }
    }
}

/// The transition out of a finished round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// The next round, paired from the winners.
    NextRound(Vec<Pair>),
    /// A single winner remains; the tournament is decided.
    Complete(Party),
    /// No match of the round produced a winner.
    NoWinners,
}

/// Advances past a finished round, pairing its winners into the next one.
///
/// Byes count as winners. With exactly one winner the tournament is
/// complete; with none there is nothing to pair and the round has to be
/// corrected first.
///
/// # Errors
///
/// Returns [`Error::UnfinishedMatches`] if any match of the round is not
/// completed yet.
pub fn advance(round: &[RoundMatch], format: MatchFormat) -> Result<Advance> {
    let unfinished = round.iter().filter(|m| !m.completed).count();
    if unfinished > 0 {
        return Err(Error::UnfinishedMatches(unfinished));
    }

    let winners: Vec<Party> = round.iter().filter_map(|m| m.winner(format)).collect();

    match winners.len() {
        0 => Ok(Advance::NoWinners),
        1 => Ok(Advance::Complete(winners[0])),
        _ => Ok(Advance::NextRound(pair_up(&winners))),
    }
}

/// The display label of a round.
///
/// Display only, never load-bearing: the last round is the final, the two
/// rounds before it are semifinal and quarterfinal, everything earlier is
/// numbered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoundName {
    Final,
    Semifinal,
    Quarterfinal,
    Number(u32),
}

impl RoundName {
    /// Returns the label of `round` in a tournament whose highest round is
    /// `last`.
    pub fn new(round: u32, last: u32) -> Self {
        if round >= last {
            return Self::Final;
        }

        match last - round {
            1 => Self::Semifinal,
            2 => Self::Quarterfinal,
            _ => Self::Number(round),
        }
    }
}

impl Display for RoundName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Final => f.write_str("final"),
            Self::Semifinal => f.write_str("semifinal"),
            Self::Quarterfinal => f.write_str("quarterfinal"),
            Self::Number(n) => write!(f, "round {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{advance, seed, Advance, Pair, RoundMatch, RoundName, SeedPlan};
    use crate::format::MatchFormat;
    use crate::{Error, Party, PlayerId};

    fn players(n: i64) -> Vec<Party> {
        (1..=n).map(|id| Party::Player(PlayerId(id))).collect()
    }

    fn finished(home: i64, away: i64, score: (u32, u32)) -> RoundMatch {
        RoundMatch {
            slots: [
                Some(Party::Player(PlayerId(home))),
                Some(Party::Player(PlayerId(away))),
            ],
            score: Some(score),
            completed: true,
        }
    }

    fn bye(home: i64) -> RoundMatch {
        RoundMatch {
            slots: [Some(Party::Player(PlayerId(home))), None],
            score: None,
            completed: true,
        }
    }

    #[test]
    fn test_seed_even() {
        let parties = players(4);

        match seed(&parties, MatchFormat::BestOf1).unwrap() {
            SeedPlan::Bracket(pairs) => {
                assert_eq!(
                    pairs,
                    vec![
                        Pair {
                            home: parties[0],
                            away: Some(parties[1]),
                        },
                        Pair {
                            home: parties[2],
                            away: Some(parties[3]),
                        },
                    ]
                );
            }
            plan => panic!("expected a bracket plan, got {:?}", plan),
        }
    }

    #[test]
    fn test_seed_odd_gets_bye() {
        let parties = players(5);

        match seed(&parties, MatchFormat::BestOf1).unwrap() {
            SeedPlan::Bracket(pairs) => {
                assert_eq!(pairs.len(), 3);
                assert!(pairs[2].is_bye());
                assert_eq!(pairs[2].home, parties[4]);
            }
            plan => panic!("expected a bracket plan, got {:?}", plan),
        }
    }

    #[test]
    fn test_seed_too_few() {
        assert_eq!(
            seed(&players(1), MatchFormat::BestOf1),
            Err(Error::NotEnoughParties(1))
        );
        assert_eq!(
            seed(&[], MatchFormat::BestOf3),
            Err(Error::NotEnoughParties(0))
        );
    }

    #[test]
    fn test_seed_duel_series() {
        let parties = players(2);

        assert_eq!(
            seed(&parties, MatchFormat::BestOf3).unwrap(),
            SeedPlan::Series {
                home: parties[0],
                away: parties[1],
                games: 3,
            }
        );

        assert_eq!(
            seed(&parties, MatchFormat::BestOf7).unwrap(),
            SeedPlan::Series {
                home: parties[0],
                away: parties[1],
                games: 7,
            }
        );

        // Two parties under BO1 are a regular one-match bracket.
        assert_eq!(
            seed(&parties, MatchFormat::BestOf1).unwrap(),
            SeedPlan::Bracket(vec![Pair {
                home: parties[0],
                away: Some(parties[1]),
            }])
        );
    }

    #[test]
    fn test_advance_blocked_on_unfinished() {
        let round = [
            finished(1, 2, (1, 0)),
            RoundMatch {
                slots: [
                    Some(Party::Player(PlayerId(3))),
                    Some(Party::Player(PlayerId(4))),
                ],
                score: None,
                completed: false,
            },
        ];

        assert_eq!(
            advance(&round, MatchFormat::BestOf1),
            Err(Error::UnfinishedMatches(1))
        );
    }

    #[test]
    fn test_advance_pairs_winners() {
        let round = [finished(1, 2, (13, 7)), finished(3, 4, (2, 16))];

        match advance(&round, MatchFormat::BestOf1).unwrap() {
            Advance::NextRound(pairs) => {
                assert_eq!(
                    pairs,
                    vec![Pair {
                        home: Party::Player(PlayerId(1)),
                        away: Some(Party::Player(PlayerId(4))),
                    }]
                );
            }
            outcome => panic!("expected a next round, got {:?}", outcome),
        }
    }

    #[test]
    fn test_advance_single_winner_completes() {
        let round = [finished(1, 2, (0, 3))];

        assert_eq!(
            advance(&round, MatchFormat::BestOf1).unwrap(),
            Advance::Complete(Party::Player(PlayerId(2)))
        );
    }

    #[test]
    fn test_advance_counts_byes_as_winners() {
        let round = [finished(1, 2, (1, 0)), bye(3)];

        match advance(&round, MatchFormat::BestOf1).unwrap() {
            Advance::NextRound(pairs) => {
                assert_eq!(
                    pairs,
                    vec![Pair {
                        home: Party::Player(PlayerId(1)),
                        away: Some(Party::Player(PlayerId(3))),
                    }]
                );
            }
            outcome => panic!("expected a next round, got {:?}", outcome),
        }
    }

    #[test]
    fn test_advance_odd_winners_gets_bye() {
        let round = [
            finished(1, 2, (1, 0)),
            finished(3, 4, (1, 0)),
            finished(5, 6, (1, 0)),
        ];

        match advance(&round, MatchFormat::BestOf1).unwrap() {
            Advance::NextRound(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert!(!pairs[0].is_bye());
                assert!(pairs[1].is_bye());
                assert_eq!(pairs[1].home, Party::Player(PlayerId(5)));
            }
            outcome => panic!("expected a next round, got {:?}", outcome),
        }
    }

    #[test]
    fn test_advance_no_winners() {
        // Ties everywhere leave nothing to pair.
        let round = [finished(1, 2, (3, 3)), finished(3, 4, (0, 0))];

        assert_eq!(
            advance(&round, MatchFormat::BestOf1).unwrap(),
            Advance::NoWinners
        );
    }

    #[test]
    fn test_advance_undecided_multi_game_score() {
        // Under BO5 a 2:1 lead is not decisive; the second match carries the
        // round alone.
        let round = [finished(1, 2, (2, 1)), finished(3, 4, (3, 0))];

        assert_eq!(
            advance(&round, MatchFormat::BestOf5).unwrap(),
            Advance::Complete(Party::Player(PlayerId(3)))
        );
    }

    #[test]
    fn test_round_names() {
        assert_eq!(RoundName::new(1, 1), RoundName::Final);
        assert_eq!(RoundName::new(2, 2), RoundName::Final);
        assert_eq!(RoundName::new(1, 2), RoundName::Semifinal);
        assert_eq!(RoundName::new(2, 4), RoundName::Quarterfinal);
        assert_eq!(RoundName::new(1, 4), RoundName::Number(1));

        assert_eq!(RoundName::Final.to_string(), "final");
        assert_eq!(RoundName::Number(3).to_string(), "round 3");
    }
}
