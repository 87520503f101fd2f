//! Judging submitted scores.
//!
//! A score pair is judged under one rule for every format: equal scores are
//! never decisive, and the leading side takes the match once its score
//! reaches the win count the format requires. Under [`MatchFormat::BestOf1`]
//! that makes any unequal pair decisive.
//!
//! Duel series are different: each match is a single game won by plain score
//! comparison, and [`SeriesTally`] tracks game wins across the whole series
//! until one side reaches the required count.

use crate::format::MatchFormat;
use crate::{Error, Result};

/// One of the two sides of a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// The judgement of a single submitted score pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// One side has won the match.
    Decisive(Side),
    /// The scores do not decide the match.
    Undecided,
}

impl Outcome {
    /// Returns the winning side, if any.
    #[inline]
    pub fn winner(self) -> Option<Side> {
        match self {
            Self::Decisive(side) => Some(side),
            Self::Undecided => None,
        }
    }
}

/// Parses a score submitted as free text.
///
/// # Errors
///
/// Returns [`Error::InvalidScore`] if the input is not a non-negative
/// integer.
pub fn parse_score(input: &str) -> Result<u32> {
    let trimmed = input.trim();

    match trimmed.parse::<i64>() {
        Ok(value) if (0..=u32::MAX as i64).contains(&value) => Ok(value as u32),
        _ => Err(Error::InvalidScore(trimmed.to_owned())),
    }
}

/// Judges a score pair under `format`.
///
/// Equal scores are always [`Undecided`]. Unequal scores are
/// [`Decisive`] once the leader has at least [`wins_needed`] wins.
///
/// [`Undecided`]: Outcome::Undecided
/// [`Decisive`]: Outcome::Decisive
/// [`wins_needed`]: MatchFormat::wins_needed
pub fn judge(format: MatchFormat, home: u32, away: u32) -> Outcome {
    if home == away {
        return Outcome::Undecided;
    }

    let (lead, side) = if home > away {
        (home, Side::Home)
    } else {
        (away, Side::Away)
    };

    if lead >= format.wins_needed() {
        Outcome::Decisive(side)
    } else {
        Outcome::Undecided
    }
}

/// Returns the winner of a single series game by plain score comparison.
///
/// A drawn game has no winner and scores nothing in the series.
#[inline]
pub fn game_point(home: u32, away: u32) -> Option<Side> {
    match home.cmp(&away) {
        std::cmp::Ordering::Greater => Some(Side::Home),
        std::cmp::Ordering::Less => Some(Side::Away),
        std::cmp::Ordering::Equal => None,
    }
}

/// The running game-win tally of a two-party series.
///
/// The tally is rebuilt from all completed games of the series every time a
/// result arrives, so a late submission for an earlier game can still end
/// the series retroactively.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SeriesTally {
    needed: u32,
    home: u32,
    away: u32,
}

impl SeriesTally {
    /// Creates an empty tally for a series of the given `format`.
    pub fn new(format: MatchFormat) -> Self {
        Self {
            needed: format.wins_needed(),
            home: 0,
            away: 0,
        }
    }

    /// Records a game win for `side`.
    pub fn record(&mut self, side: Side) {
        match side {
            Side::Home => self.home += 1,
            Side::Away => self.away += 1,
        }
    }

    /// Records a completed game by its score pair. Drawn games score nothing.
    pub fn record_game(&mut self, home: u32, away: u32) {
        if let Some(side) = game_point(home, away) {
            self.record(side);
        }
    }

    /// Returns the number of game wins `side` holds.
    #[inline]
    pub fn wins(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    /// Returns the number of game wins the series requires.
    #[inline]
    pub fn needed(&self) -> u32 {
        self.needed
    }

    /// Returns the side that has taken the series, if any.
    pub fn winner(&self) -> Option<Side> {
        if self.home >= self.needed {
            Some(Side::Home)
        } else if self.away >= self.needed {
            Some(Side::Away)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{game_point, judge, parse_score, Outcome, SeriesTally, Side};
    use crate::format::MatchFormat;
    use crate::Error;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("0"), Ok(0));
        assert_eq!(parse_score(" 13 "), Ok(13));
        assert_eq!(parse_score("99999"), Ok(99999));

        assert_eq!(parse_score("-1"), Err(Error::InvalidScore("-1".into())));
        assert_eq!(parse_score("two"), Err(Error::InvalidScore("two".into())));
        assert_eq!(parse_score("1.5"), Err(Error::InvalidScore("1.5".into())));
        assert_eq!(parse_score(""), Err(Error::InvalidScore("".into())));
    }

    #[test]
    fn test_judge_single_game() {
        // Any unequal pair decides a BO1.
        assert_eq!(
            judge(MatchFormat::BestOf1, 13, 7),
            Outcome::Decisive(Side::Home)
        );
        assert_eq!(
            judge(MatchFormat::BestOf1, 0, 1),
            Outcome::Decisive(Side::Away)
        );
        assert_eq!(judge(MatchFormat::BestOf1, 3, 3), Outcome::Undecided);
    }

    #[test]
    fn test_judge_multi_game() {
        assert_eq!(
            judge(MatchFormat::BestOf3, 2, 0),
            Outcome::Decisive(Side::Home)
        );
        assert_eq!(
            judge(MatchFormat::BestOf3, 1, 2),
            Outcome::Decisive(Side::Away)
        );
        // The leader is still short of the required wins.
        assert_eq!(judge(MatchFormat::BestOf3, 1, 0), Outcome::Undecided);
        assert_eq!(judge(MatchFormat::BestOf5, 2, 1), Outcome::Undecided);
        assert_eq!(judge(MatchFormat::BestOf7, 3, 3), Outcome::Undecided);
        assert_eq!(
            judge(MatchFormat::BestOf7, 4, 2),
            Outcome::Decisive(Side::Home)
        );
    }

    #[test]
    fn test_game_point() {
        assert_eq!(game_point(16, 14), Some(Side::Home));
        assert_eq!(game_point(2, 11), Some(Side::Away));
        assert_eq!(game_point(5, 5), None);
    }

    #[test]
    fn test_series_tally() {
        let mut tally = SeriesTally::new(MatchFormat::BestOf3);
        assert_eq!(tally.winner(), None);

        tally.record_game(13, 7);
        assert_eq!(tally.wins(Side::Home), 1);
        assert_eq!(tally.winner(), None);

        // A drawn game moves nothing.
        tally.record_game(9, 9);
        assert_eq!(tally.wins(Side::Home), 1);
        assert_eq!(tally.wins(Side::Away), 0);

        tally.record_game(4, 12);
        assert_eq!(tally.winner(), None);

        tally.record_game(16, 2);
        assert_eq!(tally.wins(Side::Home), 2);
        assert_eq!(tally.winner(), Some(Side::Home));
    }

    #[test]
    fn test_series_tally_order_independent() {
        // The same game wins in any order decide the series identically.
        let mut tally = SeriesTally::new(MatchFormat::BestOf5);
        for side in [Side::Away, Side::Home, Side::Away, Side::Away] {
            tally.record(side);
        }

        assert_eq!(tally.wins(Side::Away), 3);
        assert_eq!(tally.winner(), Some(Side::Away));
    }
}
