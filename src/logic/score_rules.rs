//! Set score validation, winner decision and per-set points.

use crate::models::{LadderError, SetScore, Team};

/// Most games either team can record in a set.
pub const MAX_GAMES: u8 = 10;
/// Games the winner must reach.
pub const MIN_WINNING_GAMES: u8 = 4;
/// Tie-break points the tie-break winner must reach.
pub const MIN_TIEBREAK_POINTS: u32 = 7;

/// A validated set, normalised for scoring: a tie-break set is stored as 5-4 for its winner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetOutcome {
    pub team1_games: u8,
    pub team2_games: u8,
    pub tiebreak: Option<String>,
    pub winner: Team,
}

/// Parse a tie-break `"X-Y"` (team 1 points first) and return its winner.
fn tiebreak_winner(raw: &str) -> Result<Team, LadderError> {
    let (x, y) = raw.trim().split_once('-').ok_or(LadderError::InvalidTiebreak)?;
    let x: u32 = x.trim().parse().map_err(|_| LadderError::InvalidTiebreak)?;
    let y: u32 = y.trim().parse().map_err(|_| LadderError::InvalidTiebreak)?;
    if x.abs_diff(y) < 2 || x.max(y) < MIN_TIEBREAK_POINTS {
        return Err(LadderError::InvalidTiebreak);
    }
    Ok(if x > y { Team::One } else { Team::Two })
}

/// Validate a set score.
///
/// - both teams 0..=10 games, winner at least 4;
/// - 4-4 (or 5-4) needs a tie-break `"X-Y"` with |X-Y| >= 2 and max(X,Y) >= 7; it counts
///   as 5-4 for the tie-break winner;
/// - 4-x otherwise needs a margin of at least 2 and no tie-break;
/// - 5+ games needs a margin of exactly 2 and no tie-break.
pub fn validate_set_score(
    team1_games: u8,
    team2_games: u8,
    tiebreak: Option<&str>,
) -> Result<SetOutcome, LadderError> {
    let (a, b) = (team1_games, team2_games);
    if a > MAX_GAMES || b > MAX_GAMES {
        return Err(LadderError::InvalidScore);
    }
    let (high, low) = (a.max(b), a.min(b));
    if high < MIN_WINNING_GAMES {
        return Err(LadderError::InvalidScore);
    }
    let tiebreak = tiebreak.map(str::trim).filter(|t| !t.is_empty());

    if (high, low) == (4, 4) || (high, low) == (5, 4) {
        let raw = tiebreak.ok_or(LadderError::InvalidTiebreak)?;
        let winner = tiebreak_winner(raw)?;
        // 5-4 must agree with the tie-break.
        if a != b && (a > b) != (winner == Team::One) {
            return Err(LadderError::InvalidTiebreak);
        }
        let (team1_games, team2_games) = match winner {
            Team::One => (5, 4),
            Team::Two => (4, 5),
        };
        return Ok(SetOutcome {
            team1_games,
            team2_games,
            tiebreak: Some(raw.to_string()),
            winner,
        });
    }

    if a == b {
        return Err(LadderError::InvalidScore);
    }
    let margin_ok = if high == MIN_WINNING_GAMES {
        high - low >= 2
    } else {
        high - low == 2
    };
    if !margin_ok {
        return Err(LadderError::InvalidScore);
    }
    if tiebreak.is_some() {
        return Err(LadderError::InvalidTiebreak);
    }
    Ok(SetOutcome {
        team1_games: a,
        team2_games: b,
        tiebreak: None,
        winner: if a > b { Team::One } else { Team::Two },
    })
}

/// Convenience wrapper over [`validate_set_score`] for a [`SetScore`].
pub fn validate_score(score: &SetScore) -> Result<SetOutcome, LadderError> {
    validate_set_score(score.team1_games, score.team2_games, score.tiebreak.as_deref())
}

/// One point per game won, plus one for winning the set.
pub fn set_points(games_won: u8, won_set: bool) -> u32 {
    u32::from(games_won) + u32::from(won_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiebreak_parsing_accepts_spaces() {
        assert_eq!(tiebreak_winner(" 10 - 8 "), Ok(Team::One));
        assert_eq!(tiebreak_winner("5-7"), Ok(Team::Two));
        assert_eq!(tiebreak_winner("7"), Err(LadderError::InvalidTiebreak));
        assert_eq!(tiebreak_winner("a-b"), Err(LadderError::InvalidTiebreak));
    }
}
