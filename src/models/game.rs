//! A set (one of the three fixed-rotation 2v2 games a group plays per round).

use crate::models::group::GroupId;
use crate::models::player::PlayerId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a set.
pub type MatchId = Uuid;

/// Which team won the set.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    One,
    Two,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::One => Team::Two,
            Team::Two => Team::One,
        }
    }
}

/// Result state of a set.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    #[default]
    NotReported,
    Reported,
    Confirmed,
}

/// Raw score as typed in by a player or admin.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SetScore {
    pub team1_games: u8,
    pub team2_games: u8,
    #[serde(default)]
    pub tiebreak: Option<String>,
}

impl SetScore {
    pub fn new(team1_games: u8, team2_games: u8) -> Self {
        Self {
            team1_games,
            team2_games,
            tiebreak: None,
        }
    }

    pub fn with_tiebreak(team1_games: u8, team2_games: u8, tiebreak: impl Into<String>) -> Self {
        Self {
            team1_games,
            team2_games,
            tiebreak: Some(tiebreak.into()),
        }
    }
}

/// One set inside a group. Scores are `None` until reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetMatch {
    pub id: MatchId,
    pub group_id: GroupId,
    /// 1..=3
    pub set_number: u8,
    pub team1_player1_id: PlayerId,
    pub team1_player2_id: PlayerId,
    pub team2_player1_id: PlayerId,
    pub team2_player2_id: PlayerId,
    pub team1_games: Option<u8>,
    pub team2_games: Option<u8>,
    pub tiebreak_score: Option<String>,
    pub is_confirmed: bool,
    pub reported_by_id: Option<Uuid>,
    pub confirmed_by_id: Option<Uuid>,
    pub status: MatchStatus,
    pub updated_at: DateTime<Utc>,
}

impl SetMatch {
    /// An unplayed set between `team_1` and `team_2`.
    pub fn new(group_id: GroupId, set_number: u8, team_1: [PlayerId; 2], team_2: [PlayerId; 2]) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            set_number,
            team1_player1_id: team_1[0],
            team1_player2_id: team_1[1],
            team2_player1_id: team_2[0],
            team2_player2_id: team_2[1],
            team1_games: None,
            team2_games: None,
            tiebreak_score: None,
            is_confirmed: false,
            reported_by_id: None,
            confirmed_by_id: None,
            status: MatchStatus::NotReported,
            updated_at: Utc::now(),
        }
    }

    pub fn team_1(&self) -> [PlayerId; 2] {
        [self.team1_player1_id, self.team1_player2_id]
    }

    pub fn team_2(&self) -> [PlayerId; 2] {
        [self.team2_player1_id, self.team2_player2_id]
    }

    pub fn participants(&self) -> [PlayerId; 4] {
        [
            self.team1_player1_id,
            self.team1_player2_id,
            self.team2_player1_id,
            self.team2_player2_id,
        ]
    }

    /// Team the player is seated in, if any.
    pub fn team_of(&self, player_id: PlayerId) -> Option<Team> {
        if self.team_1().contains(&player_id) {
            Some(Team::One)
        } else if self.team_2().contains(&player_id) {
            Some(Team::Two)
        } else {
            None
        }
    }

    /// Games won by `team`; 0 when unreported.
    pub fn games_for(&self, team: Team) -> u8 {
        match team {
            Team::One => self.team1_games.unwrap_or(0),
            Team::Two => self.team2_games.unwrap_or(0),
        }
    }

    /// Winning team of a scored set (stored scores are already normalised, so 4-4 never appears).
    pub fn winner(&self) -> Option<Team> {
        match (self.team1_games, self.team2_games) {
            (Some(a), Some(b)) if a > b => Some(Team::One),
            (Some(a), Some(b)) if b > a => Some(Team::Two),
            _ => None,
        }
    }

    /// Replace a seated player (used when a substitute takes over).
    pub fn replace_player(&mut self, from: PlayerId, to: PlayerId) {
        for slot in [
            &mut self.team1_player1_id,
            &mut self.team1_player2_id,
            &mut self.team2_player1_id,
            &mut self.team2_player2_id,
        ] {
            if *slot == from {
                *slot = to;
            }
        }
    }

    /// Bump `updated_at`, strictly increasing even within the clock's resolution.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}
