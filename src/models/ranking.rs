//! Derived ranking snapshot and streak history rows.

use crate::models::player::PlayerId;
use crate::models::tournament::{RoundId, TournamentId};
use serde::{Deserialize, Serialize};

/// Per-tournament per-round snapshot for one player. Rebuildable from closed rounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub tournament_id: TournamentId,
    pub round_number: u32,
    pub player_id: PlayerId,
    pub total_points: f64,
    pub rounds_played: u32,
    pub average_points: f64,
    /// Official ranking: by average points.
    pub position: u32,
    /// Ironman ranking: by total points.
    pub ironman_position: u32,
    /// Official positions gained since the previous round (negative = dropped).
    pub movement: i32,
}

/// What a player did in a closed round, used to derive streaks.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreakHistory {
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub round_number: u32,
    pub player_id: PlayerId,
    /// False when the player used a comodín that round.
    pub played: bool,
    pub streak: u32,
}
