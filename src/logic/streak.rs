//! Consecutive-rounds streak and the per-set bonus it grants.

use crate::models::{PlayerId, TournamentId};
use crate::store::Database;
use std::collections::HashMap;

/// Bonus points per set played, per streak level.
pub const STREAK_BONUS_PER_SET: f64 = 2.0;

/// Streak of a player in round `round_number`.
///
/// Walks back from `round_number - 1` over the player's closed rounds and counts how many
/// consecutive ones they played without a comodín. Playing this round and the previous one
/// gives 1. A comodín in the round being scored gives 0.
pub fn streak_for(
    db: &Database,
    tournament_id: TournamentId,
    round_number: u32,
    player_id: PlayerId,
    used_comodin: bool,
) -> u32 {
    if used_comodin {
        return 0;
    }
    let played: HashMap<u32, bool> = db
        .streak_history
        .iter()
        .filter(|h| h.tournament_id == tournament_id && h.player_id == player_id)
        .filter(|h| h.round_number < round_number)
        .map(|h| (h.round_number, h.played))
        .collect();

    let mut streak = 0;
    let mut number = round_number;
    while number > 1 {
        number -= 1;
        match played.get(&number) {
            Some(true) => streak += 1,
            _ => break,
        }
    }
    streak
}

/// Bonus for `sets_played` sets at `streak`.
pub fn streak_bonus(streak: u32, sets_played: u32) -> f64 {
    if streak == 0 {
        return 0.0;
    }
    f64::from(streak) * f64::from(sets_played) * STREAK_BONUS_PER_SET
}
