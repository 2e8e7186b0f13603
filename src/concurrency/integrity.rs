//! Round content fingerprint for optimistic checks around long operations.

use crate::models::{LadderError, MatchStatus, RoundId};
use crate::store::Database;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct SeatState {
    group: u32,
    player: String,
    points: f64,
    streak: u32,
    used_comodin: bool,
    substitute: Option<String>,
}

#[derive(Serialize)]
struct SetState {
    group: u32,
    set_number: u8,
    status: MatchStatus,
    is_confirmed: bool,
    team1_games: Option<u8>,
    team2_games: Option<u8>,
    tiebreak: Option<String>,
}

#[derive(Serialize)]
struct RoundState {
    round: String,
    is_closed: bool,
    seats: Vec<SeatState>,
    sets: Vec<SetState>,
}

/// SHA-256 (hex) over the round's seats (points, streak) and sets (confirmation, scores).
pub fn round_fingerprint(db: &Database, round_id: RoundId) -> Result<String, LadderError> {
    let round = db.round(round_id)?;
    let mut seats = Vec::new();
    let mut sets = Vec::new();
    for group in db.groups_of_round(round_id) {
        for gp in db.players_of_group(group.id) {
            seats.push(SeatState {
                group: group.number,
                player: gp.player_id.to_string(),
                points: gp.points,
                streak: gp.streak,
                used_comodin: gp.used_comodin,
                substitute: gp.substitute_player_id.map(|id| id.to_string()),
            });
        }
        for m in db.matches_of_group(group.id) {
            sets.push(SetState {
                group: group.number,
                set_number: m.set_number,
                status: m.status,
                is_confirmed: m.is_confirmed,
                team1_games: m.team1_games,
                team2_games: m.team2_games,
                tiebreak: m.tiebreak_score.clone(),
            });
        }
    }
    seats.sort_by(|a, b| (a.group, &a.player).cmp(&(b.group, &b.player)));
    let state = RoundState {
        round: round.id.to_string(),
        is_closed: round.is_closed,
        seats,
        sets,
    };
    let bytes = serde_json::to_vec(&state)
        .map_err(|e| LadderError::Storage(format!("fingerprint encoding: {}", e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Fingerprint captured at the start of an operation, re-checked before commit.
#[derive(Clone, Debug)]
pub struct IntegrityCheck {
    pub round_id: RoundId,
    pub fingerprint: String,
    started: Instant,
    budget: Duration,
}

impl IntegrityCheck {
    pub fn capture(db: &Database, round_id: RoundId, budget: Duration) -> Result<Self, LadderError> {
        Ok(Self {
            round_id,
            fingerprint: round_fingerprint(db, round_id)?,
            started: Instant::now(),
            budget,
        })
    }

    /// Fails with `ConcurrentModification` if the round changed since capture.
    pub fn verify_unchanged(&self, db: &Database) -> Result<(), LadderError> {
        let current = round_fingerprint(db, self.round_id)?;
        if current != self.fingerprint {
            log::warn!(
                "Round {} changed during operation ({} -> {})",
                self.round_id,
                &self.fingerprint[..12],
                &current[..12]
            );
            return Err(LadderError::ConcurrentModification);
        }
        Ok(())
    }

    /// Fails with `OperationTimedOut` once the wall-clock budget is spent.
    pub fn verify_within_budget(&self) -> Result<(), LadderError> {
        if self.started.elapsed() > self.budget {
            log::warn!(
                "Operation on round {} exceeded its {:?} budget",
                self.round_id,
                self.budget
            );
            return Err(LadderError::OperationTimedOut);
        }
        Ok(())
    }
}
