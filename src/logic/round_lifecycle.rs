//! Closing and reopening rounds.

use crate::concurrency::IntegrityCheck;
use crate::logic::ladder::{compute_movements, Movement, RankedSeat};
use crate::logic::rankings;
use crate::logic::recalculation::{recalculate_group, strip_bonuses};
use crate::logic::setup::create_group;
use crate::models::{
    GroupId, GroupStatus, LadderError, MatchStatus, PlayerId, Round, RoundId, StreakHistory,
    GROUP_SIZE,
};
use crate::store::Database;
use serde::Serialize;

/// Outcome of a closure.
#[derive(Clone, Debug, Serialize)]
pub struct RoundClosure {
    pub round: Round,
    /// None when the tournament ended with this round.
    pub next_round: Option<Round>,
    /// Flattened, by destination group then new position.
    pub movements: Vec<Movement>,
}

/// Whether the round after `round` is closed or has any reported set.
fn successor_started(db: &Database, round: &Round) -> bool {
    let Some(next) = db.round_by_number(round.tournament_id, round.number + 1) else {
        return false;
    };
    next.is_closed
        || db
            .groups_of_round(next.id)
            .iter()
            .flat_map(|g| db.matches_of_group(g.id))
            .any(|m| m.status != MatchStatus::NotReported)
}

/// Read-only preconditions for closing: open, predecessor closed, every group full,
/// successor untouched.
pub fn validate_closable(db: &Database, round_id: RoundId) -> Result<(), LadderError> {
    let round = db.round(round_id)?;
    if round.is_closed {
        return Err(LadderError::RoundAlreadyClosed);
    }
    if round.number > 1
        && db
            .round_by_number(round.tournament_id, round.number - 1)
            .is_some_and(|previous| !previous.is_closed)
    {
        return Err(LadderError::PreviousRoundOpen);
    }
    let groups = db.groups_of_round(round_id);
    if groups.is_empty() {
        return Err(LadderError::InsufficientPlayers);
    }
    for group in &groups {
        if db.players_of_group(group.id).len() != GROUP_SIZE {
            log::warn!("Group {} of round {} is not full", group.number, round.number);
            return Err(LadderError::InsufficientPlayers);
        }
    }
    if successor_started(db, round) {
        return Err(LadderError::NextRoundStarted);
    }
    Ok(())
}

/// Read-only preconditions for reopening a closed round: the next round has not started.
pub fn validate_reopenable(db: &Database, round_id: RoundId) -> Result<(), LadderError> {
    let round = db.round(round_id)?;
    if round.is_closed && successor_started(db, round) {
        return Err(LadderError::NextRoundStarted);
    }
    Ok(())
}

/// Close the round inside a transaction: verify the round is unchanged since `check` was
/// captured, settle final standings, record streak history, move players, create the next
/// round, and rebuild the rankings. Fails without side effects if the budget is exceeded.
pub fn close_round(
    db: &mut Database,
    round_id: RoundId,
    check: &IntegrityCheck,
) -> Result<RoundClosure, LadderError> {
    check.verify_unchanged(db)?;
    validate_closable(db, round_id)?;

    let round = db.round(round_id)?.clone();
    let tournament = db.tournament(round.tournament_id)?.clone();
    let group_ids: Vec<GroupId> = db.groups_of_round(round_id).iter().map(|g| g.id).collect();

    let mut ranked: Vec<Vec<RankedSeat>> = Vec::with_capacity(group_ids.len());
    for &group_id in &group_ids {
        let standings = recalculate_group(db, group_id)?;
        ranked.push(
            standings
                .iter()
                .map(|s| RankedSeat {
                    player_id: s.player_id,
                    position: s.position,
                    points: s.points,
                })
                .collect(),
        );
        db.group_mut(group_id)?.status = GroupStatus::Completed;
    }

    for &group_id in &group_ids {
        let seats: Vec<(PlayerId, bool, u32)> = db
            .players_of_group(group_id)
            .iter()
            .map(|gp| (gp.player_id, !gp.used_comodin, gp.streak))
            .collect();
        for (player_id, played, streak) in seats {
            db.streak_history.push(StreakHistory {
                tournament_id: tournament.id,
                round_id,
                round_number: round.number,
                player_id,
                played,
                streak,
            });
        }
    }
    db.round_mut(round_id)?.is_closed = true;

    let destinations = compute_movements(&ranked)?;

    let next_round = if tournament.is_last_round(round.number) {
        None
    } else {
        if let Some(stale) = db.round_by_number(tournament.id, round.number + 1) {
            let stale_id = stale.id;
            log::info!("Regenerating round {} of {}", round.number + 1, tournament.name);
            db.delete_round_cascade(stale_id);
        }
        let next = Round::new(
            tournament.id,
            round.number + 1,
            round.end_date,
            round.end_date + tournament.round_duration(),
        );
        db.rounds.insert(next.id, next.clone());
        for (index, group) in destinations.iter().enumerate() {
            let seats: Vec<PlayerId> = group.iter().map(|m| m.player_id).collect();
            create_group(db, next.id, (index + 1) as u32, &seats)?;
        }
        Some(next)
    };

    rankings::rebuild_round(db, tournament.id, round.number)?;
    check.verify_within_budget()?;

    let closed = db.round(round_id)?.clone();
    log::info!(
        "Closed round {} of {} ({} players moved)",
        closed.number,
        tournament.name,
        destinations
            .iter()
            .flatten()
            .filter(|m| m.groups_moved() != 0)
            .count()
    );
    Ok(RoundClosure {
        round: closed,
        next_round,
        movements: destinations.into_iter().flatten().collect(),
    })
}

/// Undo a closure: drop streak history and the ranking snapshot, put groups back to
/// Pending, strip streak and comodín bonuses, and reopen. A no-op on an open round.
/// Refused with `NextRoundStarted` once the following round is closed or has results.
pub fn reopen_round(db: &mut Database, round_id: RoundId) -> Result<Round, LadderError> {
    let round = db.round(round_id)?.clone();
    if !round.is_closed {
        return Ok(round);
    }
    validate_reopenable(db, round_id)?;
    db.streak_history.retain(|h| h.round_id != round_id);

    let group_ids: Vec<GroupId> = db.groups_of_round(round_id).iter().map(|g| g.id).collect();
    for group_id in group_ids {
        db.group_mut(group_id)?.status = GroupStatus::Pending;
        strip_bonuses(db, group_id)?;
    }
    rankings::drop_round(db, round.tournament_id, round.number);

    let reopened = db.round_mut(round_id)?;
    reopened.is_closed = false;
    log::info!("Reopened round {}", reopened.number);
    Ok(reopened.clone())
}
