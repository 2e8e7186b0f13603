//! Group standings: points, streak and in-group positions from confirmed sets.
//!
//! This module is the only writer of `GroupPlayer::{points, streak, position}`.

use crate::logic::score_rules::set_points;
use crate::logic::streak::{streak_bonus, streak_for};
use crate::logic::substitute::recipient_for;
use crate::models::{
    GroupId, GroupPlayer, GroupPlayerId, LadderError, PlayerId, SetMatch, TournamentId,
};
use crate::store::Database;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// What counts towards a seat's points.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScoringMode {
    /// Set points, streak bonus, and comodín credit.
    Full,
    /// Set points only; streak reset to 0. Used when a round is reopened.
    MatchesOnly,
}

/// A seat's computed standing within its group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Standing {
    pub group_player_id: GroupPlayerId,
    pub player_id: PlayerId,
    pub points: f64,
    pub streak: u32,
    pub sets_played: u32,
    pub games_for: u32,
    pub games_against: u32,
    pub position: u8,
}

impl Standing {
    pub fn games_differential(&self) -> i64 {
        i64::from(self.games_for) - i64::from(self.games_against)
    }
}

/// Points desc, streak desc, games differential desc, then previous position.
pub fn standings_order(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .total_cmp(&a.points)
        .then_with(|| b.streak.cmp(&a.streak))
        .then_with(|| b.games_differential().cmp(&a.games_differential()))
        .then_with(|| a.position.cmp(&b.position))
}

fn tally(
    db: &Database,
    gp: &GroupPlayer,
    confirmed: &[&SetMatch],
    tournament_id: TournamentId,
    round_number: u32,
    mode: ScoringMode,
) -> Standing {
    let mut raw = 0u32;
    let mut sets_played = 0u32;
    let mut games_for = 0u32;
    let mut games_against = 0u32;
    for set in confirmed {
        let Some(team) = recipient_for(set, gp).and_then(|physical| set.team_of(physical)) else {
            continue;
        };
        let won = set.games_for(team);
        raw += set_points(won, set.winner() == Some(team));
        games_for += u32::from(won);
        games_against += u32::from(set.games_for(team.opponent()));
        sets_played += 1;
    }

    let (points, streak) = match mode {
        ScoringMode::Full if gp.has_fixed_credit() => (gp.comodin_points.unwrap_or(gp.points), 0),
        ScoringMode::Full => {
            let streak = streak_for(db, tournament_id, round_number, gp.player_id, gp.used_comodin);
            (f64::from(raw) + streak_bonus(streak, sets_played), streak)
        }
        ScoringMode::MatchesOnly => (f64::from(raw), 0),
    };

    Standing {
        group_player_id: gp.id,
        player_id: gp.player_id,
        points,
        streak,
        sets_played,
        games_for,
        games_against,
        position: gp.position,
    }
}

/// Compute standings without writing them. Sorted by new position.
pub fn compute_standings(
    db: &Database,
    group_id: GroupId,
    mode: ScoringMode,
) -> Result<Vec<Standing>, LadderError> {
    let round = db.round_of_group(group_id)?;
    let seats = db.players_of_group(group_id);
    if seats.is_empty() {
        log::error!("Group {} has no players; cannot compute points", group_id);
        return Err(LadderError::PointsCalculationFailed(group_id));
    }
    let confirmed: Vec<&SetMatch> = db
        .matches_of_group(group_id)
        .into_iter()
        .filter(|m| m.is_confirmed)
        .collect();

    let mut standings: Vec<Standing> = seats
        .into_iter()
        .map(|gp| tally(db, gp, &confirmed, round.tournament_id, round.number, mode))
        .collect();
    standings.sort_by(standings_order);
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.position = (i + 1) as u8;
    }
    Ok(standings)
}

fn write_standings(db: &mut Database, standings: &[Standing]) -> Result<(), LadderError> {
    let updates: HashMap<GroupPlayerId, &Standing> =
        standings.iter().map(|s| (s.group_player_id, s)).collect();
    for (id, standing) in updates {
        let gp = db.group_player_mut(id)?;
        gp.points = standing.points;
        gp.streak = standing.streak;
        gp.position = standing.position;
    }
    Ok(())
}

/// Recompute and persist every seat of the group. Idempotent for an unchanged set of
/// confirmed results. Call inside a transaction.
pub fn recalculate_group(db: &mut Database, group_id: GroupId) -> Result<Vec<Standing>, LadderError> {
    let standings = compute_standings(db, group_id, ScoringMode::Full)?;
    write_standings(db, &standings)?;
    log::debug!(
        "Recalculated group {}: {:?}",
        group_id,
        standings
            .iter()
            .map(|s| (s.position, s.points))
            .collect::<Vec<_>>()
    );
    Ok(standings)
}

/// Reset the group to set points only (no streak, no comodín credit).
pub fn strip_bonuses(db: &mut Database, group_id: GroupId) -> Result<Vec<Standing>, LadderError> {
    let mut standings = compute_standings(db, group_id, ScoringMode::MatchesOnly)?;
    // Positions stay as settled, so a later close breaks ties exactly as before.
    for standing in &mut standings {
        standing.position = db.group_player(standing.group_player_id)?.position;
    }
    standings.sort_by_key(|s| s.position);
    write_standings(db, &standings)?;
    Ok(standings)
}
