//! Comodín: skip a round for a fixed average-based credit, or send a substitute.

use crate::logic::recalculation::recalculate_group;
use crate::models::{GroupPlayer, GroupPlayerId, Identity, LadderError, MatchStatus, PlayerId, TournamentId};
use crate::store::Database;

/// Average points of the player's closed, non-comodín rounds (0 without history).
pub fn comodin_credit(db: &Database, tournament_id: TournamentId, player_id: PlayerId) -> f64 {
    let earned: Vec<f64> = db
        .rounds_of_tournament(tournament_id)
        .into_iter()
        .filter(|r| r.is_closed)
        .filter_map(|r| db.seat_in_round(r.id, player_id))
        .filter(|gp| !gp.used_comodin)
        .map(|gp| gp.points)
        .collect();
    if earned.is_empty() {
        0.0
    } else {
        earned.iter().sum::<f64>() / earned.len() as f64
    }
}

/// Comodines already used by the player in this tournament.
pub fn comodines_used(db: &Database, tournament_id: TournamentId, player_id: PlayerId) -> u32 {
    db.rounds_of_tournament(tournament_id)
        .into_iter()
        .filter_map(|r| db.seat_in_round(r.id, player_id))
        .filter(|gp| gp.used_comodin)
        .count() as u32
}

/// Declare a comodín for a seat in an open round, before any of the player's sets is
/// reported. With `substitute`, the substitute takes the seat in the group's sets and the
/// owner keeps receiving the points.
pub fn use_comodin(
    db: &mut Database,
    group_player_id: GroupPlayerId,
    substitute: Option<PlayerId>,
    actor: &Identity,
) -> Result<GroupPlayer, LadderError> {
    let gp = db.group_player(group_player_id)?.clone();
    let round = db.round_of_group(gp.group_id)?.clone();
    let tournament = db.tournament(round.tournament_id)?.clone();

    if round.is_closed {
        return Err(LadderError::RoundClosed);
    }
    if !actor.is_admin && actor.player_id != Some(gp.player_id) {
        return Err(LadderError::NoPermission);
    }
    if gp.used_comodin {
        return Err(LadderError::ComodinNotAllowed);
    }
    let already_played = db
        .matches_of_group(gp.group_id)
        .iter()
        .any(|m| m.participants().contains(&gp.player_id) && m.status != MatchStatus::NotReported);
    if already_played {
        return Err(LadderError::ComodinNotAllowed);
    }
    if let Some(sub) = substitute {
        if !db.players.contains_key(&sub) {
            return Err(LadderError::not_found("Player", sub));
        }
        if sub == gp.player_id || db.seat_in_round(round.id, sub).is_some() {
            return Err(LadderError::ComodinNotAllowed);
        }
    }
    if comodines_used(db, tournament.id, gp.player_id) >= tournament.max_comodines {
        return Err(LadderError::ComodinLimitReached {
            max: tournament.max_comodines,
        });
    }

    let credit = comodin_credit(db, tournament.id, gp.player_id);
    {
        let seat = db.group_player_mut(group_player_id)?;
        seat.used_comodin = true;
        seat.substitute_player_id = substitute;
        seat.comodin_points = substitute.is_none().then_some(credit);
    }
    if let Some(sub) = substitute {
        for set in db.matches.values_mut().filter(|m| m.group_id == gp.group_id) {
            set.replace_player(gp.player_id, sub);
            set.touch();
        }
    }
    recalculate_group(db, gp.group_id)?;
    log::info!(
        "Player {} used a comodín in round {} ({})",
        gp.player_id,
        round.number,
        match substitute {
            Some(sub) => format!("substitute {}", sub),
            None => format!("credit {:.2}", credit),
        }
    );
    Ok(db.group_player(group_player_id)?.clone())
}
