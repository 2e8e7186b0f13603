//! Set result state machine: NOT_REPORTED -> REPORTED -> CONFIRMED, plus admin override
//! and admin clear.
//!
//! Each transition comes in two halves. `validate_*` only reads, so the caller can reject a
//! request before opening a transaction. The mutating half re-checks `updated_at` against the
//! value the caller observed, re-validates, writes, and recalculates the group, all on the
//! same transaction's working copy: if recalculation fails, the result is not stored either.

use crate::logic::recalculation::recalculate_group;
use crate::logic::score_rules::{validate_score, SetOutcome};
use crate::models::{
    Group, GroupId, GroupStatus, Identity, LadderError, MatchId, MatchStatus, Round, SetMatch,
    SetScore,
};
use crate::store::Database;
use chrono::{DateTime, Utc};

struct SetContext<'a> {
    set: &'a SetMatch,
    group: &'a Group,
    round: &'a Round,
}

fn context(db: &Database, match_id: MatchId) -> Result<SetContext<'_>, LadderError> {
    let set = db.set_match(match_id)?;
    let group = db.group(set.group_id)?;
    let round = db.round(group.round_id)?;
    Ok(SetContext { set, group, round })
}

/// Shared gate for player (non-admin) transitions.
fn check_player_gate(ctx: &SetContext<'_>, actor: &Identity) -> Result<(), LadderError> {
    if ctx.round.is_closed {
        return Err(LadderError::RoundClosed);
    }
    let seated = actor
        .player_id
        .is_some_and(|player_id| ctx.set.participants().contains(&player_id));
    if !seated {
        return Err(LadderError::NoPermission);
    }
    if !ctx.group.is_schedule_confirmed() {
        return Err(LadderError::ScheduleNotConfirmed);
    }
    Ok(())
}

fn check_admin_gate(ctx: &SetContext<'_>, actor: &Identity) -> Result<(), LadderError> {
    if !actor.is_admin {
        return Err(LadderError::NoPermission);
    }
    if ctx.round.is_closed {
        return Err(LadderError::RoundClosed);
    }
    Ok(())
}

fn check_unchanged(set: &SetMatch, observed: DateTime<Utc>) -> Result<(), LadderError> {
    if set.updated_at != observed {
        log::warn!(
            "Set {} changed since it was read ({} != {})",
            set.id,
            set.updated_at,
            observed
        );
        return Err(LadderError::ConcurrentModification);
    }
    Ok(())
}

/// Completed once all sets are confirmed; back to Scheduled/Pending if one is cleared.
fn refresh_group_status(db: &mut Database, group_id: GroupId) -> Result<(), LadderError> {
    let all_confirmed = db
        .matches_of_group(group_id)
        .iter()
        .all(|m| m.is_confirmed);
    let group = db.group_mut(group_id)?;
    if all_confirmed {
        group.status = GroupStatus::Completed;
    } else if group.status == GroupStatus::Completed {
        group.status = if group.accepted_date.is_some() {
            GroupStatus::Scheduled
        } else {
            GroupStatus::Pending
        };
    }
    Ok(())
}

fn finish(db: &mut Database, match_id: MatchId) -> Result<SetMatch, LadderError> {
    let group_id = db.set_match(match_id)?.group_id;
    recalculate_group(db, group_id)?;
    refresh_group_status(db, group_id)?;
    Ok(db.set_match(match_id)?.clone())
}

fn write_outcome(set: &mut SetMatch, outcome: SetOutcome) {
    set.team1_games = Some(outcome.team1_games);
    set.team2_games = Some(outcome.team2_games);
    set.tiebreak_score = outcome.tiebreak;
}

/// Checks for a player's first report of a set.
pub fn validate_report(
    db: &Database,
    match_id: MatchId,
    score: &SetScore,
    actor: &Identity,
) -> Result<SetOutcome, LadderError> {
    let ctx = context(db, match_id)?;
    check_player_gate(&ctx, actor)?;
    if ctx.set.status != MatchStatus::NotReported || ctx.set.reported_by_id.is_some() {
        return Err(LadderError::AlreadyReported);
    }
    validate_score(score)
}

/// Record a participant's report. The set moves to REPORTED.
pub fn report_result(
    db: &mut Database,
    match_id: MatchId,
    score: &SetScore,
    actor: &Identity,
    observed: DateTime<Utc>,
) -> Result<SetMatch, LadderError> {
    check_unchanged(db.set_match(match_id)?, observed)?;
    let outcome = validate_report(db, match_id, score, actor)?;
    let set = db.set_match_mut(match_id)?;
    write_outcome(set, outcome);
    set.reported_by_id = actor.player_id;
    set.status = MatchStatus::Reported;
    set.touch();
    Ok(set.clone())
}

/// Checks for confirming a reported set: opposite team, not the reporter, not yet confirmed.
pub fn validate_confirm(db: &Database, match_id: MatchId, actor: &Identity) -> Result<(), LadderError> {
    let ctx = context(db, match_id)?;
    check_player_gate(&ctx, actor)?;
    let Some(reporter) = ctx.set.reported_by_id else {
        return Err(LadderError::NoResultToConfirm);
    };
    if ctx.set.is_confirmed || ctx.set.confirmed_by_id.is_some() {
        return Err(LadderError::AlreadyConfirmed);
    }
    if actor.player_id == Some(reporter) {
        return Err(LadderError::CannotConfirmOwn);
    }
    let confirmer_team = actor.player_id.and_then(|id| ctx.set.team_of(id));
    if let (Some(reporter_team), Some(confirmer_team)) = (ctx.set.team_of(reporter), confirmer_team) {
        if reporter_team == confirmer_team {
            return Err(LadderError::ConfirmationSameTeam);
        }
    }
    Ok(())
}

/// Confirm a reported set and recalculate its group.
pub fn confirm_result(
    db: &mut Database,
    match_id: MatchId,
    actor: &Identity,
    observed: DateTime<Utc>,
) -> Result<SetMatch, LadderError> {
    check_unchanged(db.set_match(match_id)?, observed)?;
    validate_confirm(db, match_id, actor)?;
    let set = db.set_match_mut(match_id)?;
    set.confirmed_by_id = actor.player_id;
    set.is_confirmed = true;
    set.status = MatchStatus::Confirmed;
    set.touch();
    finish(db, match_id)
}

/// Checks for an admin override: admin, open round, valid score. Ordering and schedule are
/// bypassed.
pub fn validate_admin_set(
    db: &Database,
    match_id: MatchId,
    score: &SetScore,
    actor: &Identity,
) -> Result<SetOutcome, LadderError> {
    let ctx = context(db, match_id)?;
    check_admin_gate(&ctx, actor)?;
    validate_score(score)
}

/// Force a confirmed result. Missing reporter/confirmer are filled with the admin.
pub fn admin_set_result(
    db: &mut Database,
    match_id: MatchId,
    score: &SetScore,
    actor: &Identity,
    observed: DateTime<Utc>,
) -> Result<SetMatch, LadderError> {
    check_unchanged(db.set_match(match_id)?, observed)?;
    let outcome = validate_admin_set(db, match_id, score, actor)?;
    let set = db.set_match_mut(match_id)?;
    write_outcome(set, outcome);
    set.reported_by_id.get_or_insert(actor.actor_id());
    set.confirmed_by_id.get_or_insert(actor.actor_id());
    set.is_confirmed = true;
    set.status = MatchStatus::Confirmed;
    set.touch();
    log::info!("Admin {} set result of set {}", actor.user_id, match_id);
    finish(db, match_id)
}

pub fn validate_clear(db: &Database, match_id: MatchId, actor: &Identity) -> Result<(), LadderError> {
    let ctx = context(db, match_id)?;
    check_admin_gate(&ctx, actor)
}

/// Wipe a result back to NOT_REPORTED and recalculate the group.
pub fn clear_result(
    db: &mut Database,
    match_id: MatchId,
    actor: &Identity,
    observed: DateTime<Utc>,
) -> Result<SetMatch, LadderError> {
    check_unchanged(db.set_match(match_id)?, observed)?;
    validate_clear(db, match_id, actor)?;
    let set = db.set_match_mut(match_id)?;
    set.team1_games = None;
    set.team2_games = None;
    set.tiebreak_score = None;
    set.is_confirmed = false;
    set.reported_by_id = None;
    set.confirmed_by_id = None;
    set.status = MatchStatus::NotReported;
    set.touch();
    log::info!("Admin {} cleared result of set {}", actor.user_id, match_id);
    finish(db, match_id)
}
