//! Agreeing on a date for a group's three sets.

use crate::models::{Group, GroupId, GroupStatus, Identity, LadderError, PlayerId};
use crate::store::Database;
use chrono::{DateTime, Utc};

/// Seated players and their substitutes.
fn members(db: &Database, group_id: GroupId) -> Vec<PlayerId> {
    db.players_of_group(group_id)
        .into_iter()
        .flat_map(|gp| std::iter::once(gp.player_id).chain(gp.substitute_player_id))
        .collect()
}

fn check_open(db: &Database, group_id: GroupId) -> Result<(), LadderError> {
    if db.round_of_group(group_id)?.is_closed {
        return Err(LadderError::RoundClosed);
    }
    if db.group(group_id)?.status == GroupStatus::Completed {
        return Err(LadderError::GroupCompleted);
    }
    Ok(())
}

fn is_member(db: &Database, group_id: GroupId, actor: &Identity) -> bool {
    actor
        .player_id
        .is_some_and(|id| members(db, group_id).contains(&id))
}

/// A member proposes a date. Replaces any earlier proposal and withdraws an accepted one.
pub fn propose_date(
    db: &mut Database,
    group_id: GroupId,
    date: DateTime<Utc>,
    actor: &Identity,
) -> Result<Group, LadderError> {
    check_open(db, group_id)?;
    if !is_member(db, group_id, actor) && !actor.is_admin {
        return Err(LadderError::NoPermission);
    }
    let group = db.group_mut(group_id)?;
    group.proposed_date = Some(date);
    group.proposed_by = actor.player_id;
    group.accepted_date = None;
    group.status = GroupStatus::Pending;
    Ok(group.clone())
}

/// Another member (or an admin) accepts the proposal; the group becomes Scheduled.
pub fn accept_date(db: &mut Database, group_id: GroupId, actor: &Identity) -> Result<Group, LadderError> {
    check_open(db, group_id)?;
    if !is_member(db, group_id, actor) && !actor.is_admin {
        return Err(LadderError::NoPermission);
    }
    let group = db.group(group_id)?;
    let Some(date) = group.proposed_date else {
        return Err(LadderError::ScheduleNotConfirmed);
    };
    if !actor.is_admin && group.proposed_by.is_some() && group.proposed_by == actor.player_id {
        return Err(LadderError::CannotConfirmOwn);
    }
    let group = db.group_mut(group_id)?;
    group.accepted_date = Some(date);
    group.status = GroupStatus::Scheduled;
    Ok(group.clone())
}
