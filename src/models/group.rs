//! Group (four players inside a round) and GroupPlayer (a seat in a group).

use crate::models::player::PlayerId;
use crate::models::tournament::RoundId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Players per group.
pub const GROUP_SIZE: usize = 4;

pub type GroupId = Uuid;
pub type GroupPlayerId = Uuid;

/// Scheduling state of a group's three-set fixture.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    #[default]
    Pending,
    Scheduled,
    Completed,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub round_id: RoundId,
    /// 1-based ordinal inside the round; 1 is the top of the ladder.
    pub number: u32,
    pub level: u32,
    pub status: GroupStatus,
    pub proposed_date: Option<DateTime<Utc>>,
    pub proposed_by: Option<PlayerId>,
    pub accepted_date: Option<DateTime<Utc>>,
}

impl Group {
    pub fn new(round_id: RoundId, number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id,
            number,
            level: number,
            status: GroupStatus::Pending,
            proposed_date: None,
            proposed_by: None,
            accepted_date: None,
        }
    }

    /// Results may only be reported once the fixture date is agreed.
    pub fn is_schedule_confirmed(&self) -> bool {
        matches!(self.status, GroupStatus::Scheduled | GroupStatus::Completed)
            && self.accepted_date.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupPlayer {
    pub id: GroupPlayerId,
    pub group_id: GroupId,
    pub player_id: PlayerId,
    /// 1..=4 inside the group.
    pub position: u8,
    pub points: f64,
    pub streak: u32,
    pub used_comodin: bool,
    /// Fixed average-based credit granted with a comodín (no substitute).
    pub comodin_points: Option<f64>,
    pub substitute_player_id: Option<PlayerId>,
}

impl GroupPlayer {
    pub fn new(group_id: GroupId, player_id: PlayerId, position: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            player_id,
            position,
            points: 0.0,
            streak: 0,
            used_comodin: false,
            comodin_points: None,
            substitute_player_id: None,
        }
    }

    /// Comodín without a stand-in: points are the fixed credit, not live results.
    pub fn has_fixed_credit(&self) -> bool {
        self.used_comodin && self.substitute_player_id.is_none()
    }
}
