//! Promotion and relegation between groups when a round closes.
//!
//! Each finishing position has a target group: 1st up two, 2nd up one, 3rd down one,
//! 4th down two, saturating at the top and bottom of the ladder. Saturation can send five
//! players to the top or bottom group, so players are then laid out in
//! (target, source group, source position) order and cut into groups of four. Overflow is
//! always absorbed by players who had room to move less, so first and second places never
//! end below their source group and third and fourth never above it.

use crate::models::{LadderError, PlayerId, GROUP_SIZE};
use serde::Serialize;
use std::cmp::Ordering;

/// A player's finishing place in a closed group.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedSeat {
    pub player_id: PlayerId,
    /// 1..=4
    pub position: u8,
    /// Points earned in the round that just closed.
    pub points: f64,
}

/// Where a player goes next round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movement {
    pub player_id: PlayerId,
    /// 0 is the top group.
    pub source_group: usize,
    pub source_position: u8,
    /// Group the placement rule asks for (after saturation).
    pub target_group: usize,
    /// Group actually assigned (after balancing to four per group).
    pub destination_group: usize,
    /// Starting position in the destination group.
    pub new_position: u8,
    pub points: f64,
}

impl Movement {
    /// Groups climbed (negative when relegated).
    pub fn groups_moved(&self) -> i32 {
        self.source_group as i32 - self.destination_group as i32
    }
}

/// Target group for a finishing position, saturated to the ladder bounds.
pub fn target_group(source: usize, position: u8, group_count: usize) -> usize {
    let bottom = group_count.saturating_sub(1);
    match position {
        1 => source.saturating_sub(2),
        2 => source.saturating_sub(1),
        3 => (source + 1).min(bottom),
        4 => (source + 2).min(bottom),
        _ => source,
    }
}

fn by_points_then_seed(a: &Movement, b: &Movement) -> Ordering {
    b.points
        .total_cmp(&a.points)
        .then_with(|| a.source_group.cmp(&b.source_group))
        .then_with(|| a.source_position.cmp(&b.source_position))
}

/// Compute next-round groups. `groups[0]` is the top group; each holds its four seats.
/// Returns one entry per destination group, ordered by new position.
pub fn compute_movements(groups: &[Vec<RankedSeat>]) -> Result<Vec<Vec<Movement>>, LadderError> {
    if groups.is_empty() || groups.iter().any(|g| g.len() != GROUP_SIZE) {
        return Err(LadderError::InsufficientPlayers);
    }
    let group_count = groups.len();

    let mut movements: Vec<Movement> = groups
        .iter()
        .enumerate()
        .flat_map(|(source, seats)| {
            seats.iter().map(move |seat| {
                let target = target_group(source, seat.position, group_count);
                Movement {
                    player_id: seat.player_id,
                    source_group: source,
                    source_position: seat.position,
                    target_group: target,
                    destination_group: target,
                    new_position: 0,
                    points: seat.points,
                }
            })
        })
        .collect();
    movements.sort_by_key(|m| (m.target_group, m.source_group, m.source_position));

    let mut destinations: Vec<Vec<Movement>> = Vec::with_capacity(group_count);
    for (index, chunk) in movements.chunks(GROUP_SIZE).enumerate() {
        let mut group: Vec<Movement> = chunk.to_vec();
        group.sort_by(by_points_then_seed);
        for (i, m) in group.iter_mut().enumerate() {
            m.destination_group = index;
            m.new_position = (i + 1) as u8;
        }
        destinations.push(group);
    }

    if destinations.len() != group_count || destinations.iter().any(|g| g.len() != GROUP_SIZE) {
        return Err(LadderError::InsufficientPlayers);
    }
    Ok(destinations)
}
