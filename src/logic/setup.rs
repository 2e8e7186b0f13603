//! Setup: register players, start the tournament (round 1), and group/set generation.

use crate::models::{
    Group, GroupId, GroupPlayer, LadderError, Player, PlayerId, Round, RoundId, SetMatch,
    Tournament, TournamentId, GROUP_SIZE,
};
use crate::store::Database;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Seat indices (0-based positions) of the three sets: P1+P4 vs P2+P3, P1+P3 vs P2+P4,
/// P1+P2 vs P3+P4.
pub const SET_ROTATION: [([usize; 2], [usize; 2]); 3] =
    [([0, 3], [1, 2]), ([0, 2], [1, 3]), ([0, 1], [2, 3])];

/// Register a player. Names are trimmed and must be unique (case-insensitive).
pub fn register_player(db: &mut Database, name: &str) -> Result<Player, LadderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LadderError::InvalidPlayerName);
    }
    if db.players.values().any(|p| p.name.eq_ignore_ascii_case(name)) {
        return Err(LadderError::InvalidPlayerName);
    }
    let player = Player::new(name);
    db.players.insert(player.id, player.clone());
    Ok(player)
}

pub fn create_tournament(db: &mut Database, tournament: Tournament) -> Tournament {
    db.tournaments.insert(tournament.id, tournament.clone());
    tournament
}

/// Create a group of four with its three sets. `seats` are ordered by starting position.
pub fn create_group(
    db: &mut Database,
    round_id: RoundId,
    number: u32,
    seats: &[PlayerId],
) -> Result<GroupId, LadderError> {
    if seats.len() != GROUP_SIZE {
        return Err(LadderError::InsufficientPlayers);
    }
    let group = Group::new(round_id, number);
    let group_id = group.id;
    db.groups.insert(group_id, group);

    for (i, &player_id) in seats.iter().enumerate() {
        let gp = GroupPlayer::new(group_id, player_id, (i + 1) as u8);
        db.group_players.insert(gp.id, gp);
    }
    for (i, (team_1, team_2)) in SET_ROTATION.iter().enumerate() {
        let set = SetMatch::new(
            group_id,
            (i + 1) as u8,
            [seats[team_1[0]], seats[team_1[1]]],
            [seats[team_2[0]], seats[team_2[1]]],
        );
        db.matches.insert(set.id, set);
    }
    Ok(group_id)
}

/// Start the tournament: create round 1 and split `player_ids` into groups of four, in the
/// given order (ladder seeding) or shuffled.
pub fn start_tournament(
    db: &mut Database,
    tournament_id: TournamentId,
    player_ids: &[PlayerId],
    shuffle: bool,
) -> Result<Round, LadderError> {
    let tournament = db.tournament(tournament_id)?.clone();
    if !db.rounds_of_tournament(tournament_id).is_empty() {
        return Err(LadderError::TournamentAlreadyStarted);
    }
    if player_ids.is_empty() || player_ids.len() % GROUP_SIZE != 0 {
        return Err(LadderError::InsufficientPlayers);
    }
    for id in player_ids {
        if !db.players.contains_key(id) {
            return Err(LadderError::not_found("Player", *id));
        }
    }

    let unique: HashSet<&PlayerId> = player_ids.iter().collect();
    if unique.len() != player_ids.len() {
        return Err(LadderError::InsufficientPlayers);
    }
    let mut seeding = player_ids.to_vec();
    if shuffle {
        seeding.shuffle(&mut rand::thread_rng());
    }

    let round = Round::new(
        tournament_id,
        1,
        tournament.start_date,
        tournament.start_date + tournament.round_duration(),
    );
    db.rounds.insert(round.id, round.clone());
    for (i, chunk) in seeding.chunks_exact(GROUP_SIZE).enumerate() {
        create_group(db, round.id, (i + 1) as u32, chunk)?;
    }
    log::info!(
        "Started tournament {} with {} players in {} groups",
        tournament.name,
        seeding.len(),
        seeding.len() / GROUP_SIZE
    );
    Ok(round)
}
