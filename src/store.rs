//! In-memory entity store with all-or-nothing transactions.
//!
//! Every transaction runs against a working copy of the [`Database`] while holding the
//! store mutex, so transactions are serialised. The copy replaces the committed state only
//! when the closure returns `Ok` inside its time budget.

use crate::models::{
    Group, GroupId, GroupPlayer, GroupPlayerId, LadderError, MatchId, Player, PlayerId, Ranking,
    Round, RoundId, SetMatch, StreakHistory, Tournament, TournamentId,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// All persisted entities.
#[derive(Clone, Debug, Default)]
pub struct Database {
    pub tournaments: HashMap<TournamentId, Tournament>,
    pub players: HashMap<PlayerId, Player>,
    pub rounds: HashMap<RoundId, Round>,
    pub groups: HashMap<GroupId, Group>,
    pub group_players: HashMap<GroupPlayerId, GroupPlayer>,
    pub matches: HashMap<MatchId, SetMatch>,
    pub streak_history: Vec<StreakHistory>,
    pub rankings: Vec<Ranking>,
}

impl Database {
    pub fn tournament(&self, id: TournamentId) -> Result<&Tournament, LadderError> {
        self.tournaments
            .get(&id)
            .ok_or(LadderError::not_found("Tournament", id))
    }

    pub fn round(&self, id: RoundId) -> Result<&Round, LadderError> {
        self.rounds.get(&id).ok_or(LadderError::not_found("Round", id))
    }

    pub fn round_mut(&mut self, id: RoundId) -> Result<&mut Round, LadderError> {
        self.rounds
            .get_mut(&id)
            .ok_or(LadderError::not_found("Round", id))
    }

    pub fn group(&self, id: GroupId) -> Result<&Group, LadderError> {
        self.groups.get(&id).ok_or(LadderError::not_found("Group", id))
    }

    pub fn group_mut(&mut self, id: GroupId) -> Result<&mut Group, LadderError> {
        self.groups
            .get_mut(&id)
            .ok_or(LadderError::not_found("Group", id))
    }

    pub fn group_player(&self, id: GroupPlayerId) -> Result<&GroupPlayer, LadderError> {
        self.group_players
            .get(&id)
            .ok_or(LadderError::not_found("GroupPlayer", id))
    }

    pub fn group_player_mut(&mut self, id: GroupPlayerId) -> Result<&mut GroupPlayer, LadderError> {
        self.group_players
            .get_mut(&id)
            .ok_or(LadderError::not_found("GroupPlayer", id))
    }

    pub fn set_match(&self, id: MatchId) -> Result<&SetMatch, LadderError> {
        self.matches.get(&id).ok_or(LadderError::not_found("Match", id))
    }

    pub fn set_match_mut(&mut self, id: MatchId) -> Result<&mut SetMatch, LadderError> {
        self.matches
            .get_mut(&id)
            .ok_or(LadderError::not_found("Match", id))
    }

    /// Round a group belongs to.
    pub fn round_of_group(&self, group_id: GroupId) -> Result<&Round, LadderError> {
        let group = self.group(group_id)?;
        self.round(group.round_id)
    }

    /// Groups of a round, top of the ladder first.
    pub fn groups_of_round(&self, round_id: RoundId) -> Vec<&Group> {
        let mut groups: Vec<_> = self
            .groups
            .values()
            .filter(|g| g.round_id == round_id)
            .collect();
        groups.sort_by_key(|g| g.number);
        groups
    }

    /// Seats of a group, ordered by current position.
    pub fn players_of_group(&self, group_id: GroupId) -> Vec<&GroupPlayer> {
        let mut players: Vec<_> = self
            .group_players
            .values()
            .filter(|gp| gp.group_id == group_id)
            .collect();
        players.sort_by_key(|gp| (gp.position, gp.player_id));
        players
    }

    /// Sets of a group, by set number.
    pub fn matches_of_group(&self, group_id: GroupId) -> Vec<&SetMatch> {
        let mut matches: Vec<_> = self
            .matches
            .values()
            .filter(|m| m.group_id == group_id)
            .collect();
        matches.sort_by_key(|m| m.set_number);
        matches
    }

    /// Rounds of a tournament, by number.
    pub fn rounds_of_tournament(&self, tournament_id: TournamentId) -> Vec<&Round> {
        let mut rounds: Vec<_> = self
            .rounds
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .collect();
        rounds.sort_by_key(|r| r.number);
        rounds
    }

    pub fn round_by_number(&self, tournament_id: TournamentId, number: u32) -> Option<&Round> {
        self.rounds
            .values()
            .find(|r| r.tournament_id == tournament_id && r.number == number)
    }

    /// Seat of `player_id` in a round, if they play in it.
    pub fn seat_in_round(&self, round_id: RoundId, player_id: PlayerId) -> Option<&GroupPlayer> {
        self.group_players.values().find(|gp| {
            gp.player_id == player_id
                && self
                    .groups
                    .get(&gp.group_id)
                    .is_some_and(|g| g.round_id == round_id)
        })
    }

    /// Remove a round together with its groups, seats and sets.
    pub fn delete_round_cascade(&mut self, round_id: RoundId) {
        let group_ids: Vec<GroupId> = self
            .groups
            .values()
            .filter(|g| g.round_id == round_id)
            .map(|g| g.id)
            .collect();
        self.matches.retain(|_, m| !group_ids.contains(&m.group_id));
        self.group_players
            .retain(|_, gp| !group_ids.contains(&gp.group_id));
        self.groups.retain(|_, g| g.round_id != round_id);
        self.rounds.remove(&round_id);
    }
}

/// Shared handle on the [`Database`].
#[derive(Debug, Default)]
pub struct LadderStore {
    db: Mutex<Database>,
}

impl LadderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, LadderError> {
        self.db
            .lock()
            .map_err(|_| LadderError::Storage("lock error".to_string()))
    }

    /// Read committed state.
    pub fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> Result<R, LadderError> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// Run `f` as one transaction. Nothing is applied if `f` fails or exceeds `timeout`.
    pub fn transaction<R>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&mut Database) -> Result<R, LadderError>,
    ) -> Result<R, LadderError> {
        let mut guard = self.lock()?;
        let started = Instant::now();
        let mut working = guard.clone();
        match f(&mut working) {
            Ok(value) => {
                if started.elapsed() > timeout {
                    log::warn!(
                        "Transaction rolled back: exceeded {:?} (took {:?})",
                        timeout,
                        started.elapsed()
                    );
                    return Err(LadderError::OperationTimedOut);
                }
                *guard = working;
                Ok(value)
            }
            Err(e) => {
                log::debug!("Transaction rolled back: {}", e.kind());
                Err(e)
            }
        }
    }
}
