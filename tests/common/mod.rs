//! Shared fixtures: a started ladder driven through the service.
#![allow(dead_code)]

use ladder_tournament_web::{
    GroupId, GroupPlayer, GroupView, Identity, InMemoryLock, LadderConfig, LadderService,
    NewTournament, Player, PlayerId, Round, RoundId, RoundView, SetScore, Tournament,
};
use std::sync::Arc;

pub struct Ladder {
    pub service: LadderService,
    pub admin: Identity,
    pub tournament: Tournament,
    /// Seeding order: group 1 holds players 0..4 in positions 1..4, and so on.
    pub players: Vec<Player>,
    pub round: Round,
}

/// Sets 1..3 all won by team 1: 4-0, 4-1, 4-2. Seats finish P1, P4, P3, P2 with
/// 15, 8, 7 and 6 points.
pub fn standard_scores() -> [SetScore; 3] {
    [SetScore::new(4, 0), SetScore::new(4, 1), SetScore::new(4, 2)]
}

impl Ladder {
    pub fn new(groups: usize) -> Self {
        Self::build(groups, NewTournament::default(), LadderConfig::default(), None)
    }

    pub fn with_settings(groups: usize, settings: NewTournament) -> Self {
        Self::build(groups, settings, LadderConfig::default(), None)
    }

    pub fn with_config(groups: usize, config: LadderConfig) -> Self {
        Self::build(groups, NewTournament::default(), config, None)
    }

    pub fn with_lock(groups: usize, lock: Arc<InMemoryLock>) -> Self {
        Self::build(groups, NewTournament::default(), LadderConfig::default(), Some(lock))
    }

    fn build(
        groups: usize,
        mut settings: NewTournament,
        config: LadderConfig,
        lock: Option<Arc<InMemoryLock>>,
    ) -> Self {
        let service = match lock {
            Some(lock) => LadderService::with_lock(config, lock),
            None => LadderService::new(config),
        };
        let admin = Identity::admin();
        if settings.name.is_empty() {
            settings.name = "Spring ladder".to_string();
        }
        let tournament = service.create_tournament(&admin, settings).unwrap();
        let players: Vec<Player> = (0..groups * 4)
            .map(|i| service.register_player(&admin, &format!("P{i}")).unwrap())
            .collect();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        let round = service
            .start_tournament(&admin, tournament.id, &ids, false)
            .unwrap();
        Self {
            service,
            admin,
            tournament,
            players,
            round,
        }
    }

    pub fn player(&self, index: usize) -> Identity {
        Identity::player(self.players[index].id)
    }

    pub fn id(&self, index: usize) -> PlayerId {
        self.players[index].id
    }

    pub fn view(&self, round_id: RoundId) -> RoundView {
        self.service.round_view(round_id).unwrap()
    }

    /// Group by ladder index (0 is the top).
    pub fn group(&self, round_id: RoundId, index: usize) -> GroupView {
        self.view(round_id).groups.remove(index)
    }

    /// Propose and accept a date as admin.
    pub fn schedule(&self, group_id: GroupId) {
        self.service
            .propose_date(group_id, chrono::Utc::now(), &self.admin)
            .unwrap();
        self.service.accept_date(group_id, &self.admin).unwrap();
    }

    /// Admin-enter all three sets of a group.
    pub fn play_group(&self, round_id: RoundId, index: usize, scores: &[SetScore; 3]) {
        let group = self.group(round_id, index);
        for (set, score) in group.matches.iter().zip(scores) {
            self.service
                .admin_set_result(set.id, score, &self.admin, None)
                .unwrap();
        }
    }

    pub fn play_round(&self, round_id: RoundId) {
        let groups = self.view(round_id).groups.len();
        for index in 0..groups {
            self.play_group(round_id, index, &standard_scores());
        }
    }

    /// Seat of a player in a round.
    pub fn seat(&self, round_id: RoundId, player_id: PlayerId) -> GroupPlayer {
        self.view(round_id)
            .groups
            .into_iter()
            .flat_map(|g| g.players)
            .find(|gp| gp.player_id == player_id)
            .unwrap()
    }

    /// Close a round and return the round it created.
    pub fn close(&self, round_id: RoundId) -> Round {
        self.service
            .close_round(round_id, &self.admin)
            .unwrap()
            .next_round
            .unwrap()
    }

    /// Number of rounds stored for the tournament.
    pub fn round_count(&self) -> usize {
        self.service
            .store()
            .read(|db| db.rounds_of_tournament(self.tournament.id).len())
            .unwrap()
    }

    /// Player ids of a group in position order.
    pub fn seating(&self, round_id: RoundId, index: usize) -> Vec<PlayerId> {
        self.group(round_id, index)
            .players
            .iter()
            .map(|gp| gp.player_id)
            .collect()
    }
}
