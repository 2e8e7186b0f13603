//! Operations exposed to the web layer. Each one validates against committed state, then
//! applies itself in a single store transaction.

use crate::concurrency::{round_resource, with_lock, InMemoryLock, IntegrityCheck, ResourceLock};
use crate::config::LadderConfig;
use crate::logic::{comodin, match_result, rankings, round_lifecycle, schedule, setup, RoundClosure};
use crate::models::{
    Group, GroupId, GroupPlayer, GroupPlayerId, Identity, LadderError, MatchId, Player, PlayerId,
    Ranking, Round, RoundId, SetMatch, SetScore, Tournament, TournamentId,
};
use crate::store::LadderStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Settings for a new tournament. Unset fields fall back to [`LadderConfig`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub round_duration_days: Option<i64>,
    pub total_rounds: Option<u32>,
    pub max_comodines: Option<u32>,
}

/// A group with its seats and sets, for display.
#[derive(Clone, Debug, Serialize)]
pub struct GroupView {
    pub group: Group,
    pub players: Vec<GroupPlayer>,
    pub matches: Vec<SetMatch>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoundView {
    pub round: Round,
    /// Top of the ladder first.
    pub groups: Vec<GroupView>,
}

pub struct LadderService {
    store: LadderStore,
    locks: Arc<dyn ResourceLock>,
    config: LadderConfig,
}

impl LadderService {
    /// Service with a process-local lock table.
    pub fn new(config: LadderConfig) -> Self {
        let locks = Arc::new(InMemoryLock::new(config.lock_timeout));
        Self::with_lock(config, locks)
    }

    /// Service with a caller-provided lock backend.
    pub fn with_lock(config: LadderConfig, locks: Arc<dyn ResourceLock>) -> Self {
        Self {
            store: LadderStore::new(),
            locks,
            config,
        }
    }

    pub fn store(&self) -> &LadderStore {
        &self.store
    }

    fn require_admin(actor: &Identity) -> Result<(), LadderError> {
        if actor.is_admin {
            Ok(())
        } else {
            Err(LadderError::NoPermission)
        }
    }

    fn observed_version(
        &self,
        match_id: MatchId,
        observed: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, LadderError> {
        match observed {
            Some(at) => Ok(at),
            None => self.store.read(|db| db.set_match(match_id).map(|m| m.updated_at))?,
        }
    }

    fn recalc_budget(&self) -> Duration {
        self.config.recalculation_timeout
    }

    // --- sessions ----------------------------------------------------------------------

    /// Development sign-in: the identity stored in the caller's session.
    ///
    /// Refused unless dev sessions are enabled. Admin rights need the configured admin
    /// secret; a wrong or unexpected secret is refused rather than downgraded.
    pub fn sign_in(
        &self,
        user_id: Uuid,
        player_id: Option<PlayerId>,
        admin_secret: Option<&str>,
    ) -> Result<Identity, LadderError> {
        if !self.config.dev_sessions {
            return Err(LadderError::NoPermission);
        }
        if let Some(player_id) = player_id {
            self.store.read(|db| {
                db.players
                    .contains_key(&player_id)
                    .then_some(())
                    .ok_or(LadderError::not_found("Player", player_id))
            })??;
        }
        let is_admin = match (admin_secret, self.config.admin_secret.as_deref()) {
            (None, _) => false,
            (Some(given), Some(expected)) if given == expected => true,
            (Some(_), _) => {
                log::warn!("Rejected admin sign-in for user {}", user_id);
                return Err(LadderError::NoPermission);
            }
        };
        Ok(Identity {
            user_id,
            player_id,
            is_admin,
        })
    }

    // --- setup -------------------------------------------------------------------------

    pub fn create_tournament(&self, actor: &Identity, settings: NewTournament) -> Result<Tournament, LadderError> {
        Self::require_admin(actor)?;
        let mut tournament = Tournament::new(
            settings.name,
            settings.start_date.unwrap_or_else(Utc::now),
            settings.round_duration_days.unwrap_or(self.config.round_duration_days),
        );
        tournament.total_rounds = settings.total_rounds;
        tournament.max_comodines = settings.max_comodines.unwrap_or(self.config.max_comodines);
        self.store.transaction(self.recalc_budget(), |db| {
            Ok(setup::create_tournament(db, tournament))
        })
    }

    pub fn register_player(&self, actor: &Identity, name: &str) -> Result<Player, LadderError> {
        Self::require_admin(actor)?;
        self.store
            .transaction(self.recalc_budget(), |db| setup::register_player(db, name))
    }

    pub fn start_tournament(
        &self,
        actor: &Identity,
        tournament_id: TournamentId,
        player_ids: &[PlayerId],
        shuffle: bool,
    ) -> Result<Round, LadderError> {
        Self::require_admin(actor)?;
        self.store.transaction(self.recalc_budget(), |db| {
            setup::start_tournament(db, tournament_id, player_ids, shuffle)
        })
    }

    // --- results -----------------------------------------------------------------------

    /// Report a set score as a participant. `observed` is the `updated_at` the caller saw.
    pub fn report_result(
        &self,
        match_id: MatchId,
        score: &SetScore,
        actor: &Identity,
        observed: Option<DateTime<Utc>>,
    ) -> Result<SetMatch, LadderError> {
        let observed = self.observed_version(match_id, observed)?;
        self.store
            .read(|db| match_result::validate_report(db, match_id, score, actor))??;
        self.store.transaction(self.recalc_budget(), |db| {
            match_result::report_result(db, match_id, score, actor, observed)
        })
    }

    /// Confirm the opposing team's report. Confirmation and group recalculation commit
    /// together or not at all.
    pub fn confirm_result(
        &self,
        match_id: MatchId,
        actor: &Identity,
        observed: Option<DateTime<Utc>>,
    ) -> Result<SetMatch, LadderError> {
        let observed = self.observed_version(match_id, observed)?;
        self.store
            .read(|db| match_result::validate_confirm(db, match_id, actor))??;
        self.store.transaction(self.recalc_budget(), |db| {
            match_result::confirm_result(db, match_id, actor, observed)
        })
    }

    pub fn admin_set_result(
        &self,
        match_id: MatchId,
        score: &SetScore,
        actor: &Identity,
        observed: Option<DateTime<Utc>>,
    ) -> Result<SetMatch, LadderError> {
        let observed = self.observed_version(match_id, observed)?;
        self.store
            .read(|db| match_result::validate_admin_set(db, match_id, score, actor))??;
        self.store.transaction(self.recalc_budget(), |db| {
            match_result::admin_set_result(db, match_id, score, actor, observed)
        })
    }

    pub fn clear_result(
        &self,
        match_id: MatchId,
        actor: &Identity,
        observed: Option<DateTime<Utc>>,
    ) -> Result<SetMatch, LadderError> {
        let observed = self.observed_version(match_id, observed)?;
        self.store
            .read(|db| match_result::validate_clear(db, match_id, actor))??;
        self.store.transaction(self.recalc_budget(), |db| {
            match_result::clear_result(db, match_id, actor, observed)
        })
    }

    // --- rounds ------------------------------------------------------------------------

    /// Close a round under the `round:{id}` lock. A second concurrent close or reopen gets
    /// `OperationInProgress`.
    pub fn close_round(&self, round_id: RoundId, actor: &Identity) -> Result<RoundClosure, LadderError> {
        Self::require_admin(actor)?;
        with_lock(&*self.locks, &round_resource(round_id), || {
            let check = self.store.read(|db| {
                round_lifecycle::validate_closable(db, round_id)?;
                IntegrityCheck::capture(db, round_id, self.config.closure_budget)
            })??;
            self.store.transaction(self.config.closure_budget, |db| {
                round_lifecycle::close_round(db, round_id, &check)
            })
        })
    }

    /// Reopen a closed round (no-op if open) under the `round:{id}` lock.
    pub fn reopen_round(&self, round_id: RoundId, actor: &Identity) -> Result<Round, LadderError> {
        Self::require_admin(actor)?;
        with_lock(&*self.locks, &round_resource(round_id), || {
            let round = self.store.read(|db| {
                round_lifecycle::validate_reopenable(db, round_id)?;
                db.round(round_id).cloned()
            })??;
            if !round.is_closed {
                return Ok(round);
            }
            self.store.transaction(self.config.closure_budget, |db| {
                round_lifecycle::reopen_round(db, round_id)
            })
        })
    }

    // --- groups ------------------------------------------------------------------------

    pub fn use_comodin(
        &self,
        group_player_id: GroupPlayerId,
        substitute: Option<PlayerId>,
        actor: &Identity,
    ) -> Result<GroupPlayer, LadderError> {
        self.store.transaction(self.recalc_budget(), |db| {
            comodin::use_comodin(db, group_player_id, substitute, actor)
        })
    }

    pub fn propose_date(
        &self,
        group_id: GroupId,
        date: DateTime<Utc>,
        actor: &Identity,
    ) -> Result<Group, LadderError> {
        self.store.transaction(self.recalc_budget(), |db| {
            schedule::propose_date(db, group_id, date, actor)
        })
    }

    pub fn accept_date(&self, group_id: GroupId, actor: &Identity) -> Result<Group, LadderError> {
        self.store
            .transaction(self.recalc_budget(), |db| schedule::accept_date(db, group_id, actor))
    }

    // --- queries -----------------------------------------------------------------------

    pub fn rankings(&self, tournament_id: TournamentId, round_number: u32) -> Result<Vec<Ranking>, LadderError> {
        self.store
            .read(|db| rankings::rankings_for(db, tournament_id, round_number))
    }

    pub fn rankings_csv(&self, tournament_id: TournamentId, round_number: u32) -> Result<String, LadderError> {
        self.store.read(|db| {
            let snapshot = rankings::rankings_for(db, tournament_id, round_number);
            rankings::export_csv(db, &snapshot)
        })?
    }

    pub fn set_match(&self, match_id: MatchId) -> Result<SetMatch, LadderError> {
        self.store.read(|db| db.set_match(match_id).cloned())?
    }

    pub fn round(&self, round_id: RoundId) -> Result<Round, LadderError> {
        self.store.read(|db| db.round(round_id).cloned())?
    }

    /// Round with its groups, seats (by position) and sets.
    pub fn round_view(&self, round_id: RoundId) -> Result<RoundView, LadderError> {
        self.store.read(|db| {
            let round = db.round(round_id)?.clone();
            let groups = db
                .groups_of_round(round_id)
                .into_iter()
                .map(|g| GroupView {
                    group: g.clone(),
                    players: db.players_of_group(g.id).into_iter().cloned().collect(),
                    matches: db.matches_of_group(g.id).into_iter().cloned().collect(),
                })
                .collect();
            Ok(RoundView { round, groups })
        })?
    }
}
