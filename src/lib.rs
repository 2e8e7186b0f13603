//! Padel ladder tournament: round lifecycle and scoring engine, with models and storage.

pub mod concurrency;
pub mod config;
pub mod logic;
pub mod models;
pub mod service;
pub mod store;

pub use concurrency::{InMemoryLock, IntegrityCheck, LockGuard, ResourceLock};
pub use config::LadderConfig;
pub use logic::{
    compute_movements, recalculate_group, set_points, target_group, validate_set_score,
    Movement, RankedSeat, RoundClosure, SetOutcome, Standing,
};
pub use models::{
    Group, GroupId, GroupPlayer, GroupPlayerId, GroupStatus, Identity, LadderError, MatchId,
    MatchStatus, Player, PlayerId, Ranking, Round, RoundId, SetMatch, SetScore, StreakHistory,
    Team, Tournament, TournamentId, GROUP_SIZE,
};
pub use service::{GroupView, LadderService, NewTournament, RoundView};
pub use store::{Database, LadderStore};
