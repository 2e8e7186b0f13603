//! Data structures for the ladder: tournaments, rounds, groups, sets, rankings.

mod game;
mod group;
mod player;
mod ranking;
mod tournament;

pub use game::{MatchId, MatchStatus, SetMatch, SetScore, Team};
pub use group::{Group, GroupId, GroupPlayer, GroupPlayerId, GroupStatus, GROUP_SIZE};
pub use player::{Identity, Player, PlayerId};
pub use ranking::{Ranking, StreakHistory};
pub use tournament::{LadderError, Round, RoundId, Tournament, TournamentId};
