//! Tournament, Round, and the crate-wide LadderError.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur during ladder operations.
#[derive(Clone, Debug, PartialEq)]
pub enum LadderError {
    /// Games out of range or an impossible set score.
    InvalidScore,
    /// Tie-break missing, malformed, or supplied where none is allowed.
    InvalidTiebreak,
    /// The round the set belongs to is closed.
    RoundClosed,
    /// Caller is not a participant (or not an admin).
    NoPermission,
    /// A result was already reported for this set.
    AlreadyReported,
    /// Nothing to confirm yet.
    NoResultToConfirm,
    /// The reporter cannot confirm their own result.
    CannotConfirmOwn,
    /// The set is already confirmed.
    AlreadyConfirmed,
    /// Confirmer sits on the reporter's team.
    ConfirmationSameTeam,
    /// The group's fixture has no accepted date yet.
    ScheduleNotConfirmed,
    /// The row changed between read and write.
    ConcurrentModification,
    /// Group standings could not be computed (data-integrity fault).
    PointsCalculationFailed(Uuid),
    /// Round is already closed.
    RoundAlreadyClosed,
    /// A group does not hold exactly four players.
    InsufficientPlayers,
    /// Another request holds the named resource.
    OperationInProgress(String),
    /// Transaction or closure budget exceeded; nothing was applied.
    OperationTimedOut,
    /// The following round already has results and cannot be regenerated.
    NextRoundStarted,
    /// The round before this one is open again; close it first.
    PreviousRoundOpen,
    /// Comodín can no longer be declared for this group player.
    ComodinNotAllowed,
    /// Player has used every comodín the tournament allows.
    ComodinLimitReached { max: u32 },
    /// Player name empty or already taken.
    InvalidPlayerName,
    /// Round 1 already exists.
    TournamentAlreadyStarted,
    /// All sets of the group are confirmed; its date is final.
    GroupCompleted,
    NotFound { entity: &'static str, id: Uuid },
    /// Underlying state store failed (poisoned lock).
    Storage(String),
}

impl LadderError {
    /// Stable kind name (shown to admins for diagnosis).
    pub fn kind(&self) -> &'static str {
        match self {
            LadderError::InvalidScore => "InvalidScore",
            LadderError::InvalidTiebreak => "InvalidTiebreak",
            LadderError::RoundClosed => "RoundClosed",
            LadderError::NoPermission => "NoPermission",
            LadderError::AlreadyReported => "AlreadyReported",
            LadderError::NoResultToConfirm => "NoResultToConfirm",
            LadderError::CannotConfirmOwn => "CannotConfirmOwn",
            LadderError::AlreadyConfirmed => "AlreadyConfirmed",
            LadderError::ConfirmationSameTeam => "ConfirmationSameTeam",
            LadderError::ScheduleNotConfirmed => "ScheduleNotConfirmed",
            LadderError::ConcurrentModification => "ConcurrentModification",
            LadderError::PointsCalculationFailed(_) => "PointsCalculationFailed",
            LadderError::RoundAlreadyClosed => "RoundAlreadyClosed",
            LadderError::InsufficientPlayers => "InsufficientPlayers",
            LadderError::OperationInProgress(_) => "OperationInProgress",
            LadderError::OperationTimedOut => "OperationTimedOut",
            LadderError::NextRoundStarted => "NextRoundStarted",
            LadderError::PreviousRoundOpen => "PreviousRoundOpen",
            LadderError::ComodinNotAllowed => "ComodinNotAllowed",
            LadderError::ComodinLimitReached { .. } => "ComodinLimitReached",
            LadderError::InvalidPlayerName => "InvalidPlayerName",
            LadderError::TournamentAlreadyStarted => "TournamentAlreadyStarted",
            LadderError::GroupCompleted => "GroupCompleted",
            LadderError::NotFound { .. } => "NotFound",
            LadderError::Storage(_) => "Storage",
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        LadderError::NotFound { entity, id }
    }
}

impl std::fmt::Display for LadderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LadderError::InvalidScore => write!(f, "Invalid set score"),
            LadderError::InvalidTiebreak => write!(f, "Invalid tie-break score"),
            LadderError::RoundClosed => write!(f, "This round is closed"),
            LadderError::NoPermission => write!(f, "You are not allowed to do this"),
            LadderError::AlreadyReported => write!(f, "A result was already reported for this set"),
            LadderError::NoResultToConfirm => write!(f, "There is no result to confirm"),
            LadderError::CannotConfirmOwn => write!(f, "You cannot confirm your own result"),
            LadderError::AlreadyConfirmed => write!(f, "This result is already confirmed"),
            LadderError::ConfirmationSameTeam => {
                write!(f, "The result must be confirmed by the opposing team")
            }
            LadderError::ScheduleNotConfirmed => write!(f, "The match date has not been confirmed"),
            LadderError::ConcurrentModification => {
                write!(f, "The data changed in the meantime, please retry")
            }
            LadderError::PointsCalculationFailed(_) => write!(f, "Points could not be calculated"),
            LadderError::RoundAlreadyClosed => write!(f, "The round is already closed"),
            LadderError::InsufficientPlayers => write!(f, "Every group needs exactly 4 players"),
            LadderError::OperationInProgress(_) => write!(f, "This is already being processed"),
            LadderError::OperationTimedOut => write!(f, "The operation took too long and was cancelled"),
            LadderError::NextRoundStarted => write!(f, "The next round already has results"),
            LadderError::PreviousRoundOpen => write!(f, "The previous round must be closed first"),
            LadderError::ComodinNotAllowed => write!(f, "A comodín cannot be used now"),
            LadderError::ComodinLimitReached { max } => {
                write!(f, "No comodines left (maximum {} per tournament)", max)
            }
            LadderError::InvalidPlayerName => {
                write!(f, "Player name is empty or already taken")
            }
            LadderError::TournamentAlreadyStarted => write!(f, "The tournament has already started"),
            LadderError::GroupCompleted => write!(f, "This group has finished playing"),
            LadderError::NotFound { entity, .. } => write!(f, "{} not found", entity),
            LadderError::Storage(_) => write!(f, "Internal storage error"),
        }
    }
}

impl std::error::Error for LadderError {}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Unique identifier for a round.
pub type RoundId = Uuid;

/// A ladder tournament: a sequence of rounds played by the same pool of players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub round_duration_days: i64,
    /// No next round is created after this one closes.
    pub total_rounds: Option<u32>,
    pub max_comodines: u32,
}

impl Tournament {
    pub fn new(name: impl Into<String>, start_date: DateTime<Utc>, round_duration_days: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_date,
            round_duration_days,
            total_rounds: None,
            max_comodines: 2,
        }
    }

    pub fn round_duration(&self) -> Duration {
        Duration::days(self.round_duration_days)
    }

    /// Whether `number` is the final round of a fixed-length tournament.
    pub fn is_last_round(&self, number: u32) -> bool {
        self.total_rounds.is_some_and(|total| number >= total)
    }
}

/// A fixed time window in which every group plays its three sets.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub number: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_closed: bool,
}

impl Round {
    pub fn new(
        tournament_id: TournamentId,
        number: u32,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            number,
            start_date,
            end_date,
            is_closed: false,
        }
    }
}
