//! Ladder business logic: scoring, result state machine, movements, round lifecycle.
//!
//! Functions here operate on a [`crate::store::Database`]; the mutating ones are meant to
//! run inside a store transaction.

pub mod comodin;
pub mod ladder;
pub mod match_result;
pub mod rankings;
pub mod recalculation;
pub mod round_lifecycle;
pub mod schedule;
pub mod score_rules;
pub mod setup;
pub mod streak;
pub mod substitute;

pub use ladder::{compute_movements, target_group, Movement, RankedSeat};
pub use recalculation::{recalculate_group, Standing};
pub use round_lifecycle::RoundClosure;
pub use score_rules::{set_points, validate_set_score, SetOutcome};
