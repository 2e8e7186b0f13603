//! Runtime configuration: defaults, overridable through environment variables.

use std::env;
use std::fmt;
use std::time::Duration;

/// Knobs for round scheduling and the concurrency guard.
#[derive(Clone, PartialEq)]
pub struct LadderConfig {
    /// Length of a new round, in days.
    pub round_duration_days: i64,
    /// A named lock older than this is considered stale and forcibly released.
    pub lock_timeout: Duration,
    /// Budget for a single result write plus group recalculation.
    pub recalculation_timeout: Duration,
    /// Wall-clock budget for closing a round (read phase through commit).
    pub closure_budget: Duration,
    /// Comodines a player may use per tournament.
    pub max_comodines: u32,
    /// Enables the development sign-in (`POST /api/session`). Off unless
    /// `LADDER_DEV_SESSIONS` is set.
    pub dev_sessions: bool,
    /// Secret a development sign-in must present to act as admin. Without it nobody can
    /// sign in as admin.
    pub admin_secret: Option<String>,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            round_duration_days: 14,
            lock_timeout: Duration::from_secs(30),
            recalculation_timeout: Duration::from_secs(20),
            closure_budget: Duration::from_secs(5 * 60),
            max_comodines: 2,
            dev_sessions: false,
            admin_secret: None,
        }
    }
}

impl fmt::Debug for LadderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LadderConfig")
            .field("round_duration_days", &self.round_duration_days)
            .field("lock_timeout", &self.lock_timeout)
            .field("recalculation_timeout", &self.recalculation_timeout)
            .field("closure_budget", &self.closure_budget)
            .field("max_comodines", &self.max_comodines)
            .field("dev_sessions", &self.dev_sessions)
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl LadderConfig {
    /// Defaults overridden by `LADDER_*` environment variables when set and parseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            round_duration_days: env_parse("LADDER_ROUND_DURATION_DAYS")
                .unwrap_or(defaults.round_duration_days),
            lock_timeout: env_parse("LADDER_LOCK_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_timeout),
            recalculation_timeout: env_parse("LADDER_RECALC_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.recalculation_timeout),
            closure_budget: env_parse("LADDER_CLOSURE_BUDGET_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.closure_budget),
            max_comodines: env_parse("LADDER_MAX_COMODINES").unwrap_or(defaults.max_comodines),
            dev_sessions: env_flag_true("LADDER_DEV_SESSIONS"),
            admin_secret: env_default("LADDER_ADMIN_SECRET"),
        }
    }
}

/// Trimmed, non-empty value of an environment variable.
pub fn env_default(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `1`, `true`, `yes` or `on` (any case).
pub fn env_flag_true(key: &str) -> bool {
    env_default(key).is_some_and(|value| {
        matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_default(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}
