//! Player and the session identity acting on behalf of a player.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (used in sets, groups and rankings).
pub type PlayerId = Uuid;

/// A registered ladder player.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    /// Create a new player with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Who is calling: provided by the (external) session layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    /// None for staff accounts that are not ladder players.
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    /// A player acting for themselves.
    pub fn player(player_id: PlayerId) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            player_id: Some(player_id),
            is_admin: false,
        }
    }

    /// An administrator without a player profile.
    pub fn admin() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            player_id: None,
            is_admin: true,
        }
    }

    /// Id written into reporter/confirmer fields for admin overrides.
    pub fn actor_id(&self) -> Uuid {
        self.player_id.unwrap_or(self.user_id)
    }
}
