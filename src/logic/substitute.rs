//! Maps who physically played a set back to the seat that earns its points.

use crate::models::{GroupPlayer, PlayerId, SetMatch};

/// Physical player whose games count for `owner` in `set`.
///
/// The owner if they played; otherwise their registered substitute if the substitute played;
/// otherwise nobody (no credit for this set).
pub fn recipient_for(set: &SetMatch, owner: &GroupPlayer) -> Option<PlayerId> {
    let seated = set.participants();
    if seated.contains(&owner.player_id) {
        return Some(owner.player_id);
    }
    owner
        .substitute_player_id
        .filter(|substitute| seated.contains(substitute))
}
