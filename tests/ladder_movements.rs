//! Promotion and relegation between groups.

use ladder_tournament_web::{compute_movements, target_group, LadderError, Movement, PlayerId, RankedSeat};
use uuid::Uuid;

fn ladder(groups: usize) -> Vec<Vec<RankedSeat>> {
    (0..groups)
        .map(|g| {
            (1..=4u8)
                .map(|position| RankedSeat {
                    player_id: Uuid::new_v4(),
                    position,
                    // Higher groups score a little more so ordering inside a destination is visible.
                    points: f64::from(20 - position) - g as f64,
                })
                .collect()
        })
        .collect()
}

fn find(destinations: &[Vec<Movement>], player: PlayerId) -> &Movement {
    destinations
        .iter()
        .flatten()
        .find(|m| m.player_id == player)
        .unwrap()
}

#[test]
fn target_group_saturates_at_both_ends() {
    assert_eq!(target_group(0, 1, 5), 0);
    assert_eq!(target_group(1, 1, 5), 0);
    assert_eq!(target_group(3, 1, 5), 1);
    assert_eq!(target_group(3, 2, 5), 2);
    assert_eq!(target_group(1, 3, 5), 2);
    assert_eq!(target_group(1, 4, 5), 3);
    assert_eq!(target_group(4, 3, 5), 4);
    assert_eq!(target_group(3, 4, 5), 4);
}

#[test]
fn fourth_in_second_group_drops_to_third_of_three() {
    let groups = ladder(3);
    let player = groups[1][3].player_id;
    let destinations = compute_movements(&groups).unwrap();
    assert_eq!(find(&destinations, player).destination_group, 2);
}

#[test]
fn second_group_of_four_splits_two_up_two_down() {
    let groups = ladder(4);
    let seats: Vec<PlayerId> = groups[1].iter().map(|s| s.player_id).collect();
    let destinations = compute_movements(&groups).unwrap();

    assert_eq!(find(&destinations, seats[0]).destination_group, 0);
    assert_eq!(find(&destinations, seats[1]).destination_group, 0);
    assert_eq!(find(&destinations, seats[2]).destination_group, 2);
    let last = find(&destinations, seats[3]);
    assert_eq!(last.target_group, 3);
    assert_eq!(last.destination_group, 2);
    assert_eq!(last.groups_moved(), -1);
}

#[test]
fn every_destination_holds_four_players() {
    for count in 1..=6 {
        let destinations = compute_movements(&ladder(count)).unwrap();
        assert_eq!(destinations.len(), count);
        for group in &destinations {
            assert_eq!(group.len(), 4);
            let positions: Vec<u8> = group.iter().map(|m| m.new_position).collect();
            assert_eq!(positions, vec![1, 2, 3, 4]);
        }
    }
}

#[test]
fn winners_never_drop_and_losers_never_climb() {
    for count in 1..=6 {
        let destinations = compute_movements(&ladder(count)).unwrap();
        for m in destinations.iter().flatten() {
            if m.source_position <= 2 {
                assert!(m.destination_group <= m.source_group, "{:?}", m);
            } else {
                assert!(m.destination_group >= m.source_group, "{:?}", m);
            }
        }
    }
}

#[test]
fn single_group_keeps_everyone_and_reorders_by_points() {
    let mut groups = ladder(1);
    groups[0][3].points = 50.0;
    let leader = groups[0][3].player_id;
    let destinations = compute_movements(&groups).unwrap();
    assert_eq!(destinations[0][0].player_id, leader);
    assert_eq!(destinations[0][0].new_position, 1);
}

#[test]
fn groups_must_be_full() {
    let mut groups = ladder(2);
    groups[1].pop();
    assert_eq!(compute_movements(&groups), Err(LadderError::InsufficientPlayers));
    assert_eq!(compute_movements(&[]), Err(LadderError::InsufficientPlayers));
}
