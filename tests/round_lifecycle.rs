//! Closing and reopening rounds: movements, streaks, rankings and the round lock.

mod common;

use common::{standard_scores, Ladder};
use ladder_tournament_web::concurrency::round_resource;
use ladder_tournament_web::logic::recalculation::recalculate_group;
use ladder_tournament_web::logic::round_lifecycle;
use ladder_tournament_web::{
    Database, Group, GroupStatus, InMemoryLock, IntegrityCheck, LadderConfig, LadderError,
    NewTournament, ResourceLock, Round, SetScore, Tournament,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn closing_moves_players_into_the_next_round() {
    let ladder = Ladder::new(2);
    let round = ladder.round.clone();
    ladder.play_round(round.id);

    let closure = ladder.service.close_round(round.id, &ladder.admin).unwrap();
    assert!(closure.round.is_closed);
    assert_eq!(closure.movements.len(), 8);

    let next = closure.next_round.unwrap();
    assert_eq!(next.number, 2);
    assert_eq!(next.start_date, round.end_date);
    assert!(!next.is_closed);

    // Winners and runners-up of both groups meet at the top, ordered by points.
    assert_eq!(
        ladder.seating(next.id, 0),
        vec![ladder.id(0), ladder.id(4), ladder.id(3), ladder.id(7)]
    );
    assert_eq!(
        ladder.seating(next.id, 1),
        vec![ladder.id(2), ladder.id(6), ladder.id(1), ladder.id(5)]
    );
    let view = ladder.view(next.id);
    assert!(view.groups.iter().all(|g| g.matches.len() == 3));
    assert!(view.groups.iter().all(|g| g.group.status == GroupStatus::Pending));

    let closed = ladder.view(round.id);
    assert!(closed.groups.iter().all(|g| g.group.status == GroupStatus::Completed));
}

#[test]
fn closing_twice_is_rejected() {
    let ladder = Ladder::new(1);
    ladder.service.close_round(ladder.round.id, &ladder.admin).unwrap();
    assert!(matches!(
        ladder.service.close_round(ladder.round.id, &ladder.admin),
        Err(LadderError::RoundAlreadyClosed)
    ));
}

#[test]
fn only_admins_close_rounds() {
    let ladder = Ladder::new(1);
    assert!(matches!(
        ladder.service.close_round(ladder.round.id, &ladder.player(0)),
        Err(LadderError::NoPermission)
    ));
}

#[test]
fn held_round_lock_reports_operation_in_progress() {
    let lock = Arc::new(InMemoryLock::new(Duration::from_secs(30)));
    let ladder = Ladder::with_lock(1, lock.clone());
    let resource = round_resource(ladder.round.id);

    let lease = lock.try_acquire(&resource).unwrap();
    assert!(matches!(
        ladder.service.close_round(ladder.round.id, &ladder.admin),
        Err(LadderError::OperationInProgress(_))
    ));
    assert!(!ladder.service.round(ladder.round.id).unwrap().is_closed);

    lock.release(&lease);
    ladder.service.close_round(ladder.round.id, &ladder.admin).unwrap();
    assert!(!lock.is_held(&resource));
}

#[test]
fn stale_lock_is_taken_over() {
    let lock = InMemoryLock::new(Duration::ZERO);
    let first = lock.try_acquire("round:x").unwrap();
    let second = lock.try_acquire("round:x").unwrap();
    assert_ne!(first.token, second.token);

    // The superseded lease cannot release the new holder.
    lock.release(&first);
    assert_eq!(lock.sweep_stale(), 1);
}

#[test]
fn racing_closures_apply_once() {
    let ladder = Arc::new(Ladder::new(2));
    ladder.play_round(ladder.round.id);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ladder = Arc::clone(&ladder);
                s.spawn(move || ladder.service.close_round(ladder.round.id, &ladder.admin))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(LadderError::OperationInProgress(_)) | Err(LadderError::RoundAlreadyClosed)
    )));
    let rounds = ladder
        .service
        .store()
        .read(|db| db.rounds_of_tournament(ladder.tournament.id).len())
        .unwrap();
    assert_eq!(rounds, 2);
}

#[test]
fn streak_bonus_applies_from_the_second_round() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let next = ladder
        .service
        .close_round(ladder.round.id, &ladder.admin)
        .unwrap()
        .next_round
        .unwrap();

    // Round 2 seats: P1, P4, P3, P2. Set 1 pits P1 + P2 against P4 + P3.
    let group = ladder.group(next.id, 0);
    ladder
        .service
        .admin_set_result(group.matches[0].id, &SetScore::new(4, 0), &ladder.admin, None)
        .unwrap();

    let winner = ladder.seat(next.id, ladder.id(0));
    assert_eq!(winner.streak, 1);
    assert_eq!(winner.points, 5.0 + 2.0);
    let loser = ladder.seat(next.id, ladder.id(2));
    assert_eq!(loser.streak, 1);
    assert_eq!(loser.points, 2.0);
}

#[test]
fn comodin_without_substitute_earns_the_average_credit() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let next = ladder
        .service
        .close_round(ladder.round.id, &ladder.admin)
        .unwrap()
        .next_round
        .unwrap();

    let seat = ladder.seat(next.id, ladder.id(1));
    let seat = ladder
        .service
        .use_comodin(seat.id, None, &ladder.player(1))
        .unwrap();
    assert!(seat.used_comodin);
    assert_eq!(seat.comodin_points, Some(6.0));
    assert_eq!(seat.points, 6.0);
    assert_eq!(seat.streak, 0);

    // Results of the sets do not change the fixed credit.
    ladder.play_group(next.id, 0, &standard_scores());
    assert_eq!(ladder.seat(next.id, ladder.id(1)).points, 6.0);

    assert_eq!(
        ladder.service.use_comodin(seat.id, None, &ladder.player(1)),
        Err(LadderError::ComodinNotAllowed)
    );
}

#[test]
fn comodin_is_refused_after_playing_or_for_others() {
    let ladder = Ladder::new(1);
    let round = ladder.round.id;
    let seat = ladder.seat(round, ladder.id(0));

    assert_eq!(
        ladder.service.use_comodin(seat.id, None, &ladder.player(1)),
        Err(LadderError::NoPermission)
    );
    let set_id = ladder.group(round, 0).matches[0].id;
    ladder
        .service
        .admin_set_result(set_id, &SetScore::new(4, 1), &ladder.admin, None)
        .unwrap();
    assert_eq!(
        ladder.service.use_comodin(seat.id, None, &ladder.player(0)),
        Err(LadderError::ComodinNotAllowed)
    );
}

#[test]
fn comodin_limit_is_enforced() {
    let ladder = Ladder::with_settings(
        1,
        NewTournament {
            max_comodines: Some(0),
            ..NewTournament::default()
        },
    );
    let seat = ladder.seat(ladder.round.id, ladder.id(0));
    assert_eq!(
        ladder.service.use_comodin(seat.id, None, &ladder.player(0)),
        Err(LadderError::ComodinLimitReached { max: 0 })
    );
}

#[test]
fn substitute_results_count_for_the_seat_owner() {
    let ladder = Ladder::new(1);
    let round = ladder.round.id;
    let group = ladder.group(round, 0);
    let substitute = ladder.service.register_player(&ladder.admin, "Stand-in").unwrap();
    let seat = ladder.seat(round, ladder.id(0));

    let seat = ladder
        .service
        .use_comodin(seat.id, Some(substitute.id), &ladder.player(0))
        .unwrap();
    assert_eq!(seat.substitute_player_id, Some(substitute.id));
    assert_eq!(seat.comodin_points, None);

    let set = ladder.service.set_match(group.matches[0].id).unwrap();
    assert!(set.participants().contains(&substitute.id));
    assert!(!set.participants().contains(&ladder.id(0)));

    // The substitute reports, an opponent confirms.
    ladder.schedule(group.group.id);
    let stand_in = ladder_tournament_web::Identity::player(substitute.id);
    ladder
        .service
        .report_result(set.id, &SetScore::new(4, 2), &stand_in, None)
        .unwrap();
    ladder
        .service
        .confirm_result(set.id, &ladder.player(1), None)
        .unwrap();

    assert_eq!(ladder.seat(round, ladder.id(0)).points, 5.0);
    assert_eq!(ladder.seat(round, ladder.id(3)).points, 5.0);
}

#[test]
fn reopen_strips_bonuses_and_reclose_restores_them() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let second = ladder
        .service
        .close_round(ladder.round.id, &ladder.admin)
        .unwrap()
        .next_round
        .unwrap();
    ladder.play_round(second.id);
    let closure = ladder.service.close_round(second.id, &ladder.admin).unwrap();
    let third = closure.next_round.unwrap();

    let settled = ladder.group(second.id, 0).players;
    assert!(settled.iter().all(|gp| gp.streak == 1));

    let reopened = ladder.service.reopen_round(second.id, &ladder.admin).unwrap();
    assert!(!reopened.is_closed);
    let stripped = ladder.group(second.id, 0);
    assert_eq!(stripped.group.status, GroupStatus::Pending);
    for (before, after) in settled.iter().zip(&stripped.players) {
        assert_eq!(before.player_id, after.player_id);
        assert_eq!(after.points, before.points - 6.0);
        assert_eq!(after.streak, 0);
    }
    assert!(ladder.service.rankings(ladder.tournament.id, 2).unwrap().is_empty());

    let again = ladder.service.close_round(second.id, &ladder.admin).unwrap();
    let resettled = ladder.group(second.id, 0).players;
    assert_eq!(settled, resettled);
    assert_eq!(again.movements, closure.movements);

    // The untouched third round was rebuilt.
    let rebuilt = again.next_round.unwrap();
    assert_ne!(rebuilt.id, third.id);
    assert!(ladder.service.round(third.id).is_err());
}

#[test]
fn reopening_is_refused_once_the_next_round_has_results() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let next = ladder.close(ladder.round.id);
    let set_id = ladder.group(next.id, 0).matches[0].id;
    ladder
        .service
        .admin_set_result(set_id, &SetScore::new(4, 1), &ladder.admin, None)
        .unwrap();

    assert!(matches!(
        ladder.service.reopen_round(ladder.round.id, &ladder.admin),
        Err(LadderError::NextRoundStarted)
    ));
    assert!(ladder.service.round(ladder.round.id).unwrap().is_closed);

    // The next round still closes with its streaks intact.
    ladder.play_round(next.id);
    ladder.close(next.id);
    let seats = ladder.group(next.id, 0).players;
    assert!(seats.iter().all(|gp| gp.streak == 1));
}

#[test]
fn reopening_is_refused_once_the_next_round_is_closed() {
    let ladder = Ladder::new(1);
    let next = ladder.close(ladder.round.id);
    ladder.close(next.id);
    assert!(matches!(
        ladder.service.reopen_round(ladder.round.id, &ladder.admin),
        Err(LadderError::NextRoundStarted)
    ));
}

#[test]
fn next_round_waits_for_a_reopened_predecessor() {
    let ladder = Ladder::new(1);
    let next = ladder.close(ladder.round.id);
    ladder.service.reopen_round(ladder.round.id, &ladder.admin).unwrap();

    assert!(matches!(
        ladder.service.close_round(next.id, &ladder.admin),
        Err(LadderError::PreviousRoundOpen)
    ));

    let rebuilt = ladder.close(ladder.round.id);
    assert_eq!(rebuilt.number, 2);
    assert!(ladder.service.close_round(rebuilt.id, &ladder.admin).is_ok());
}

#[test]
fn changed_round_fails_the_integrity_check() {
    let ladder = Ladder::new(1);
    let round_id = ladder.round.id;
    let store = ladder.service.store();
    let check = store
        .read(|db| IntegrityCheck::capture(db, round_id, Duration::from_secs(60)))
        .unwrap()
        .unwrap();

    let set_id = ladder.group(round_id, 0).matches[0].id;
    ladder
        .service
        .admin_set_result(set_id, &SetScore::new(4, 1), &ladder.admin, None)
        .unwrap();

    let result = store.transaction(Duration::from_secs(60), |db| {
        round_lifecycle::close_round(db, round_id, &check)
    });
    assert!(matches!(result, Err(LadderError::ConcurrentModification)));
    assert!(!ladder.service.round(round_id).unwrap().is_closed);
    assert_eq!(ladder.round_count(), 1);
}

#[test]
fn closure_over_budget_commits_nothing() {
    let config = LadderConfig {
        closure_budget: Duration::ZERO,
        ..LadderConfig::default()
    };
    let ladder = Ladder::with_config(1, config);
    ladder.play_round(ladder.round.id);
    let before = ladder.group(ladder.round.id, 0);

    assert!(matches!(
        ladder.service.close_round(ladder.round.id, &ladder.admin),
        Err(LadderError::OperationTimedOut)
    ));
    assert!(!ladder.service.round(ladder.round.id).unwrap().is_closed);
    assert_eq!(ladder.round_count(), 1);
    assert!(ladder.service.rankings(ladder.tournament.id, 1).unwrap().is_empty());
    let history = ladder
        .service
        .store()
        .read(|db| db.streak_history.len())
        .unwrap();
    assert_eq!(history, 0);
    let after = ladder.group(ladder.round.id, 0);
    assert_eq!(after.group.status, before.group.status);
    assert_eq!(after.players, before.players);
}

#[test]
fn streak_grows_with_each_consecutive_round() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let second = ladder.close(ladder.round.id);
    ladder.play_round(second.id);
    let third = ladder.close(second.id);

    // P1 tops every round, so sits in team 1 of set 1.
    let set_id = ladder.group(third.id, 0).matches[0].id;
    ladder
        .service
        .admin_set_result(set_id, &SetScore::new(4, 0), &ladder.admin, None)
        .unwrap();

    let seats = ladder.group(third.id, 0).players;
    assert!(seats.iter().all(|gp| gp.streak == 2));
    let leader = ladder.seat(third.id, ladder.id(0));
    assert_eq!(leader.position, 1);
    assert_eq!(leader.points, 5.0 + 2.0 * 1.0 * 2.0);
}

#[test]
fn comodin_breaks_the_streak() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let second = ladder.close(ladder.round.id);

    let seat = ladder.seat(second.id, ladder.id(1));
    ladder
        .service
        .use_comodin(seat.id, None, &ladder.player(1))
        .unwrap();
    ladder.play_round(second.id);
    let third = ladder.close(second.id);
    assert_eq!(ladder.seat(second.id, ladder.id(1)).streak, 0);

    let set_id = ladder.group(third.id, 0).matches[0].id;
    ladder
        .service
        .admin_set_result(set_id, &SetScore::new(4, 0), &ladder.admin, None)
        .unwrap();
    for gp in ladder.group(third.id, 0).players {
        let expected = if gp.player_id == ladder.id(1) { 0 } else { 2 };
        assert_eq!(gp.streak, expected);
    }
}

#[test]
fn reopen_and_reclose_restore_comodin_credit() {
    let ladder = Ladder::new(1);
    ladder.play_round(ladder.round.id);
    let second = ladder.close(ladder.round.id);

    // Round 2 seats: P1, P4, P3, P2.
    let seat = ladder.seat(second.id, ladder.id(1));
    ladder
        .service
        .use_comodin(seat.id, None, &ladder.player(1))
        .unwrap();
    ladder.play_round(second.id);
    ladder.close(second.id);
    let settled = ladder.group(second.id, 0).players;
    assert_eq!(ladder.seat(second.id, ladder.id(1)).points, 6.0);

    ladder.service.reopen_round(second.id, &ladder.admin).unwrap();
    let stripped = ladder.seat(second.id, ladder.id(1));
    // Fourth seat's set points; the credit is kept aside.
    assert_eq!(stripped.points, 8.0);
    assert_eq!(stripped.comodin_points, Some(6.0));

    ladder.close(second.id);
    let resettled = ladder.group(second.id, 0).players;
    assert_eq!(settled, resettled);
}

#[test]
fn reopening_an_open_round_changes_nothing() {
    let ladder = Ladder::new(1);
    let round = ladder.service.reopen_round(ladder.round.id, &ladder.admin).unwrap();
    assert_eq!(round, ladder.round);
}

#[test]
fn last_round_creates_no_successor() {
    let ladder = Ladder::with_settings(
        1,
        NewTournament {
            total_rounds: Some(1),
            ..NewTournament::default()
        },
    );
    let closure = ladder.service.close_round(ladder.round.id, &ladder.admin).unwrap();
    assert!(closure.next_round.is_none());
    assert_eq!(closure.movements.len(), 4);
}

#[test]
fn rankings_follow_each_closure() {
    let ladder = Ladder::new(2);
    ladder.play_round(ladder.round.id);
    ladder.service.close_round(ladder.round.id, &ladder.admin).unwrap();

    let rankings = ladder.service.rankings(ladder.tournament.id, 1).unwrap();
    assert_eq!(rankings.len(), 8);
    let positions: Vec<u32> = rankings.iter().map(|r| r.position).collect();
    assert_eq!(positions, (1..=8).collect::<Vec<_>>());
    assert_eq!(rankings[0].total_points, 15.0);
    assert_eq!(rankings[0].rounds_played, 1);
    assert_eq!(rankings[7].average_points, 6.0);
    assert!(rankings.iter().all(|r| r.movement == 0));

    let csv = ladder.service.rankings_csv(ladder.tournament.id, 1).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("position,ironman_position,player,total_points,rounds_played,average_points,movement")
    );
    assert_eq!(lines.count(), 8);
}

#[test]
fn recalculation_is_idempotent() {
    let ladder = Ladder::new(1);
    ladder.play_group(ladder.round.id, 0, &standard_scores());
    let group_id = ladder.group(ladder.round.id, 0).group.id;

    let store = ladder.service.store();
    let first = store
        .transaction(Duration::from_secs(5), |db| recalculate_group(db, group_id))
        .unwrap();
    let second = store
        .transaction(Duration::from_secs(5), |db| recalculate_group(db, group_id))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_group_fails_points_calculation() {
    let mut db = Database::default();
    let tournament = Tournament::new("Empty", chrono::Utc::now(), 14);
    let round = Round::new(tournament.id, 1, tournament.start_date, tournament.start_date);
    let group = Group::new(round.id, 1);
    let group_id = group.id;
    db.tournaments.insert(tournament.id, tournament);
    db.rounds.insert(round.id, round);
    db.groups.insert(group.id, group);

    assert_eq!(
        recalculate_group(&mut db, group_id),
        Err(LadderError::PointsCalculationFailed(group_id))
    );
}
