//! Tournament-wide ranking snapshots (official by average, ironman by total).

use crate::models::{LadderError, PlayerId, Ranking, TournamentId};
use crate::store::Database;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Default)]
struct Totals {
    total_points: f64,
    rounds_played: u32,
}

/// Rebuild the snapshot for `round_number` from every closed round up to it.
pub fn rebuild_round(
    db: &mut Database,
    tournament_id: TournamentId,
    round_number: u32,
) -> Result<Vec<Ranking>, LadderError> {
    db.tournament(tournament_id)?;
    let closed_rounds: Vec<_> = db
        .rounds_of_tournament(tournament_id)
        .into_iter()
        .filter(|r| r.is_closed && r.number <= round_number)
        .map(|r| r.id)
        .collect();

    let mut totals: HashMap<PlayerId, Totals> = HashMap::new();
    for round_id in closed_rounds {
        for group in db.groups_of_round(round_id) {
            for gp in db.players_of_group(group.id) {
                let entry = totals.entry(gp.player_id).or_default();
                entry.total_points += gp.points;
                entry.rounds_played += 1;
            }
        }
    }

    let previous: HashMap<PlayerId, u32> = db
        .rankings
        .iter()
        .filter(|r| r.tournament_id == tournament_id && r.round_number + 1 == round_number)
        .map(|r| (r.player_id, r.position))
        .collect();

    let mut rankings: Vec<Ranking> = totals
        .into_iter()
        .map(|(player_id, t)| Ranking {
            tournament_id,
            round_number,
            player_id,
            total_points: t.total_points,
            rounds_played: t.rounds_played,
            average_points: if t.rounds_played == 0 {
                0.0
            } else {
                t.total_points / f64::from(t.rounds_played)
            },
            position: 0,
            ironman_position: 0,
            movement: 0,
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.total_points
            .total_cmp(&a.total_points)
            .then_with(|| b.average_points.total_cmp(&a.average_points))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    for (i, r) in rankings.iter_mut().enumerate() {
        r.ironman_position = (i + 1) as u32;
    }

    rankings.sort_by(|a, b| {
        b.average_points
            .total_cmp(&a.average_points)
            .then_with(|| b.total_points.total_cmp(&a.total_points))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    for (i, r) in rankings.iter_mut().enumerate() {
        r.position = (i + 1) as u32;
        r.movement = previous
            .get(&r.player_id)
            .map(|&before| before as i32 - r.position as i32)
            .unwrap_or(0);
    }

    drop_round(db, tournament_id, round_number);
    db.rankings.extend(rankings.iter().cloned());
    Ok(rankings)
}

/// Remove the snapshot of one round.
pub fn drop_round(db: &mut Database, tournament_id: TournamentId, round_number: u32) {
    db.rankings
        .retain(|r| !(r.tournament_id == tournament_id && r.round_number == round_number));
}

/// Snapshot of a round, by official position.
pub fn rankings_for(db: &Database, tournament_id: TournamentId, round_number: u32) -> Vec<Ranking> {
    let mut rankings: Vec<Ranking> = db
        .rankings
        .iter()
        .filter(|r| r.tournament_id == tournament_id && r.round_number == round_number)
        .cloned()
        .collect();
    rankings.sort_by_key(|r| r.position);
    rankings
}

#[derive(Serialize)]
struct CsvRow<'a> {
    position: u32,
    ironman_position: u32,
    player: &'a str,
    total_points: f64,
    rounds_played: u32,
    average_points: String,
    movement: i32,
}

/// CSV with a header row, one line per player in official order.
pub fn export_csv(db: &Database, rankings: &[Ranking]) -> Result<String, LadderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for r in rankings {
        let name = db
            .players
            .get(&r.player_id)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        writer
            .serialize(CsvRow {
                position: r.position,
                ironman_position: r.ironman_position,
                player: name,
                total_points: r.total_points,
                rounds_played: r.rounds_played,
                average_points: format!("{:.2}", r.average_points),
                movement: r.movement,
            })
            .map_err(|e| LadderError::Storage(format!("csv: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| LadderError::Storage(format!("csv: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| LadderError::Storage(format!("csv: {}", e)))
}
