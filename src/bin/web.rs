//! Single binary web server exposing the ladder engine as a JSON API.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! Identity comes from a cookie session. `POST /api/session` is a development stand-in for
//! the real sign-in flow and is disabled unless LADDER_DEV_SESSIONS is set.

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{DateTime, Utc};
use ladder_tournament_web::config::env_default;
use ladder_tournament_web::{
    GroupId, GroupPlayerId, Identity, InMemoryLock, LadderConfig, LadderError, LadderService,
    MatchId, NewTournament, PlayerId, RoundId, SetScore, TournamentId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

type AppState = Data<LadderService>;

const IDENTITY_KEY: &str = "identity";

/// How often stale round locks are swept.
const LOCK_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct SignInBody {
    user_id: uuid::Uuid,
    #[serde(default)]
    player_id: Option<PlayerId>,
    #[serde(default)]
    admin_secret: Option<String>,
}

#[derive(Deserialize)]
struct AddPlayerBody {
    name: String,
}

#[derive(Deserialize)]
struct StartTournamentBody {
    player_ids: Vec<PlayerId>,
    #[serde(default)]
    shuffle: bool,
}

/// Score plus the `updated_at` the client last saw (optimistic concurrency).
#[derive(Deserialize)]
struct ScoreBody {
    #[serde(flatten)]
    score: SetScore,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Default, Deserialize)]
struct VersionBody {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Default, Deserialize)]
struct ComodinBody {
    #[serde(default)]
    substitute_player_id: Option<PlayerId>,
}

#[derive(Deserialize)]
struct ProposeDateBody {
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct IdPath {
    id: uuid::Uuid,
}

#[derive(Deserialize)]
struct RankingPath {
    id: TournamentId,
    round: u32,
}

fn identity(session: &Session) -> Result<Identity, HttpResponse> {
    match session.get::<Identity>(IDENTITY_KEY) {
        Ok(Some(identity)) => Ok(identity),
        Ok(None) => Err(HttpResponse::Unauthorized().json(serde_json::json!({ "error": "Not signed in" }))),
        Err(_) => Err(HttpResponse::BadRequest().json(serde_json::json!({ "error": "Invalid session" }))),
    }
}

/// Short message for everyone; admins also get the error kind.
fn error_response(e: &LadderError, actor: &Identity) -> HttpResponse {
    let mut builder = match e {
        LadderError::NoPermission => HttpResponse::Forbidden(),
        LadderError::NotFound { .. } => HttpResponse::NotFound(),
        LadderError::ConcurrentModification
        | LadderError::OperationInProgress(_)
        | LadderError::AlreadyReported
        | LadderError::AlreadyConfirmed
        | LadderError::RoundAlreadyClosed
        | LadderError::NextRoundStarted
        | LadderError::PreviousRoundOpen
        | LadderError::GroupCompleted
        | LadderError::TournamentAlreadyStarted => HttpResponse::Conflict(),
        LadderError::PointsCalculationFailed(_)
        | LadderError::OperationTimedOut
        | LadderError::Storage(_) => HttpResponse::InternalServerError(),
        _ => HttpResponse::BadRequest(),
    };
    if actor.is_admin {
        builder.json(serde_json::json!({ "error": e.to_string(), "kind": e.kind() }))
    } else {
        builder.json(serde_json::json!({ "error": e.to_string() }))
    }
}

/// Run a (blocking) service call off the async workers and render its result.
async fn run<T, F>(state: &AppState, actor: Identity, f: F) -> HttpResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(&LadderService, &Identity) -> Result<T, LadderError> + Send + 'static,
{
    let service = state.clone().into_inner();
    let joined = tokio::task::spawn_blocking(move || f(&service, &actor)).await;
    let result = joined.unwrap_or_else(|e| Err(LadderError::Storage(format!("worker failed: {}", e))));
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => {
            if !matches!(e, LadderError::NotFound { .. }) {
                log::info!("Rejected request from {}: {}", actor.user_id, e.kind());
            }
            error_response(&e, &actor)
        }
    }
}

macro_rules! signed_in {
    ($session:expr) => {
        match identity(&$session) {
            Ok(identity) => identity,
            Err(response) => return response,
        }
    };
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "ladder-tournament-web",
    })
}

/// Development sign-in (needs `LADDER_DEV_SESSIONS`; admin needs `LADDER_ADMIN_SECRET`).
#[post("/api/session")]
async fn api_sign_in(state: AppState, session: Session, body: Json<SignInBody>) -> HttpResponse {
    let body = body.into_inner();
    let identity = match state.sign_in(body.user_id, body.player_id, body.admin_secret.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            let anonymous = Identity {
                user_id: body.user_id,
                player_id: None,
                is_admin: false,
            };
            return error_response(&e, &anonymous);
        }
    };
    match session.insert(IDENTITY_KEY, identity) {
        Ok(()) => HttpResponse::Ok().json(identity),
        Err(_) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": "session error" })),
    }
}

#[delete("/api/session")]
async fn api_sign_out(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// Create a tournament (admin).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, session: Session, body: Json<NewTournament>) -> HttpResponse {
    let actor = signed_in!(session);
    let settings = body.into_inner();
    run(&state, actor, move |svc, actor| svc.create_tournament(actor, settings)).await
}

/// Register a player (admin).
#[post("/api/players")]
async fn api_add_player(state: AppState, session: Session, body: Json<AddPlayerBody>) -> HttpResponse {
    let actor = signed_in!(session);
    let name = body.into_inner().name;
    run(&state, actor, move |svc, actor| svc.register_player(actor, &name)).await
}

/// Create round 1 from the seeding order (admin).
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Json<StartTournamentBody>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let tournament_id: TournamentId = path.id;
    let body = body.into_inner();
    run(&state, actor, move |svc, actor| {
        svc.start_tournament(actor, tournament_id, &body.player_ids, body.shuffle)
    })
    .await
}

/// Round with groups, seats and sets.
#[get("/api/rounds/{id}")]
async fn api_get_round(state: AppState, session: Session, path: Path<IdPath>) -> HttpResponse {
    let actor = signed_in!(session);
    let round_id: RoundId = path.id;
    run(&state, actor, move |svc, _| svc.round_view(round_id)).await
}

#[post("/api/rounds/{id}/close")]
async fn api_close_round(state: AppState, session: Session, path: Path<IdPath>) -> HttpResponse {
    let actor = signed_in!(session);
    let round_id: RoundId = path.id;
    run(&state, actor, move |svc, actor| svc.close_round(round_id, actor)).await
}

#[post("/api/rounds/{id}/reopen")]
async fn api_reopen_round(state: AppState, session: Session, path: Path<IdPath>) -> HttpResponse {
    let actor = signed_in!(session);
    let round_id: RoundId = path.id;
    run(&state, actor, move |svc, actor| svc.reopen_round(round_id, actor)).await
}

#[post("/api/matches/{id}/report")]
async fn api_report_result(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Json<ScoreBody>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let match_id: MatchId = path.id;
    let body = body.into_inner();
    run(&state, actor, move |svc, actor| {
        svc.report_result(match_id, &body.score, actor, body.updated_at)
    })
    .await
}

#[post("/api/matches/{id}/confirm")]
async fn api_confirm_result(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Option<Json<VersionBody>>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let match_id: MatchId = path.id;
    let observed = body.map(|b| b.into_inner()).unwrap_or_default().updated_at;
    run(&state, actor, move |svc, actor| svc.confirm_result(match_id, actor, observed)).await
}

/// Admin override: set and confirm a result.
#[put("/api/matches/{id}/result")]
async fn api_admin_set_result(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Json<ScoreBody>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let match_id: MatchId = path.id;
    let body = body.into_inner();
    run(&state, actor, move |svc, actor| {
        svc.admin_set_result(match_id, &body.score, actor, body.updated_at)
    })
    .await
}

/// Admin: wipe a result.
#[delete("/api/matches/{id}/result")]
async fn api_clear_result(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Option<Json<VersionBody>>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let match_id: MatchId = path.id;
    let observed = body.map(|b| b.into_inner()).unwrap_or_default().updated_at;
    run(&state, actor, move |svc, actor| svc.clear_result(match_id, actor, observed)).await
}

#[post("/api/group-players/{id}/comodin")]
async fn api_use_comodin(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Option<Json<ComodinBody>>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let group_player_id: GroupPlayerId = path.id;
    let substitute = body.map(|b| b.into_inner()).unwrap_or_default().substitute_player_id;
    run(&state, actor, move |svc, actor| {
        svc.use_comodin(group_player_id, substitute, actor)
    })
    .await
}

#[post("/api/groups/{id}/schedule/propose")]
async fn api_propose_date(
    state: AppState,
    session: Session,
    path: Path<IdPath>,
    body: Json<ProposeDateBody>,
) -> HttpResponse {
    let actor = signed_in!(session);
    let group_id: GroupId = path.id;
    let date = body.date;
    run(&state, actor, move |svc, actor| svc.propose_date(group_id, date, actor)).await
}

#[post("/api/groups/{id}/schedule/accept")]
async fn api_accept_date(state: AppState, session: Session, path: Path<IdPath>) -> HttpResponse {
    let actor = signed_in!(session);
    let group_id: GroupId = path.id;
    run(&state, actor, move |svc, actor| svc.accept_date(group_id, actor)).await
}

#[get("/api/tournaments/{id}/rankings/{round}")]
async fn api_rankings(state: AppState, session: Session, path: Path<RankingPath>) -> HttpResponse {
    let actor = signed_in!(session);
    let (tournament_id, round) = (path.id, path.round);
    run(&state, actor, move |svc, _| svc.rankings(tournament_id, round)).await
}

#[get("/api/tournaments/{id}/rankings/{round}/csv")]
async fn api_rankings_csv(state: AppState, session: Session, path: Path<RankingPath>) -> HttpResponse {
    let actor = signed_in!(session);
    let (tournament_id, round) = (path.id, path.round);
    let service = state.into_inner();
    let joined = tokio::task::spawn_blocking(move || service.rankings_csv(tournament_id, round)).await;
    match joined {
        Ok(Ok(csv)) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .body(csv),
        Ok(Err(e)) => error_response(&e, &actor),
        Err(e) => error_response(&LadderError::Storage(e.to_string()), &actor),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// `SESSION_KEY` (at least 64 bytes) or a random key (sessions then die with the process).
fn session_key() -> Key {
    match env_default("SESSION_KEY") {
        Some(secret) if secret.len() >= 64 => Key::from(secret.as_bytes()),
        Some(_) => {
            log::warn!("SESSION_KEY shorter than 64 bytes; using a random key");
            Key::generate()
        }
        None => Key::generate(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let config = LadderConfig::from_env();
    log::info!("Ladder config: {:?}", config);
    if config.dev_sessions {
        log::warn!("Development sign-in is enabled (LADDER_DEV_SESSIONS)");
    }
    let locks = Arc::new(InMemoryLock::new(config.lock_timeout));
    let state = Data::new(LadderService::with_lock(config, locks.clone()));
    let key = session_key();

    // Background task: release round locks whose holder outlived the lock timeout
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(LOCK_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let released = locks.sweep_stale();
            if released > 0 {
                log::warn!("Released {} stale round lock(s)", released);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(SessionMiddleware::new(CookieSessionStore::default(), key.clone()))
            .app_data(state.clone())
            .service(api_health)
            .service(api_sign_in)
            .service(api_sign_out)
            .service(api_create_tournament)
            .service(api_add_player)
            .service(api_start_tournament)
            .service(api_get_round)
            .service(api_close_round)
            .service(api_reopen_round)
            .service(api_report_result)
            .service(api_confirm_result)
            .service(api_admin_set_result)
            .service(api_clear_result)
            .service(api_use_comodin)
            .service(api_propose_date)
            .service(api_accept_date)
            .service(api_rankings)
            .service(api_rankings_csv)
    })
    .bind(bind)?
    .run()
    .await
}
