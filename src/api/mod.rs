// HTTP API routes. Handlers stay thin: build an Actor from the bearer
// token, delegate to the lifecycle managers, let ApiError render the
// failure.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::db::Database;
use crate::error::ApiError;
use crate::groups;
use crate::teams::{self, TeamRequest, UpdateTeamRequest};
use crate::tournaments::{self, TournamentRequest};

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct AssignGroupsRequest {
    pub group_count: usize,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(db: Arc<Database>) -> Router {
    let state = AppState { db };

    Router::new()
        // Tournaments
        .route(
            "/api/tournaments",
            get(list_tournaments).post(create_tournament),
        )
        .route(
            "/api/tournaments/{id}",
            get(get_tournament)
                .put(update_tournament)
                .delete(delete_tournament),
        )
        .route(
            "/api/tournaments/{id}/status",
            put(update_tournament_status),
        )
        .route("/api/tournaments/{id}/teams", get(list_tournament_teams))
        // Groups (scoped to their tournament)
        .route(
            "/api/tournaments/{id}/groups",
            get(list_groups).post(assign_groups).delete(delete_groups),
        )
        // Teams
        .route("/api/teams", get(list_teams).post(create_team))
        .route("/api/teams/mine", get(list_my_teams))
        .route(
            "/api/teams/{id}",
            get(get_team).put(update_team).delete(delete_team),
        )
        .with_state(state)
}

// ── Tournament handlers ───────────────────────────────────────────────

fn validate_tournament_request(req: &TournamentRequest) -> Result<(), ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    if req.max_teams < 1 {
        return Err(ApiError::Validation(
            "max_teams must be at least 1".to_string(),
        ));
    }
    Ok(())
}

async fn list_tournaments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let views = tournaments::list(&state.db).await?;
    Ok(Json(views))
}

async fn create_tournament(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TournamentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_tournament_request(&req)?;
    let actor = auth.actor()?;
    let view = tournaments::create(&state.db, &req, &actor).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let view = tournaments::get(&state.db, id).await?;
    Ok(Json(view))
}

async fn update_tournament(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<TournamentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_tournament_request(&req)?;
    let actor = auth.actor()?;
    let view = tournaments::update(&state.db, id, &req, &actor).await?;
    Ok(Json(view))
}

async fn update_tournament_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth.actor()?;
    let view = tournaments::update_status(&state.db, id, &req.status, &actor).await?;
    Ok(Json(view))
}

async fn delete_tournament(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth.actor()?;
    tournaments::delete(&state.db, id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tournament_teams(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let views = teams::list_by_tournament(&state.db, id).await?;
    Ok(Json(views))
}

// ── Group handlers ────────────────────────────────────────────────────

async fn list_groups(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let views = groups::list_by_tournament(&state.db, id).await?;
    Ok(Json(views))
}

async fn assign_groups(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<AssignGroupsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth.actor()?;
    let views = groups::assign(&state.db, id, req.group_count, &actor).await?;
    Ok((StatusCode::CREATED, Json(views)))
}

async fn delete_groups(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth.actor()?;
    groups::delete_by_tournament(&state.db, id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Team handlers ─────────────────────────────────────────────────────

async fn list_teams(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let views = teams::list(&state.db).await?;
    Ok(Json(views))
}

async fn list_my_teams(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth.actor()?;
    let views = teams::list_by_user(&state.db, &actor).await?;
    Ok(Json(views))
}

async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let actor = auth.actor()?;
    let view = teams::create(&state.db, &req, &actor).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let view = teams::get(&state.db, id).await?;
    Ok(Json(view))
}

async fn update_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let actor = auth.actor()?;
    let view = teams::update(&state.db, id, &req, &actor).await?;
    Ok(Json(view))
}

async fn delete_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = auth.actor()?;
    teams::delete(&state.db, id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
