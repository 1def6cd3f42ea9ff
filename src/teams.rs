// Team lifecycle: registration into tournaments, renames, deletion.
// Teams are created by regular users only, and only the creator may
// change or remove one.

use serde::Deserialize;

use crate::auth::Actor;
use crate::db::Database;
use crate::dto::{self, TeamView};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct TeamRequest {
    pub name: String,
    pub description: Option<String>,
    pub tournament_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create(db: &Database, req: &TeamRequest, actor: &Actor) -> ApiResult<TeamView> {
    // Admins run tournaments; they do not enter them.
    if actor.is_admin() {
        return Err(ApiError::Forbidden("Administrators cannot create teams"));
    }

    let tournament = db
        .get_tournament(req.tournament_id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;

    if db.count_teams(tournament.id).await? >= tournament.max_teams {
        return Err(ApiError::CapacityExceeded);
    }

    if db.team_name_exists(tournament.id, &req.name).await? {
        return Err(ApiError::DuplicateName(
            "Team name already exists in this tournament",
        ));
    }

    let team = match db
        .create_team(
            &req.name,
            req.description.as_deref().unwrap_or(""),
            tournament.id,
            actor.id,
        )
        .await
    {
        Ok(team) => team,
        // Backstop for a create race on the same name
        Err(e) if e.to_string().contains("UNIQUE") => {
            return Err(ApiError::DuplicateName(
                "Team name already exists in this tournament",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(dto::team_view(&team, &tournament))
}

pub async fn list(db: &Database) -> ApiResult<Vec<TeamView>> {
    let teams = db.list_teams().await?;
    views_for(db, teams).await
}

pub async fn list_by_tournament(db: &Database, tournament_id: i64) -> ApiResult<Vec<TeamView>> {
    let tournament = db
        .get_tournament(tournament_id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;
    let teams = db.list_teams_by_tournament(tournament_id).await?;
    Ok(teams
        .iter()
        .map(|team| dto::team_view(team, &tournament))
        .collect())
}

pub async fn list_by_user(db: &Database, actor: &Actor) -> ApiResult<Vec<TeamView>> {
    let teams = db.list_teams_by_user(actor.id).await?;
    views_for(db, teams).await
}

pub async fn get(db: &Database, id: i64) -> ApiResult<TeamView> {
    let team = db.get_team(id).await?.ok_or(ApiError::NotFound("Team"))?;
    let tournament = db
        .get_tournament(team.tournament_id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;
    Ok(dto::team_view(&team, &tournament))
}

pub async fn update(
    db: &Database,
    id: i64,
    req: &UpdateTeamRequest,
    actor: &Actor,
) -> ApiResult<TeamView> {
    let team = db.get_team(id).await?.ok_or(ApiError::NotFound("Team"))?;

    if team.created_by != actor.id {
        return Err(ApiError::Forbidden(
            "You can only update teams that you created",
        ));
    }

    // Renaming must not collide with another team in the same tournament;
    // keeping the current name is always fine.
    if team.name != req.name && db.team_name_exists(team.tournament_id, &req.name).await? {
        return Err(ApiError::DuplicateName(
            "Team name already exists in this tournament",
        ));
    }

    let updated = db
        .update_team(id, &req.name, req.description.as_deref().unwrap_or(""))
        .await?
        .ok_or(ApiError::NotFound("Team"))?;

    let tournament = db
        .get_tournament(updated.tournament_id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;
    Ok(dto::team_view(&updated, &tournament))
}

pub async fn delete(db: &Database, id: i64, actor: &Actor) -> ApiResult<()> {
    let team = db.get_team(id).await?.ok_or(ApiError::NotFound("Team"))?;

    if team.created_by != actor.id {
        return Err(ApiError::Forbidden(
            "You can only delete teams that you created",
        ));
    }

    db.delete_team(id).await?;
    Ok(())
}

/// Projects teams that may span several tournaments, loading each
/// tournament once.
async fn views_for(db: &Database, teams: Vec<crate::db::Team>) -> ApiResult<Vec<TeamView>> {
    let tournaments = db.list_tournaments().await?;
    teams
        .iter()
        .map(|team| {
            let tournament = tournaments
                .iter()
                .find(|t| t.id == team.tournament_id)
                .ok_or(ApiError::NotFound("Tournament"))?;
            Ok(dto::team_view(team, tournament))
        })
        .collect()
}
