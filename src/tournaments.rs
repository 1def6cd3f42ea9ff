// Tournament lifecycle: creation, updates, status changes, deletion.
// Every mutation is admin-gated.

use serde::Deserialize;

use crate::auth::Actor;
use crate::db::Database;
use crate::dto::{self, TournamentView};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl TournamentStatus {
    /// Parse the DB representation ("UPCOMING", "ONGOING", ...).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "UPCOMING" => Some(Self::Upcoming),
            "ONGOING" => Some(Self::Ongoing),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::Ongoing => "ONGOING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TournamentRequest {
    pub name: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub max_teams: i64,
}

pub async fn create(
    db: &Database,
    req: &TournamentRequest,
    actor: &Actor,
) -> ApiResult<TournamentView> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can create tournaments",
        ));
    }

    let tournament = db
        .create_tournament(
            &req.name,
            req.description.as_deref().unwrap_or(""),
            &req.start_date,
            &req.end_date,
            req.max_teams,
            actor.id,
        )
        .await?;

    Ok(dto::tournament_view(&tournament, &[]))
}

/// All tournaments, newest first, each with its full team list.
pub async fn list(db: &Database) -> ApiResult<Vec<TournamentView>> {
    let tournaments = db.list_tournaments().await?;
    let teams = db.list_teams().await?;

    Ok(tournaments
        .iter()
        .map(|t| {
            let members: Vec<_> = teams
                .iter()
                .filter(|team| team.tournament_id == t.id)
                .cloned()
                .collect();
            dto::tournament_view(t, &members)
        })
        .collect())
}

pub async fn get(db: &Database, id: i64) -> ApiResult<TournamentView> {
    let tournament = db
        .get_tournament(id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;
    let teams = db.list_teams_by_tournament(id).await?;
    Ok(dto::tournament_view(&tournament, &teams))
}

/// Overwrites name/description/dates/capacity. Status is not touched
/// here; `update_status` is the only path that changes it.
pub async fn update(
    db: &Database,
    id: i64,
    req: &TournamentRequest,
    actor: &Actor,
) -> ApiResult<TournamentView> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can update tournaments",
        ));
    }

    let tournament = db
        .update_tournament(
            id,
            &req.name,
            req.description.as_deref().unwrap_or(""),
            &req.start_date,
            &req.end_date,
            req.max_teams,
        )
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;

    let teams = db.list_teams_by_tournament(id).await?;
    Ok(dto::tournament_view(&tournament, &teams))
}

/// Sets the status directly. Any status may follow any other; no
/// transition graph is enforced.
pub async fn update_status(
    db: &Database,
    id: i64,
    status: &str,
    actor: &Actor,
) -> ApiResult<TournamentView> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can update tournament status",
        ));
    }

    let status = TournamentStatus::from_str_name(status)
        .ok_or_else(|| ApiError::Validation(format!("Unknown status: {status}")))?;

    if !db.update_tournament_status(id, status.as_str()).await? {
        return Err(ApiError::NotFound("Tournament"));
    }

    get(db, id).await
}

/// Deletes the tournament and, through cascade, all of its teams and
/// groups.
pub async fn delete(db: &Database, id: i64, actor: &Actor) -> ApiResult<()> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can delete tournaments",
        ));
    }

    if !db.delete_tournament(id).await? {
        return Err(ApiError::NotFound("Tournament"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            TournamentStatus::from_str_name("UPCOMING"),
            Some(TournamentStatus::Upcoming)
        );
        assert_eq!(
            TournamentStatus::from_str_name("CANCELLED"),
            Some(TournamentStatus::Cancelled)
        );
        assert_eq!(TournamentStatus::from_str_name("upcoming"), None);
        assert_eq!(TournamentStatus::from_str_name("FINISHED"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TournamentStatus::Upcoming,
            TournamentStatus::Ongoing,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(
                TournamentStatus::from_str_name(status.as_str()),
                Some(status)
            );
        }
    }
}
