// View projection: flattens the entity graph into acyclic response
// shapes. Pure functions over rows the caller has already loaded —
// projection itself never touches storage.

use serde::Serialize;

use crate::db::{Group, Team, Tournament};

/// Tournament without its team list; embedded in team views so the
/// team→tournament edge never loops back.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub max_teams: i64,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub created_at: String,
    pub tournament: TournamentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TournamentView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub max_teams: i64,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
    pub teams: Vec<TeamView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub id: i64,
    pub name: String,
    pub tournament_id: i64,
    pub tournament_name: String,
    pub created_at: String,
    pub teams: Vec<TeamView>,
}

pub fn tournament_summary(t: &Tournament) -> TournamentSummary {
    TournamentSummary {
        id: t.id,
        name: t.name.clone(),
        description: t.description.clone(),
        start_date: t.start_date.clone(),
        end_date: t.end_date.clone(),
        max_teams: t.max_teams,
        status: t.status.clone(),
        created_by: t.created_by_username.clone(),
        created_at: t.created_at.clone(),
    }
}

pub fn team_view(team: &Team, tournament: &Tournament) -> TeamView {
    TeamView {
        id: team.id,
        name: team.name.clone(),
        description: team.description.clone(),
        created_by: team.created_by_username.clone(),
        created_at: team.created_at.clone(),
        tournament: tournament_summary(tournament),
        group_id: team.group_id,
        group_name: team.group_name.clone(),
    }
}

/// Team as rendered inside its group: the group is the context, so the
/// group back-reference is dropped.
pub fn team_view_in_group(team: &Team, tournament: &Tournament) -> TeamView {
    TeamView {
        group_id: None,
        group_name: None,
        ..team_view(team, tournament)
    }
}

pub fn tournament_view(t: &Tournament, teams: &[Team]) -> TournamentView {
    TournamentView {
        id: t.id,
        name: t.name.clone(),
        description: t.description.clone(),
        start_date: t.start_date.clone(),
        end_date: t.end_date.clone(),
        max_teams: t.max_teams,
        status: t.status.clone(),
        created_by: t.created_by_username.clone(),
        created_at: t.created_at.clone(),
        teams: teams.iter().map(|team| team_view(team, t)).collect(),
    }
}

/// `teams` must already be filtered to this group's members.
pub fn group_view(group: &Group, teams: &[Team], tournament: &Tournament) -> GroupView {
    GroupView {
        id: group.id,
        name: group.name.clone(),
        tournament_id: group.tournament_id,
        tournament_name: group.tournament_name.clone(),
        created_at: group.created_at.clone(),
        teams: teams
            .iter()
            .map(|team| team_view_in_group(team, tournament))
            .collect(),
    }
}
