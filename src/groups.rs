// Group assignment engine: once a tournament is full, an administrator
// partitions its teams into named groups. Teams are shuffled uniformly
// and dealt round-robin, so group sizes differ by at most one and the
// distribution is independent of insertion order.

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

use crate::auth::Actor;
use crate::db::Database;
use crate::dto::{self, GroupView};
use crate::error::{ApiError, ApiResult};

/// Sequential group names: "Group A", "Group B", ...
pub fn group_names(count: usize) -> Vec<String> {
    (0..count as u32)
        .map(|i| {
            let letter = char::from_u32('A' as u32 + i).unwrap_or('?');
            format!("Group {letter}")
        })
        .collect()
}

/// Deals `ids[i]` into bucket `i % group_count`. Callers shuffle first;
/// the deal itself is deterministic.
pub fn partition_round_robin(ids: &[i64], group_count: usize) -> Vec<Vec<i64>> {
    let mut groups = vec![Vec::new(); group_count];
    for (i, id) in ids.iter().enumerate() {
        groups[i % group_count].push(*id);
    }
    groups
}

/// Randomly partitions the tournament's teams into `group_count` groups.
/// One-shot per tournament: fails while any group exists.
pub async fn assign(
    db: &Database,
    tournament_id: i64,
    group_count: usize,
    actor: &Actor,
) -> ApiResult<Vec<GroupView>> {
    assign_with_rng(
        db,
        tournament_id,
        group_count,
        actor,
        &mut rand::rngs::StdRng::from_entropy(),
    )
    .await
}

/// Same as [`assign`], with the permutation source injected so tests can
/// pin the shuffle.
pub async fn assign_with_rng<R: Rng>(
    db: &Database,
    tournament_id: i64,
    group_count: usize,
    actor: &Actor,
    rng: &mut R,
) -> ApiResult<Vec<GroupView>> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can assign teams to groups",
        ));
    }

    let tournament = db
        .get_tournament(tournament_id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;

    let teams = db.list_teams_by_tournament(tournament_id).await?;
    if (teams.len() as i64) < tournament.max_teams {
        return Err(ApiError::NotFull {
            current: teams.len() as i64,
            max: tournament.max_teams,
        });
    }

    if db.count_groups(tournament_id).await? > 0 {
        return Err(ApiError::AlreadyAssigned);
    }

    if group_count < 2 || group_count > teams.len() {
        return Err(ApiError::InvalidGroupCount { max: teams.len() });
    }

    let names = group_names(group_count);
    let mut ids: Vec<i64> = teams.iter().map(|team| team.id).collect();
    ids.shuffle(rng);
    let memberships = partition_round_robin(&ids, group_count);

    // The pre-checks above run outside the transaction; the store
    // re-checks inside it, and the UNIQUE(tournament_id, name)
    // constraint catches whatever slips through. Either way a lost race
    // reads as AlreadyAssigned.
    let groups = match db
        .create_groups_and_assign(tournament_id, &names, &memberships)
        .await
    {
        Ok(Some(groups)) => groups,
        Ok(None) => return Err(ApiError::AlreadyAssigned),
        Err(e) if e.to_string().contains("UNIQUE") => return Err(ApiError::AlreadyAssigned),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Assigned {} teams of tournament {tournament_id} into {group_count} groups",
        teams.len()
    );

    let teams = db.list_teams_by_tournament(tournament_id).await?;
    Ok(groups
        .iter()
        .map(|group| {
            let members: Vec<_> = teams
                .iter()
                .filter(|team| team.group_id == Some(group.id))
                .cloned()
                .collect();
            dto::group_view(group, &members, &tournament)
        })
        .collect())
}

/// Drops every group of the tournament and clears each team's group
/// reference; the teams themselves stay. Makes the tournament eligible
/// for a fresh assignment.
pub async fn delete_by_tournament(db: &Database, tournament_id: i64, actor: &Actor) -> ApiResult<()> {
    if !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can delete groups",
        ));
    }

    if db.get_tournament(tournament_id).await?.is_none() {
        return Err(ApiError::NotFound("Tournament"));
    }

    db.clear_and_delete_groups(tournament_id).await?;
    Ok(())
}

pub async fn list_by_tournament(db: &Database, tournament_id: i64) -> ApiResult<Vec<GroupView>> {
    let tournament = db
        .get_tournament(tournament_id)
        .await?
        .ok_or(ApiError::NotFound("Tournament"))?;

    let groups = db.list_groups_by_tournament(tournament_id).await?;
    let teams = db.list_teams_by_tournament(tournament_id).await?;

    Ok(groups
        .iter()
        .map(|group| {
            let members: Vec<_> = teams
                .iter()
                .filter(|team| team.group_id == Some(group.id))
                .cloned()
                .collect();
            dto::group_view(group, &members, &tournament)
        })
        .collect())
}
