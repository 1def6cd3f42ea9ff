// Integration tests for the group assignment engine: the validation
// chain, round-robin balance, the one-shot guarantee, and the
// delete-then-reassign reset cycle.

use rand::rngs::StdRng;
use rand::SeedableRng;

use groupstage_backend::auth::{Actor, Role};
use groupstage_backend::db::Database;
use groupstage_backend::dto::GroupView;
use groupstage_backend::error::ApiError;
use groupstage_backend::groups;
use groupstage_backend::teams::{self, TeamRequest};
use groupstage_backend::tournaments::{self, TournamentRequest};

async fn test_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

async fn admin_actor(db: &Database) -> Actor {
    let user = db
        .create_user("admin", "admin@example.com", "hash", "ADMIN")
        .await
        .unwrap();
    Actor {
        id: user.id,
        username: user.username,
        role: Role::Admin,
    }
}

async fn user_actor(db: &Database, name: &str) -> Actor {
    let email = format!("{name}@example.com");
    let user = db.create_user(name, &email, "hash", "USER").await.unwrap();
    Actor {
        id: user.id,
        username: user.username,
        role: Role::User,
    }
}

/// Creates a tournament with `max_teams` capacity and registers
/// `team_count` teams into it.
async fn full_tournament(
    db: &Database,
    admin: &Actor,
    user: &Actor,
    max_teams: i64,
    team_count: usize,
) -> i64 {
    let request = TournamentRequest {
        name: "Cup".to_string(),
        description: None,
        start_date: "2026-06-01T00:00:00".to_string(),
        end_date: "2026-06-14T00:00:00".to_string(),
        max_teams,
    };
    let tournament = tournaments::create(db, &request, admin).await.unwrap();
    for i in 0..team_count {
        teams::create(
            db,
            &TeamRequest {
                name: format!("Team {i}"),
                description: None,
                tournament_id: tournament.id,
            },
            user,
        )
        .await
        .unwrap();
    }
    tournament.id
}

fn sorted_sizes(views: &[GroupView]) -> Vec<usize> {
    let mut sizes: Vec<usize> = views.iter().map(|g| g.teams.len()).collect();
    sizes.sort_unstable();
    sizes
}

fn all_member_names(views: &[GroupView]) -> Vec<String> {
    let mut names: Vec<String> = views
        .iter()
        .flat_map(|g| g.teams.iter().map(|t| t.name.clone()))
        .collect();
    names.sort();
    names
}

// ── Validation chain ─────────────────────────────────────────────────

#[tokio::test]
async fn test_assign_requires_admin() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    let err = groups::assign(&db, tid, 2, &user).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn test_assign_unknown_tournament() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;

    let err = groups::assign(&db, 999, 2, &admin).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_assign_fails_until_full() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 3).await;

    let err = groups::assign(&db, tid, 2, &admin).await.unwrap_err();
    match err {
        ApiError::NotFull { current, max } => {
            assert_eq!(current, 3);
            assert_eq!(max, 4);
        }
        other => panic!("expected NotFull, got {other:?}"),
    }
}

#[tokio::test]
async fn test_group_count_bounds() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    for bad in [0, 1, 5, 6] {
        let err = groups::assign(&db, tid, bad, &admin).await.unwrap_err();
        assert!(
            matches!(err, ApiError::InvalidGroupCount { max: 4 }),
            "group_count={bad}"
        );
    }
}

// ── Successful assignment ────────────────────────────────────────────

#[tokio::test]
async fn test_assign_four_teams_into_two_groups() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    let views = groups::assign(&db, tid, 2, &admin).await.unwrap();

    assert_eq!(views.len(), 2);
    assert_eq!(views[0].name, "Group A");
    assert_eq!(views[1].name, "Group B");
    assert_eq!(views[0].tournament_name, "Cup");
    assert_eq!(sorted_sizes(&views), vec![2, 2]);

    // Every team exactly once across the groups
    let names = all_member_names(&views);
    assert_eq!(names, vec!["Team 0", "Team 1", "Team 2", "Team 3"]);

    // Group context omits the group back-reference on each team
    assert!(views[0].teams.iter().all(|t| t.group_id.is_none()));
}

#[tokio::test]
async fn test_assign_four_teams_into_three_groups() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    let views = groups::assign(&db, tid, 3, &admin).await.unwrap();
    assert_eq!(sorted_sizes(&views), vec![1, 1, 2]);
    assert_eq!(all_member_names(&views).len(), 4);
}

#[tokio::test]
async fn test_assign_tolerates_overfull_tournament() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 2, 2).await;

    // A third team slipped past capacity (e.g. the limit was lowered
    // afterwards); assignment only checks the lower bound.
    db.create_team("Extra", "", tid, user.id).await.unwrap();

    let views = groups::assign(&db, tid, 2, &admin).await.unwrap();
    assert_eq!(sorted_sizes(&views), vec![1, 2]);
    assert_eq!(all_member_names(&views).len(), 3);
}

#[tokio::test]
async fn test_group_sizes_balanced_for_larger_field() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 10, 10).await;

    let views = groups::assign(&db, tid, 3, &admin).await.unwrap();
    // 10 teams into 3 groups: ceil=4, floor=3
    assert_eq!(sorted_sizes(&views), vec![3, 3, 4]);

    let listed = groups::list_by_tournament(&db, tid).await.unwrap();
    assert_eq!(sorted_sizes(&listed), vec![3, 3, 4]);
    assert_eq!(all_member_names(&listed), all_member_names(&views));
}

#[tokio::test]
async fn test_assigned_teams_carry_group_reference() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    groups::assign(&db, tid, 2, &admin).await.unwrap();

    // Outside the group context, each team view names its group
    let team_views = teams::list_by_tournament(&db, tid).await.unwrap();
    assert!(team_views.iter().all(|t| t.group_id.is_some()));
    assert!(team_views
        .iter()
        .all(|t| matches!(t.group_name.as_deref(), Some("Group A") | Some("Group B"))));
}

// ── One-shot guarantee and reset ─────────────────────────────────────

#[tokio::test]
async fn test_assign_is_one_shot() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    groups::assign(&db, tid, 2, &admin).await.unwrap();

    let err = groups::assign(&db, tid, 2, &admin).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyAssigned));
    // A different group count changes nothing
    let err = groups::assign(&db, tid, 4, &admin).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyAssigned));
}

#[tokio::test]
async fn test_delete_then_reassign() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;

    groups::assign(&db, tid, 2, &admin).await.unwrap();
    groups::delete_by_tournament(&db, tid, &admin).await.unwrap();

    // Teams survive the reset with their group reference cleared
    let team_views = teams::list_by_tournament(&db, tid).await.unwrap();
    assert_eq!(team_views.len(), 4);
    assert!(team_views.iter().all(|t| t.group_id.is_none()));
    assert!(groups::list_by_tournament(&db, tid).await.unwrap().is_empty());

    // Same parameters are valid again
    let views = groups::assign(&db, tid, 2, &admin).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].name, "Group A");
}

#[tokio::test]
async fn test_delete_groups_requires_admin_and_tournament() {
    let db = test_db().await;
    let admin = admin_actor(&db).await;
    let user = user_actor(&db, "alice").await;
    let tid = full_tournament(&db, &admin, &user, 4, 4).await;
    groups::assign(&db, tid, 2, &admin).await.unwrap();

    let err = groups::delete_by_tournament(&db, tid, &user)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = groups::delete_by_tournament(&db, 999, &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_list_groups_unknown_tournament() {
    let db = test_db().await;
    let err = groups::list_by_tournament(&db, 999).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

// ── Determinism under an injected RNG ────────────────────────────────

#[tokio::test]
async fn test_seeded_assignment_is_reproducible() {
    let mut placements = Vec::new();

    // Two identically seeded databases and RNGs end up with identical
    // group membership.
    for _ in 0..2 {
        let db = test_db().await;
        let admin = admin_actor(&db).await;
        let user = user_actor(&db, "alice").await;
        let tid = full_tournament(&db, &admin, &user, 6, 6).await;

        let mut rng = StdRng::seed_from_u64(7);
        let views = groups::assign_with_rng(&db, tid, 3, &admin, &mut rng)
            .await
            .unwrap();

        let by_group: Vec<(String, Vec<String>)> = views
            .iter()
            .map(|g| {
                (
                    g.name.clone(),
                    g.teams.iter().map(|t| t.name.clone()).collect(),
                )
            })
            .collect();
        placements.push(by_group);
    }

    assert_eq!(placements[0], placements[1]);
}
