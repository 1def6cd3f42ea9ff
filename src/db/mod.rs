// Database access layer (SQLite via sqlx).

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub active: bool,
    pub created_at: String,
}

/// Tournament row, with the creator's username joined in so projections
/// never need a second lookup.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub max_teams: i64,
    pub status: String,
    pub created_by: i64,
    pub created_by_username: String,
    pub created_at: String,
}

/// Team row with creator username and (optional) group name joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub tournament_id: i64,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub created_by: i64,
    pub created_by_username: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub tournament_id: i64,
    pub tournament_name: String,
    pub created_at: String,
}

const TEAM_SELECT: &str = "SELECT t.id, t.name, t.description, t.tournament_id, t.group_id, \
     g.name AS group_name, t.created_by, u.username AS created_by_username, t.created_at \
     FROM teams t \
     JOIN users u ON u.id = t.created_by \
     LEFT JOIN groups g ON g.id = t.group_id";

const TOURNAMENT_SELECT: &str = "SELECT t.id, t.name, t.description, t.start_date, t.end_date, \
     t.max_teams, t.status, t.created_by, u.username AS created_by_username, t.created_at \
     FROM tournaments t \
     JOIN users u ON u.id = t.created_by";

const GROUP_SELECT: &str = "SELECT g.id, g.name, g.tournament_id, \
     t.name AS tournament_name, g.created_at \
     FROM groups g \
     JOIN tournaments t ON t.id = g.tournament_id";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Cascades and SET NULL on group deletion depend on the
        // foreign_keys pragma, which is off by default in SQLite.
        let options = SqliteConnectOptions::from_str(database_url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'USER',
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournaments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                max_teams INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'UPCOMING',
                created_by INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(tournament_id, name)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                group_id INTEGER REFERENCES groups(id) ON DELETE SET NULL,
                created_by INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(tournament_id, name)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?) \
             RETURNING id, username, email, password_hash, role, active, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role, active, created_at \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role, active, created_at \
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, role, active, created_at \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ── Tournaments ───────────────────────────────────────────────────

    pub async fn create_tournament(
        &self,
        name: &str,
        description: &str,
        start_date: &str,
        end_date: &str,
        max_teams: i64,
        created_by: i64,
    ) -> Result<Tournament, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tournaments (name, description, start_date, end_date, max_teams, created_by) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(start_date)
        .bind(end_date)
        .bind(max_teams)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        self.get_tournament(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// All tournaments, newest first. The TEXT timestamp has one-second
    /// granularity, so id breaks ties for same-second inserts.
    pub async fn list_tournaments(&self) -> Result<Vec<Tournament>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Tournament>(&format!(
            "{TOURNAMENT_SELECT} ORDER BY t.created_at DESC, t.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_tournament(&self, id: i64) -> Result<Option<Tournament>, sqlx::Error> {
        let row = sqlx::query_as::<_, Tournament>(&format!("{TOURNAMENT_SELECT} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_tournament(
        &self,
        id: i64,
        name: &str,
        description: &str,
        start_date: &str,
        end_date: &str,
        max_teams: i64,
    ) -> Result<Option<Tournament>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tournaments SET name = ?, description = ?, start_date = ?, end_date = ?, \
             max_teams = ? WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(start_date)
        .bind(end_date)
        .bind(max_teams)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_tournament(id).await
    }

    pub async fn update_tournament_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tournaments SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes the tournament; its teams and groups go with it via
    /// ON DELETE CASCADE.
    pub async fn delete_tournament(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tournaments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Teams ─────────────────────────────────────────────────────────

    pub async fn create_team(
        &self,
        name: &str,
        description: &str,
        tournament_id: i64,
        created_by: i64,
    ) -> Result<Team, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO teams (name, description, tournament_id, created_by) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(tournament_id)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        self.get_team(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Team>(&format!("{TEAM_SELECT} ORDER BY t.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_teams_by_tournament(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<Team>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Team>(&format!(
            "{TEAM_SELECT} WHERE t.tournament_id = ? ORDER BY t.id"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_teams_by_user(&self, user_id: i64) -> Result<Vec<Team>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Team>(&format!(
            "{TEAM_SELECT} WHERE t.created_by = ? ORDER BY t.id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_team(&self, id: i64) -> Result<Option<Team>, sqlx::Error> {
        let row = sqlx::query_as::<_, Team>(&format!("{TEAM_SELECT} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn count_teams(&self, tournament_id: i64) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE tournament_id = ?")
            .bind(tournament_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn team_name_exists(
        &self,
        tournament_id: i64,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM teams WHERE tournament_id = ? AND name = ?)",
        )
        .bind(tournament_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn update_team(
        &self,
        id: i64,
        name: &str,
        description: &str,
    ) -> Result<Option<Team>, sqlx::Error> {
        let result = sqlx::query("UPDATE teams SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_team(id).await
    }

    pub async fn delete_team(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Groups ────────────────────────────────────────────────────────

    pub async fn list_groups_by_tournament(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<Group>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Group>(&format!(
            "{GROUP_SELECT} WHERE g.tournament_id = ? ORDER BY g.id"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_groups(&self, tournament_id: i64) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE tournament_id = ?")
            .bind(tournament_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Creates the named groups and assigns `memberships[i]` (team ids)
    /// to the i-th group, all in one transaction.
    ///
    /// The "no groups yet" check is re-run inside the transaction;
    /// `Ok(None)` means another assignment won the race. A writer that
    /// slips past the check instead trips the UNIQUE(tournament_id, name)
    /// constraint and surfaces as an error.
    pub async fn create_groups_and_assign(
        &self,
        tournament_id: i64,
        names: &[String],
        memberships: &[Vec<i64>],
    ) -> Result<Option<Vec<Group>>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE tournament_id = ?")
                .bind(tournament_id)
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            return Ok(None);
        }

        let mut group_ids = Vec::with_capacity(names.len());
        for name in names {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO groups (name, tournament_id) VALUES (?, ?) RETURNING id",
            )
            .bind(name)
            .bind(tournament_id)
            .fetch_one(&mut *tx)
            .await?;
            group_ids.push(id);
        }

        for (group_id, team_ids) in group_ids.iter().zip(memberships) {
            for team_id in team_ids {
                sqlx::query("UPDATE teams SET group_id = ? WHERE id = ?")
                    .bind(group_id)
                    .bind(team_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        let groups = self.list_groups_by_tournament(tournament_id).await?;
        Ok(Some(groups))
    }

    /// Removes every group of the tournament. Team group references are
    /// cleared first so the deletes never see a dangling reference.
    pub async fn clear_and_delete_groups(&self, tournament_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE teams SET group_id = NULL WHERE tournament_id = ?")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM groups WHERE tournament_id = ?")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}
