//! SQLite-based storage for todos and game progression.
//!
//! Provides persistent storage for:
//! - Todos
//! - The single player's game stats
//! - Unlocked achievements
//! - Key-value store for application state (e.g. the CLI's mine scene)

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::game::{AchievementId, GameStats};
use crate::todo::{Priority, Todo, TodoCategory};

/// Upper bound on todos returned by a listing.
pub const MAX_LISTED_TODOS: usize = 1000;

const TODO_COLUMNS: &str =
    "id, title, description, priority, category, completed, created_at, completed_at";

const STATS_COLUMNS: &str = "user_id, level, coins, mining_power, auto_miners, auto_mining_rate,
     efficiency_level, total_todos_completed, current_streak, best_streak,
     last_activity, last_completion_at";

fn parse_priority(s: &str) -> Priority {
    s.parse().unwrap_or_default()
}

fn parse_category(s: &str) -> TodoCategory {
    s.parse().unwrap_or_default()
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_datetime(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_todo(row: &rusqlite::Row) -> Result<Todo, rusqlite::Error> {
    let priority: String = row.get(3)?;
    let category: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: parse_priority(&priority),
        category: parse_category(&category),
        completed: row.get(5)?,
        created_at: parse_datetime_fallback(&created_at),
        completed_at: parse_optional_datetime(row.get(7)?),
    })
}

fn row_to_stats(row: &rusqlite::Row) -> Result<GameStats, rusqlite::Error> {
    let last_activity: String = row.get(10)?;
    Ok(GameStats {
        user_id: row.get(0)?,
        level: row.get(1)?,
        coins: row.get(2)?,
        mining_power: row.get(3)?,
        auto_miners: row.get(4)?,
        auto_mining_rate: row.get(5)?,
        efficiency_level: row.get(6)?,
        total_todos_completed: row.get(7)?,
        current_streak: row.get(8)?,
        best_streak: row.get(9)?,
        last_activity: parse_datetime_fallback(&last_activity),
        last_completion_at: parse_optional_datetime(row.get(11)?),
    })
}

/// SQLite database for todos and game state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/todomine.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("todomine.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (tests, ephemeral servers).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `f` inside a transaction; any error rolls everything back.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // === Todos ===

    pub fn insert_todo(&self, todo: &Todo) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO todos (id, title, description, priority, category, completed, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                todo.id,
                todo.title,
                todo.description,
                todo.priority.as_str(),
                todo.category.as_str(),
                todo.completed,
                todo.created_at.to_rfc3339(),
                todo.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn get_todo(&self, id: &str) -> Result<Option<Todo>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
                params![id],
                row_to_todo,
            )
            .optional()
    }

    /// Oldest first, at most [`MAX_LISTED_TODOS`].
    pub fn list_todos(&self) -> Result<Vec<Todo>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TODO_COLUMNS} FROM todos ORDER BY created_at ASC, rowid ASC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![MAX_LISTED_TODOS as i64], row_to_todo)?;
        let todos = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    /// Returns `false` when no todo has this id.
    pub fn update_todo(&self, todo: &Todo) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET title = ?2, description = ?3, priority = ?4, category = ?5,
                 completed = ?6, completed_at = ?7
             WHERE id = ?1",
            params![
                todo.id,
                todo.title,
                todo.description,
                todo.priority.as_str(),
                todo.category.as_str(),
                todo.completed,
                todo.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Returns `false` when no todo has this id.
    pub fn delete_todo(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let deleted = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // === Game stats ===

    pub fn load_stats(&self, user_id: &str) -> Result<Option<GameStats>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {STATS_COLUMNS} FROM game_stats WHERE user_id = ?1"),
                params![user_id],
                row_to_stats,
            )
            .optional()
    }

    /// Insert or overwrite the stats row for `stats.user_id`.
    pub fn save_stats(&self, stats: &GameStats) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO game_stats ({STATS_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                stats.user_id,
                stats.level,
                stats.coins,
                stats.mining_power,
                stats.auto_miners,
                stats.auto_mining_rate,
                stats.efficiency_level,
                stats.total_todos_completed as i64,
                stats.current_streak,
                stats.best_streak,
                stats.last_activity.to_rfc3339(),
                stats.last_completion_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    // === Achievements ===

    /// Unlocked achievements with their unlock time, oldest first.
    /// Rows with ids no longer in the catalog are skipped.
    pub fn unlocked_achievements(
        &self,
        user_id: &str,
    ) -> Result<Vec<(AchievementId, DateTime<Utc>)>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, unlocked_at FROM achievements WHERE user_id = ?1 ORDER BY unlocked_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut unlocked = Vec::new();
        for row in rows {
            let (id, at) = row?;
            if let Ok(id) = id.parse::<AchievementId>() {
                unlocked.push((id, parse_datetime_fallback(&at)));
            }
        }
        Ok(unlocked)
    }

    /// Returns `false` if the achievement was already recorded.
    pub fn record_achievement(
        &self,
        user_id: &str,
        id: AchievementId,
        at: DateTime<Utc>,
    ) -> Result<bool, rusqlite::Error> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO achievements (id, user_id, unlocked_at) VALUES (?1, ?2, ?3)",
            params![id.as_str(), user_id, at.to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    // === Key-value ===

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::game::DEFAULT_USER;
    use crate::todo::{NewTodo, TodoPatch};

    fn todo(title: &str) -> Todo {
        NewTodo::new(title).into_todo().unwrap()
    }

    #[test]
    fn todo_crud() {
        let db = Database::open_memory().unwrap();
        let mut t = todo("Sharpen pickaxe");
        db.insert_todo(&t).unwrap();

        let loaded = db.get_todo(&t.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Sharpen pickaxe");
        assert_eq!(loaded.priority, Priority::Medium);

        t.apply(&TodoPatch::complete(), Utc::now()).unwrap();
        assert!(db.update_todo(&t).unwrap());
        let loaded = db.get_todo(&t.id).unwrap().unwrap();
        assert!(loaded.completed);
        assert!(loaded.completed_at.is_some());

        assert!(db.delete_todo(&t.id).unwrap());
        assert!(db.get_todo(&t.id).unwrap().is_none());
        assert!(!db.delete_todo(&t.id).unwrap());
    }

    #[test]
    fn update_missing_todo_reports_false() {
        let db = Database::open_memory().unwrap();
        assert!(!db.update_todo(&todo("ghost")).unwrap());
    }

    #[test]
    fn list_is_oldest_first() {
        let db = Database::open_memory().unwrap();
        let mut first = todo("first");
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = todo("second");
        db.insert_todo(&second).unwrap();
        db.insert_todo(&first).unwrap();
        let titles: Vec<_> = db
            .list_todos()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn stats_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_stats(DEFAULT_USER).unwrap().is_none());

        let mut stats = GameStats::default();
        stats.coins = 1234;
        stats.auto_miners = 2;
        stats.efficiency_level = 1;
        stats.recompute_auto_mining_rate();
        stats.last_completion_at = Some(Utc::now());
        db.save_stats(&stats).unwrap();

        let loaded = db.load_stats(DEFAULT_USER).unwrap().unwrap();
        assert_eq!(loaded.coins, 1234);
        assert_eq!(loaded.auto_miners, 2);
        assert_eq!(loaded.auto_mining_rate, 3.0);
        assert!(loaded.last_completion_at.is_some());

        stats.coins = 5;
        db.save_stats(&stats).unwrap();
        assert_eq!(db.load_stats(DEFAULT_USER).unwrap().unwrap().coins, 5);
    }

    #[test]
    fn achievements_are_recorded_once() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        assert!(db
            .record_achievement(DEFAULT_USER, AchievementId::FirstTask, now)
            .unwrap());
        assert!(!db
            .record_achievement(DEFAULT_USER, AchievementId::FirstTask, now)
            .unwrap());
        let unlocked = db.unlocked_achievements(DEFAULT_USER).unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].0, AchievementId::FirstTask);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = Database::open_memory().unwrap();
        let t = todo("rollback me");
        let result: Result<()> = db.transaction(|db| {
            db.insert_todo(&t)?;
            Err(CoreError::Custom("boom".into()))
        });
        assert!(result.is_err());
        assert!(db.get_todo(&t.id).unwrap().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todomine.db");
        let t = todo("persist");
        {
            let db = Database::open_at(&path).unwrap();
            db.insert_todo(&t).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_todo(&t.id).unwrap().unwrap().title, "persist");
    }
}
