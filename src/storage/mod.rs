use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the service indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct UserRow {
    pub id: String,
    /// Spendable balance in UZS minor units. Never negative: the only debit
    /// path is the conditional UPDATE in [`Storage::debit_wallet`].
    pub wallet_balance: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct StreakRow {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    /// Calendar date of the last qualifying activity, `YYYY-MM-DD` (UTC).
    /// NULL until the first progress event.
    pub last_activity_date: Option<String>,
    pub freeze_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ProfileRow {
    pub user_id: String,
    pub total_xp: i64,
    /// League assignment, maintained by an external ranking job. Read-only here.
    pub league: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ProgressRow {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: String,
    pub progress_seconds: i64,
    pub completed: bool,
    pub last_accessed: String,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("makond.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions as _;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        let create_stmts = [
            "CREATE TABLE IF NOT EXISTS users (
                id             TEXT PRIMARY KEY,
                wallet_balance INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS auth_sessions (
                token      TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS user_streaks (
                user_id            TEXT PRIMARY KEY REFERENCES users(id),
                current_streak     INTEGER NOT NULL DEFAULT 0,
                longest_streak     INTEGER NOT NULL DEFAULT 0,
                last_activity_date TEXT,
                freeze_count       INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS gamification_profiles (
                user_id    TEXT PRIMARY KEY REFERENCES users(id),
                total_xp   INTEGER NOT NULL DEFAULT 0,
                league     TEXT NOT NULL DEFAULT 'bronze',
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS user_progress (
                id               TEXT PRIMARY KEY,
                user_id          TEXT NOT NULL REFERENCES users(id),
                course_id        TEXT NOT NULL,
                lesson_id        TEXT NOT NULL,
                progress_seconds INTEGER NOT NULL DEFAULT 0,
                completed        INTEGER NOT NULL DEFAULT 0,
                last_accessed    TEXT NOT NULL,
                UNIQUE(user_id, lesson_id)
            )",
        ];
        for stmt in create_stmts {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .context("create ledger tables")?;
        }
        Ok(())
    }

    // ─── Users & auth sessions ──────────────────────────────────────────────

    /// Provision a user account with an opening wallet balance.
    /// The hosted auth provider owns sign-up; this mirrors its user row locally.
    pub async fn create_user(&self, wallet_balance: i64) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO users (id, wallet_balance, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(wallet_balance)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_user(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Issue a bearer token for the given user. The token is the caller's
    /// request-scoped identity: every authenticated endpoint resolves it back
    /// to a user id via [`Storage::resolve_token`].
    pub async fn issue_token(&self, user_id: &str) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(&now)
            .execute(&self.pool)
            .await
            .context("issue auth token")?;
        Ok(token)
    }

    /// Map a bearer token to its user id. `None` means the token is unknown.
    pub async fn resolve_token(&self, token: &str) -> Result<Option<String>> {
        Ok(
            sqlx::query_scalar("SELECT user_id FROM auth_sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    // ─── Wallet ─────────────────────────────────────────────────────────────

    pub async fn wallet_balance(&self, user_id: &str) -> Result<Option<i64>> {
        Ok(
            sqlx::query_scalar("SELECT wallet_balance FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Debit the wallet by `amount`, but only if the balance covers it.
    ///
    /// The funds check lives in the WHERE clause, so concurrent purchases by
    /// the same user cannot both pass validation and drive the balance
    /// negative. Returns `false` (no mutation) on insufficient funds.
    pub async fn debit_wallet(&self, user_id: &str, amount: i64) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE users SET wallet_balance = wallet_balance - ?
              WHERE id = ? AND wallet_balance >= ?",
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .context("debit wallet")?
        .rows_affected();
        Ok(rows_affected > 0)
    }

    // ─── Streaks ────────────────────────────────────────────────────────────

    pub async fn get_streak(&self, user_id: &str) -> Result<Option<StreakRow>> {
        Ok(sqlx::query_as("SELECT * FROM user_streaks WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Fetch the streak row, seeding a zero row on first activity.
    pub async fn ensure_streak(&self, user_id: &str) -> Result<StreakRow> {
        sqlx::query("INSERT OR IGNORE INTO user_streaks (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("seed streak row")?;
        self.get_streak(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("streak row not found after seed"))
    }

    /// Persist a streak transition computed by the streak engine.
    pub async fn update_streak(
        &self,
        user_id: &str,
        current_streak: i64,
        longest_streak: i64,
        last_activity_date: &str,
        freeze_count: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE user_streaks
                SET current_streak = ?, longest_streak = ?,
                    last_activity_date = ?, freeze_count = ?
              WHERE user_id = ?",
        )
        .bind(current_streak)
        .bind(longest_streak)
        .bind(last_activity_date)
        .bind(freeze_count)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("update streak")?;
        Ok(())
    }

    /// Add one streak-freeze charge to the user's inventory, creating the
    /// streak row if this purchase precedes any lesson activity.
    pub async fn credit_freeze(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_streaks (user_id, freeze_count) VALUES (?, 1)
             ON CONFLICT(user_id) DO UPDATE SET freeze_count = freeze_count + 1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("credit streak freeze")?;
        Ok(())
    }

    // ─── Gamification profiles ──────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM gamification_profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Increase the XP total by `amount`. The profile row is seeded lazily;
    /// XP only ever grows.
    pub async fn add_xp(&self, user_id: &str, amount: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO gamification_profiles (user_id, total_xp, updated_at) VALUES (?, 0, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "UPDATE gamification_profiles
                SET total_xp = total_xp + ?, updated_at = ?
              WHERE user_id = ?",
        )
        .bind(amount)
        .bind(&now)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("award xp")?;
        Ok(())
    }

    // ─── Lesson progress ────────────────────────────────────────────────────

    pub async fn get_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<ProgressRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM user_progress WHERE user_id = ? AND lesson_id = ?")
                .bind(user_id)
                .bind(lesson_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Upsert the per-lesson progress record, keyed on (user_id, lesson_id).
    ///
    /// `completed` is monotonic: once a lesson is completed, a later partial
    /// watch event cannot revert it (MAX of stored and incoming flag).
    pub async fn upsert_progress(
        &self,
        user_id: &str,
        course_id: &str,
        lesson_id: &str,
        progress_seconds: i64,
        completed: bool,
    ) -> Result<ProgressRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_progress
                (id, user_id, course_id, lesson_id, progress_seconds, completed, last_accessed)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                course_id        = excluded.course_id,
                progress_seconds = excluded.progress_seconds,
                completed        = MAX(user_progress.completed, excluded.completed),
                last_accessed    = excluded.last_accessed",
        )
        .bind(&id)
        .bind(user_id)
        .bind(course_id)
        .bind(lesson_id)
        .bind(progress_seconds)
        .bind(completed)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("upsert progress")?;
        self.get_progress(user_id, lesson_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("progress row not found after upsert"))
    }

    pub async fn list_progress(
        &self,
        user_id: &str,
        course_id: Option<&str>,
    ) -> Result<Vec<ProgressRow>> {
        with_timeout(async {
            let rows = match course_id {
                Some(course_id) => {
                    sqlx::query_as(
                        "SELECT * FROM user_progress
                          WHERE user_id = ? AND course_id = ?
                       ORDER BY last_accessed DESC",
                    )
                    .bind(user_id)
                    .bind(course_id)
                    .fetch_all(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as(
                        "SELECT * FROM user_progress
                          WHERE user_id = ?
                       ORDER BY last_accessed DESC",
                    )
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
                }
            };
            Ok(rows)
        })
        .await
    }
}
