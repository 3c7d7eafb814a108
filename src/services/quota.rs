use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::{
    error::{AppError, AppResult},
    models::{user::STATUS_ACTIVE, User},
};

/// Hard cap on recommendation rows per user per UTC day
pub const MAX_DAILY: i64 = 5;

/// Remaining-allowance sentinel for quota-exempt admin accounts
pub const UNLIMITED: i64 = i64::MAX;

/// The current UTC calendar date
///
/// Quota windows and calendar days both use UTC dates, matching the stored
/// timestamps. There is no per-user timezone.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Half-open [midnight, next midnight) window for a UTC day
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Counts recommendation rows for a user on one UTC day
///
/// Runs against the pool for the advisory estimate and against an open
/// transaction for the authoritative re-check before a commit.
pub async fn count_today<'a, E>(db: E, user_id: i64, date: NaiveDate) -> AppResult<i64>
where
    E: Executor<'a, Database = Sqlite>,
{
    let (start, end) = day_bounds(date);
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recommendations
         WHERE user_id = ? AND created_at >= ? AND created_at < ?",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(db)
    .await?;

    Ok(count)
}

/// Loads a user and requires an active account
///
/// Deleted accounts are indistinguishable from missing ones to callers.
pub async fn require_active_user<'a, E>(db: E, user_id: i64) -> AppResult<User>
where
    E: Executor<'a, Database = Sqlite>,
{
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    match user {
        Some(user) if user.is_active() => Ok(user),
        _ => Err(AppError::NotFound(format!("user {}", user_id))),
    }
}

/// Advisory remaining allowance for today
///
/// Sizes the model request and rejects obviously exhausted users before
/// the network call. The number can be stale the moment it is computed;
/// the commit re-checks inside its transaction and that check is the one
/// that holds under concurrency.
pub async fn estimate_remaining<'a, E>(db: E, user: &User) -> AppResult<i64>
where
    E: Executor<'a, Database = Sqlite>,
{
    if user.is_admin() {
        return Ok(UNLIMITED);
    }

    let used = count_today(db, user.user_id, today_utc()).await?;
    Ok(MAX_DAILY - used)
}

/// Makes the user row the transaction's first write
///
/// SQLite hands the database write lock to a transaction on its first
/// write statement, so every later read-then-insert step in the
/// transaction is serialized against other writers; the equivalent of
/// locking the user row with SELECT ... FOR UPDATE. Doubles as the
/// in-transaction existence and active-status check, so an account
/// deleted after the advisory gate still cannot commit. Must be called
/// before any read in the same transaction.
pub async fn touch_user_for_update(conn: &mut SqliteConnection, user_id: i64) -> AppResult<()> {
    let done = sqlx::query("UPDATE users SET updated_at = ? WHERE user_id = ? AND status = ?")
        .bind(Utc::now())
        .bind(user_id)
        .bind(STATUS_ACTIVE)
        .execute(conn)
        .await?;

    if done.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("user {}", user_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{memory_pool, seed_daily_recommendations, seed_user};

    #[test]
    fn test_day_bounds_are_half_open_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
        let (start, end) = day_bounds(date);

        assert_eq!(start.to_rfc3339(), "2024-11-05T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2024, 11, 6).unwrap());
    }

    #[tokio::test]
    async fn test_count_today_ignores_other_days_and_users() {
        let pool = memory_pool().await;
        let user_id = seed_user(&pool, "tally@example.com", "user").await;
        let other_id = seed_user(&pool, "other@example.com", "user").await;

        let now = Utc::now();
        seed_daily_recommendations(&pool, user_id, 2, now).await;
        seed_daily_recommendations(&pool, user_id, 3, now - Duration::days(1)).await;
        seed_daily_recommendations(&pool, other_id, 4, now).await;

        let count = count_today(&pool, user_id, now.date_naive()).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_require_active_user_rejects_missing_and_deleted() {
        let pool = memory_pool().await;
        let user_id = seed_user(&pool, "gone@example.com", "user").await;
        sqlx::query("UPDATE users SET status = 'deleted' WHERE user_id = ?")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();

        let missing = require_active_user(&pool, 9999).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let deleted = require_active_user(&pool, user_id).await;
        assert!(matches!(deleted, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_estimate_remaining_counts_down_to_zero() {
        let pool = memory_pool().await;
        let user_id = seed_user(&pool, "counter@example.com", "user").await;
        let user = require_active_user(&pool, user_id).await.unwrap();

        assert_eq!(estimate_remaining(&pool, &user).await.unwrap(), MAX_DAILY);

        seed_daily_recommendations(&pool, user_id, 3, Utc::now()).await;
        assert_eq!(estimate_remaining(&pool, &user).await.unwrap(), 2);

        seed_daily_recommendations(&pool, user_id, 2, Utc::now()).await;
        assert_eq!(estimate_remaining(&pool, &user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_admin_is_exempt_even_when_over_the_cap() {
        let pool = memory_pool().await;
        let admin_id = seed_user(&pool, "admin@example.com", "admin").await;
        let admin = require_active_user(&pool, admin_id).await.unwrap();

        seed_daily_recommendations(&pool, admin_id, MAX_DAILY + 2, Utc::now()).await;
        assert_eq!(estimate_remaining(&pool, &admin).await.unwrap(), UNLIMITED);
    }

    #[tokio::test]
    async fn test_touch_user_for_update_requires_existing_row() {
        let pool = memory_pool().await;
        let user_id = seed_user(&pool, "locker@example.com", "user").await;

        let mut tx = pool.begin().await.unwrap();
        touch_user_for_update(&mut tx, user_id).await.unwrap();
        let missing = touch_user_for_update(&mut tx, 9999).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_touch_user_for_update_skips_inactive_rows() {
        let pool = memory_pool().await;
        let user_id = seed_user(&pool, "benched@example.com", "user").await;
        sqlx::query("UPDATE users SET status = 'deleted' WHERE user_id = ?")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let result = touch_user_for_update(&mut tx, user_id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        tx.rollback().await.unwrap();
    }
}
