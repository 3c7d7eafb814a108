/// Outcome of an insert that may race another writer on a uniqueness
/// constraint. `AlreadyExists` is an expected result for get-or-create
/// paths, not an error: the caller re-fetches the winning row and merges.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The insert won; carries the driver's execution result.
    Inserted(T),
    /// Another writer created the row first.
    AlreadyExists,
}

impl<T> InsertOutcome<T> {
    /// Returns true when this insert created the row.
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Returns true when the error is a uniqueness-constraint violation.
///
/// This is the only place the crate inspects database error details;
/// everything else branches on [`InsertOutcome`].
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Folds an insert result into an [`InsertOutcome`], passing every error
/// other than a uniqueness violation through unchanged.
pub fn insert_or_conflict<T>(
    result: Result<T, sqlx::Error>,
) -> Result<InsertOutcome<T>, sqlx::Error> {
    match result {
        Ok(value) => Ok(InsertOutcome::Inserted(value)),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::AlreadyExists),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn test_pool() -> SqlitePool {
        // Single connection so the in-memory database is shared across queries
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE things (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_first_insert_is_inserted() {
        let pool = test_pool().await;

        let result = sqlx::query("INSERT INTO things (name) VALUES ('alpha')")
            .execute(&pool)
            .await;

        let outcome = insert_or_conflict(result).unwrap();
        assert!(outcome.is_inserted());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_already_exists() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO things (name) VALUES ('alpha')")
            .execute(&pool)
            .await
            .unwrap();
        let result = sqlx::query("INSERT INTO things (name) VALUES ('alpha')")
            .execute(&pool)
            .await;

        let outcome = insert_or_conflict(result).unwrap();
        assert_eq!(outcome.is_inserted(), false);
        assert!(matches!(outcome, InsertOutcome::AlreadyExists));
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let pool = test_pool().await;

        // NOT NULL violation is not a uniqueness conflict
        let result = sqlx::query("INSERT INTO things (name) VALUES (NULL)")
            .execute(&pool)
            .await;

        assert!(insert_or_conflict(result).is_err());
    }

    #[tokio::test]
    async fn test_is_unique_violation_detects_constraint() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO things (name) VALUES ('beta')")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO things (name) VALUES ('beta')")
            .execute(&pool)
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
    }
}
