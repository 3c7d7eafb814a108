pub mod conflict;
pub mod sqlite;

pub use conflict::insert_or_conflict;
pub use conflict::is_unique_violation;
pub use conflict::InsertOutcome;
pub use sqlite::create_pool;
pub use sqlite::run_migrations;
