//! The data repository: SQLite-backed storage for users, contacts, groups,
//! and messages, behind typed repository methods instead of an ORM.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{RepoError, Result};
pub use models::{Contact, ContactStatus, Group, Message, User};
pub use repository::Repository;

use sqlx::SqlitePool;

/// Run the embedded migrations against `pool`. Safe to call on every
/// startup; sqlx tracks which migrations already applied.
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
