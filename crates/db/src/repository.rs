use sqlx::SqlitePool;

use crate::error::{RepoError, Result};
use crate::models::{Contact, ContactStatus, Group, Message, User};

/// The data repository: every query the server issues against the SQLite
/// store goes through here. A pool handle plus one method per operation,
/// using raw `sqlx::query`/`query_as` rather than an ORM.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new user. Unique-constraint violations are not pre-checked
    /// (that would race) — they're detected from the SQLite error after the
    /// fact and mapped to the right conflict variant.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        salt: &[u8],
    ) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, salt) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(salt)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(r) => r.last_insert_rowid(),
            Err(e) => return Err(classify_unique_violation(e, username, email)),
        };

        self.get_user_by_id(id).await?.ok_or(RepoError::NotFound)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, salt, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, salt, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Record a (mutual, approved-by-default) contact relationship.
    pub async fn create_contact(&self, user_id: i64, contact_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_contacts (user_id, contact_id, status) VALUES (?, ?, 'approved')
             ON CONFLICT (user_id, contact_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(contact_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>> {
        let rows: Vec<(i64, String, Option<String>, String)> = sqlx::query_as(
            "SELECT u.id, u.username, c.custom_nickname, c.status
             FROM user_contacts c
             JOIN users u ON u.id = c.contact_id
             WHERE c.user_id = ?
             ORDER BY u.username",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, user_name, custom_nickname, status)| {
                let status = ContactStatus::parse(&status)
                    .ok_or_else(|| RepoError::Corrupt(format!("unrecognized contact status {status:?}")))?;
                Ok(Contact { user_id, user_name, custom_nickname, status })
            })
            .collect()
    }

    /// Groups `user_id` is a member of.
    pub async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            "SELECT g.id, g.name, g.owner_id, g.created_at
             FROM groups g
             JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ?
             ORDER BY g.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// Create a group and its membership rows (owner included) in one
    /// transaction.
    pub async fn create_group(&self, name: &str, owner_id: i64, members: &[i64]) -> Result<Group> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO groups (name, owner_id) VALUES (?, ?)")
            .bind(name)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        let group_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        for member_id in members.iter().filter(|id| **id != owner_id) {
            sqlx::query(
                "INSERT INTO group_members (group_id, user_id) VALUES (?, ?)
                 ON CONFLICT (group_id, user_id) DO NOTHING",
            )
            .bind(group_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }

        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, owner_id, created_at FROM groups WHERE id = ?",
        )
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(group)
    }

    pub async fn list_group_members(&self, group_id: i64) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT user_id FROM group_members WHERE group_id = ?")
                .bind(group_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn is_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn create_private_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> Result<Message> {
        let result = sqlx::query(
            "INSERT INTO messages (sender_id, receiver_id, content) VALUES (?, ?, ?)",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .execute(&self.pool)
        .await?;

        self.get_message(result.last_insert_rowid()).await
    }

    pub async fn create_group_message(
        &self,
        sender_id: i64,
        group_id: i64,
        content: &str,
    ) -> Result<Message> {
        let result =
            sqlx::query("INSERT INTO messages (sender_id, group_id, content) VALUES (?, ?, ?)")
                .bind(sender_id)
                .bind(group_id)
                .bind(content)
                .execute(&self.pool)
                .await?;

        self.get_message(result.last_insert_rowid()).await
    }

    async fn get_message(&self, id: i64) -> Result<Message> {
        sqlx::query_as::<_, Message>(
            "SELECT id, sender_id, receiver_id, group_id, content, sent_at, is_delivered, delivered_at
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    /// Mark a message delivered, called once the delivery engine has
    /// successfully handed it to a live connection.
    pub async fn mark_delivered(&self, message_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE messages SET is_delivered = 1, delivered_at = datetime('now') WHERE id = ?",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// SQLite surfaces unique-constraint violations as a generic database error
/// whose message names the offending column; inspect it to recover which
/// constraint fired.
fn classify_unique_violation(err: sqlx::Error, username: &str, email: &str) -> RepoError {
    if let sqlx::Error::Database(ref db_err) = err {
        let msg = db_err.message();
        if msg.contains("users.username") {
            return RepoError::UsernameTaken;
        }
        if msg.contains("users.email") {
            return RepoError::EmailTaken;
        }
        tracing::debug!(username, email, %msg, "unclassified database error on user insert");
    }
    RepoError::Other(err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn creates_and_fetches_user() {
        let repo = Repository::new(test_pool().await);
        let user = repo
            .create_user("alice", "alice@example.com", "deadbeef", b"salt1234")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let fetched = repo.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let repo = Repository::new(test_pool().await);
        repo.create_user("bob", "bob@example.com", "h", b"s")
            .await
            .unwrap();
        let err = repo
            .create_user("bob", "other@example.com", "h", b"s")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UsernameTaken));
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let repo = Repository::new(test_pool().await);
        repo.create_user("carol", "dup@example.com", "h", b"s")
            .await
            .unwrap();
        let err = repo
            .create_user("carol2", "dup@example.com", "h", b"s")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::EmailTaken));
    }

    #[tokio::test]
    async fn creates_group_with_members() {
        let repo = Repository::new(test_pool().await);
        let owner = repo
            .create_user("owner", "owner@example.com", "h", b"s")
            .await
            .unwrap();
        let member = repo
            .create_user("member", "member@example.com", "h", b"s")
            .await
            .unwrap();

        let group = repo
            .create_group("team", owner.id, &[member.id])
            .await
            .unwrap();

        let members = repo.list_group_members(group.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.contains(&owner.id));
        assert!(members.contains(&member.id));
    }

    #[tokio::test]
    async fn lists_groups_a_user_belongs_to() {
        let repo = Repository::new(test_pool().await);
        let owner = repo
            .create_user("owner2", "owner2@example.com", "h", b"s")
            .await
            .unwrap();
        let member = repo
            .create_user("member2", "member2@example.com", "h", b"s")
            .await
            .unwrap();
        let group = repo
            .create_group("book club", owner.id, &[member.id])
            .await
            .unwrap();

        let groups = repo.list_groups_for_user(member.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, group.id);

        let outsider = repo
            .create_user("outsider", "outsider@example.com", "h", b"s")
            .await
            .unwrap();
        assert!(repo.list_groups_for_user(outsider.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn private_message_round_trips_delivery_state() {
        let repo = Repository::new(test_pool().await);
        let a = repo.create_user("a", "a@x.com", "h", b"s").await.unwrap();
        let b = repo.create_user("b", "b@x.com", "h", b"s").await.unwrap();

        let msg = repo
            .create_private_message(a.id, b.id, "hello")
            .await
            .unwrap();
        assert!(!msg.is_delivered);

        repo.mark_delivered(msg.id).await.unwrap();
        let fetched = repo.get_message(msg.id).await.unwrap();
        assert!(fetched.is_delivered);
        assert!(fetched.delivered_at.is_some());
    }
}
