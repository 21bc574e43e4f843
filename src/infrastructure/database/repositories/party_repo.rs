use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::entities::{Party, PartyRuleViolation};
use crate::domain::repositories::{
    LeaveTransaction, PartyRepository, PartyTransactionError, RepositoryError,
};

/// Attempts before a contended transaction gives up
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// SQLite implementation of PartyRepository
pub struct SqlitePartyRepository {
    pool: SqlitePool,
}

/// Outcome of a single transaction attempt
enum Attempt {
    /// Lost a race for the write lock; safe to retry
    Contended(sqlx::Error),
    Failed(PartyTransactionError),
}

impl From<sqlx::Error> for Attempt {
    fn from(err: sqlx::Error) -> Self {
        if is_contention(&err) {
            Attempt::Contended(err)
        } else {
            Attempt::Failed(PartyTransactionError::Repository(db_error(err)))
        }
    }
}

impl From<PartyTransactionError> for Attempt {
    fn from(err: PartyTransactionError) -> Self {
        Attempt::Failed(err)
    }
}

impl From<PartyRuleViolation> for Attempt {
    fn from(violation: PartyRuleViolation) -> Self {
        Attempt::Failed(violation.into())
    }
}

impl From<RepositoryError> for Attempt {
    fn from(err: RepositoryError) -> Self {
        Attempt::Failed(err.into())
    }
}

fn db_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(err.to_string())
}

/// SQLITE_BUSY / SQLITE_LOCKED and their extended codes
fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some("5") | Some("6") | Some("261") | Some("262") | Some("517")
        ),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Database(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(
    id: &str,
    column: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| {
        RepositoryError::Database(format!("party {} has corrupt {}: {}", id, column, e))
    })
}

impl SqlitePartyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_party(row: &SqliteRow) -> Result<Party, RepositoryError> {
        let id: String = row.get("id");
        let game_json: String = row.get("game_json");
        let tags_json: String = row.get("tags_json");
        let tag_ids_json: String = row.get("tag_ids_json");
        let users_json: String = row.get("users_json");

        Ok(Party {
            game: from_json(&id, "game", &game_json)?,
            tags: from_json(&id, "tags", &tags_json)?,
            tag_ids: from_json(&id, "tagIds", &tag_ids_json)?,
            users: from_json(&id, "users", &users_json)?,
            max_size: row.get::<i64, _>("max_size") as u32,
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            chatroom_created: row.get::<i64, _>("chatroom_created") != 0,
            chatroom_id: row.get("chatroom_id"),
            id,
        })
    }

    /// Run `apply` as a read-check-write transaction on one party, retrying
    /// when another writer holds the lock.
    async fn transact<T, F>(
        &self,
        party_id: &str,
        mut apply: F,
    ) -> Result<(Party, T), PartyTransactionError>
    where
        F: FnMut(&mut Party) -> Result<T, PartyRuleViolation> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            match self.try_transact(party_id, &mut apply).await {
                Ok(result) => return Ok(result),
                Err(Attempt::Failed(err)) => return Err(err),
                Err(Attempt::Contended(err)) => {
                    tracing::debug!(
                        party_id,
                        attempt,
                        error = %err,
                        "party transaction contended, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
            }
        }

        tracing::warn!(party_id, "party transaction gave up after repeated contention");
        Err(PartyTransactionError::Contention)
    }

    async fn try_transact<T, F>(&self, party_id: &str, apply: &mut F) -> Result<(Party, T), Attempt>
    where
        F: FnMut(&mut Party) -> Result<T, PartyRuleViolation> + Send,
        T: Send,
    {
        // Dropping `tx` on any early return rolls the transaction back
        let mut tx = self.pool.begin().await?;

        // Take the write lock before reading so concurrent writers serialize
        let claimed = sqlx::query("UPDATE parties SET user_count = user_count WHERE id = ?")
            .bind(party_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(PartyTransactionError::NotFound.into());
        }

        let row = sqlx::query("SELECT * FROM parties WHERE id = ?")
            .bind(party_id)
            .fetch_one(&mut *tx)
            .await?;
        let mut party = Self::row_to_party(&row)?;

        let output = apply(&mut party)?;

        sqlx::query("UPDATE parties SET users_json = ?, user_count = ? WHERE id = ?")
            .bind(to_json(&party.users)?)
            .bind(party.users.len() as i64)
            .bind(party_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((party, output))
    }
}

#[async_trait]
impl PartyRepository for SqlitePartyRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Party>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM parties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(Self::row_to_party).transpose()
    }

    async fn find_open_party(
        &self,
        game_id: &str,
        tag_ids: &[String],
        cutoff_millis: i64,
    ) -> Result<Option<Party>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM parties
            WHERE game_id = ? AND tag_ids_json = ? AND created_at > ?
              AND chatroom_created = 0 AND user_count > 0 AND user_count < max_size
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(game_id)
        .bind(to_json(&tag_ids)?)
        .bind(cutoff_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(Self::row_to_party).transpose()
    }

    async fn list_for_game(
        &self,
        game_id: &str,
        cutoff_millis: i64,
        limit: u32,
    ) -> Result<Vec<Party>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM parties
            WHERE game_id = ? AND created_at > ? AND user_count > 0
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(game_id)
        .bind(cutoff_millis)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::row_to_party).collect()
    }

    async fn create(&self, party: &Party) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO parties (
                id, game_id, game_json, tags_json, tag_ids_json, max_size, created_by,
                created_at, users_json, user_count, chatroom_created, chatroom_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&party.id)
        .bind(&party.game.id)
        .bind(to_json(&party.game)?)
        .bind(to_json(&party.tags)?)
        .bind(to_json(&party.tag_ids)?)
        .bind(party.max_size as i64)
        .bind(&party.created_by)
        .bind(party.created_at)
        .bind(to_json(&party.users)?)
        .bind(party.users.len() as i64)
        .bind(party.chatroom_created as i64)
        .bind(&party.chatroom_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn join(&self, party_id: &str, user_id: &str) -> Result<Party, PartyTransactionError> {
        let (party, ()) = self
            .transact(party_id, |party| party.add_user(user_id))
            .await?;
        Ok(party)
    }

    async fn leave(
        &self,
        party_id: &str,
        user_id: &str,
    ) -> Result<LeaveTransaction, PartyTransactionError> {
        let (party, now_empty) = self
            .transact(party_id, |party| party.remove_user(user_id))
            .await?;
        Ok(LeaveTransaction {
            party,
            scheduled_for_deletion: now_empty,
        })
    }

    async fn mark_chatroom_created(
        &self,
        party_id: &str,
        chatroom_id: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE parties SET chatroom_created = 1, chatroom_id = ? \
             WHERE id = ? AND chatroom_created = 0",
        )
        .bind(chatroom_id)
        .bind(party_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_empty(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM parties WHERE id = ? AND user_count = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() == 1)
    }
}
