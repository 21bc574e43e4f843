use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::entities::{ChatMessage, Chatroom};
use crate::domain::repositories::{ChatroomRepository, RepositoryError};

/// SQLite implementation of ChatroomRepository
pub struct SqliteChatroomRepository {
    pool: SqlitePool,
}

fn db_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(err.to_string())
}

impl SqliteChatroomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn members_of(&self, chatroom_id: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id FROM chatroom_members WHERE chatroom_id = ? ORDER BY position ASC",
        )
        .bind(chatroom_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    async fn row_to_chatroom(&self, row: &SqliteRow) -> Result<Chatroom, RepositoryError> {
        let id: String = row.get("id");
        let game_json: String = row.get("game_json");
        let tags_json: String = row.get("tags_json");
        let member_ids = self.members_of(&id).await?;

        Ok(Chatroom {
            party_id: row.get("party_id"),
            game: serde_json::from_str(&game_json)
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
            tags: serde_json::from_str(&tags_json)
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
            member_ids,
            created_at: row.get("created_at"),
            id,
        })
    }

    fn row_to_message(row: &SqliteRow) -> ChatMessage {
        ChatMessage {
            id: row.get("id"),
            chatroom_id: row.get("chatroom_id"),
            sender_id: row.get("sender_id"),
            body: row.get("body"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ChatroomRepository for SqliteChatroomRepository {
    async fn create(&self, chatroom: &Chatroom) -> Result<(), RepositoryError> {
        let game_json = serde_json::to_string(&chatroom.game)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let tags_json = serde_json::to_string(&chatroom.tags)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO chatrooms (id, party_id, game_json, tags_json, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chatroom.id)
        .bind(&chatroom.party_id)
        .bind(game_json)
        .bind(tags_json)
        .bind(chatroom.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for (position, user_id) in chatroom.member_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO chatroom_members (chatroom_id, user_id, position) VALUES (?, ?, ?)",
            )
            .bind(&chatroom.id)
            .bind(user_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Chatroom>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chatrooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match row {
            Some(row) => Ok(Some(self.row_to_chatroom(&row).await?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for sql in [
            "DELETE FROM chat_messages WHERE chatroom_id = ?",
            "DELETE FROM chatroom_members WHERE chatroom_id = ?",
            "DELETE FROM chatrooms WHERE id = ?",
        ] {
            sqlx::query(sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn find_for_member(&self, user_id: &str) -> Result<Vec<Chatroom>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT c.* FROM chatrooms c
            JOIN chatroom_members m ON m.chatroom_id = c.id
            WHERE m.user_id = ?
            ORDER BY c.created_at DESC, c.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut chatrooms = Vec::with_capacity(rows.len());
        for row in &rows {
            chatrooms.push(self.row_to_chatroom(row).await?);
        }
        Ok(chatrooms)
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_messages (id, chatroom_id, sender_id, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.chatroom_id)
        .bind(&message.sender_id)
        .bind(&message.body)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_messages(
        &self,
        chatroom_id: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        // (created_at, rowid) is the page key; an unknown cursor yields no rows
        let rows = sqlx::query(
            r#"
            SELECT * FROM chat_messages
            WHERE chatroom_id = ?
              AND (? IS NULL OR (created_at, rowid) < (
                  SELECT created_at, rowid FROM chat_messages
                  WHERE id = ? AND chatroom_id = ?
              ))
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(chatroom_id)
        .bind(before)
        .bind(before)
        .bind(chatroom_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(Self::row_to_message).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::GameRef;
    use crate::infrastructure::database::test_pool;

    fn chatroom(id: &str, members: &[&str]) -> Chatroom {
        Chatroom {
            id: id.into(),
            party_id: format!("party-{}", id),
            game: GameRef {
                id: "apex".into(),
                name: "Apex Legends".into(),
                cover_url: None,
            },
            tags: vec![],
            member_ids: members.iter().map(|m| m.to_string()).collect(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[tokio::test]
    async fn chatroom_keeps_member_order() {
        let repo = SqliteChatroomRepository::new(test_pool().await);
        let room = chatroom("r1", &["B", "A", "C"]);
        repo.create(&room).await.unwrap();

        assert_eq!(repo.find_by_id("r1").await.unwrap(), Some(room));
        assert_eq!(repo.find_for_member("A").await.unwrap().len(), 1);
        assert!(repo.find_for_member("Z").await.unwrap().is_empty());

        repo.delete("r1").await.unwrap();
        assert!(repo.find_by_id("r1").await.unwrap().is_none());
        assert!(repo.find_for_member("A").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_page_backwards_from_newest() {
        let repo = SqliteChatroomRepository::new(test_pool().await);
        repo.create(&chatroom("r1", &["A", "B"])).await.unwrap();

        for i in 0..5 {
            let mut message = ChatMessage::new(
                format!("m{}", i),
                "r1".into(),
                "A".into(),
                format!("hello {}", i),
            );
            message.created_at = 1_000 + i;
            repo.save_message(&message).await.unwrap();
        }

        let page = repo.list_messages("r1", None, 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m4", "m3"]);

        let older = repo.list_messages("r1", Some("m3"), 10).await.unwrap();
        let ids: Vec<_> = older.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1", "m0"]);

        assert!(repo.list_messages("r1", Some("unknown"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paging_reaches_messages_sharing_a_timestamp() {
        let repo = SqliteChatroomRepository::new(test_pool().await);
        repo.create(&chatroom("r1", &["A", "B"])).await.unwrap();

        for i in 0..3 {
            let mut message =
                ChatMessage::new(format!("m{}", i), "r1".into(), "A".into(), "same ms".into());
            message.created_at = 5_000;
            repo.save_message(&message).await.unwrap();
        }

        let page = repo.list_messages("r1", None, 2).await.unwrap();
        let ids: Vec<_> = page.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);

        let rest = repo.list_messages("r1", Some("m1"), 2).await.unwrap();
        let ids: Vec<_> = rest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0"]);
    }
}
