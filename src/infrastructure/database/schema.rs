use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        last_login_at INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parties (
        id TEXT PRIMARY KEY,
        game_id TEXT NOT NULL,
        game_json TEXT NOT NULL,
        tags_json TEXT NOT NULL,
        tag_ids_json TEXT NOT NULL,
        max_size INTEGER NOT NULL,
        created_by TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        users_json TEXT NOT NULL,
        user_count INTEGER NOT NULL,
        chatroom_created INTEGER NOT NULL DEFAULT 0,
        chatroom_id TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_parties_match ON parties (game_id, tag_ids_json, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS chatrooms (
        id TEXT PRIMARY KEY,
        party_id TEXT NOT NULL,
        game_json TEXT NOT NULL,
        tags_json TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chatroom_members (
        chatroom_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (chatroom_id, user_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chatroom_members_user ON chatroom_members (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS chat_messages (
        id TEXT PRIMARY KEY,
        chatroom_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_room ON chat_messages (chatroom_id, created_at)",
];

/// Create tables and indexes if they do not exist yet
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
