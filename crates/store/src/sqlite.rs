//! SQLite backend for conversations, knowledge, farms and users.
//!
//! One database file holds every table:
//! - `users`: registered farmers, looked up by phone number
//! - `chat_sessions` / `chat_messages`: the append-only conversation log
//! - `knowledge_base`: curated advisory articles
//! - `farms`, `crops`, `livestock`: the farmer's own records
//!
//! Timestamps are stored as RFC 3339 text with fixed microsecond precision
//! so lexical order is chronological order.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mkulima_config::DatabaseConfig;
use mkulima_core::conversation::{
    ChatSession, ConversationStore, StoredMessage, StoredRole, TurnRecord,
};
use mkulima_core::error::StoreError;
use mkulima_core::farm::{
    CropRecord, FarmRecords, FarmSnapshot, KnowledgeBase, KnowledgeEntry, LivestockRecord,
    UserDirectory, UserProfile,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Every table the service reads or writes.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "users table",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT UNIQUE NOT NULL,
            first_name    TEXT,
            last_name     TEXT,
            phone_number  TEXT UNIQUE,
            is_premium    INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL
        )
        "#,
    ),
    (
        "chat_sessions table",
        r#"
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id  TEXT UNIQUE NOT NULL,
            title       TEXT,
            user_id     INTEGER,
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "chat_messages table",
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id  TEXT NOT NULL REFERENCES chat_sessions(session_id) ON DELETE CASCADE,
            role        TEXT NOT NULL,
            content     TEXT NOT NULL,
            metadata    TEXT,
            timestamp   TEXT NOT NULL
        )
        "#,
    ),
    (
        "chat_messages index",
        "CREATE INDEX IF NOT EXISTS idx_chat_messages_session_ts ON chat_messages(session_id, timestamp)",
    ),
    (
        "knowledge_base table",
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_base (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            category    TEXT,
            language    TEXT NOT NULL DEFAULT 'en',
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "farms table",
        r#"
        CREATE TABLE IF NOT EXISTS farms (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            location    TEXT,
            size        REAL,
            farm_type   TEXT,
            created_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "crops table",
        r#"
        CREATE TABLE IF NOT EXISTS crops (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            farm_id     INTEGER NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            variety     TEXT,
            status      TEXT
        )
        "#,
    ),
    (
        "livestock table",
        r#"
        CREATE TABLE IF NOT EXISTS livestock (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            farm_id      INTEGER NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
            animal_type  TEXT NOT NULL,
            breed        TEXT,
            count        INTEGER NOT NULL DEFAULT 0
        )
        "#,
    ),
];

/// A SQLite store implementing every persistence trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and migrate it.
    ///
    /// `sqlite::memory:` gives an ephemeral database; the pool is pinned to
    /// one connection in that case because every connection would otherwise
    /// see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!(url, "SQLite store initialized");
        Ok(store)
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::connect(&config.url, config.max_connections).await
    }

    /// Wrap an existing pool and migrate it.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for (label, sql) in MIGRATIONS {
            sqlx::query(*sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{label}: {e}")))?;
        }
        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn crops_for_farm(&self, farm_id: i64) -> Result<Vec<CropRecord>, StoreError> {
        let rows = sqlx::query("SELECT name, variety, status FROM crops WHERE farm_id = ? ORDER BY id")
            .bind(farm_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        rows.iter().map(row_to_crop).collect()
    }

    async fn livestock_for_farm(&self, farm_id: i64) -> Result<Vec<LivestockRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT animal_type, breed, count FROM livestock WHERE farm_id = ? ORDER BY id",
        )
        .bind(farm_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter().map(row_to_livestock).collect()
    }
}

fn query_failed(e: sqlx::Error) -> StoreError {
    StoreError::QueryFailed(e.to_string())
}

fn transaction_failed(e: sqlx::Error) -> StoreError {
    StoreError::Transaction(e.to_string())
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Decode(format!("{name} column: {e}")))
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp '{raw}': {e}")))
}

fn row_to_session(row: &SqliteRow) -> Result<ChatSession, StoreError> {
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;
    Ok(ChatSession {
        session_id: column(row, "session_id")?,
        title: column(row, "title")?,
        user_id: column(row, "user_id")?,
        is_active: column(row, "is_active")?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_message(row: &SqliteRow) -> Result<StoredMessage, StoreError> {
    let role: String = column(row, "role")?;
    let role = StoredRole::parse(&role)
        .ok_or_else(|| StoreError::Decode(format!("unknown role '{role}'")))?;
    let metadata: Option<String> = column(row, "metadata")?;
    let metadata = metadata
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| StoreError::Decode(format!("metadata column: {e}")))?;
    let timestamp: String = column(row, "timestamp")?;
    Ok(StoredMessage {
        session_id: column(row, "session_id")?,
        role,
        content: column(row, "content")?,
        metadata,
        timestamp: parse_ts(&timestamp)?,
    })
}

fn row_to_knowledge(row: &SqliteRow) -> Result<KnowledgeEntry, StoreError> {
    Ok(KnowledgeEntry {
        id: column(row, "id")?,
        title: column(row, "title")?,
        content: column(row, "content")?,
        category: column(row, "category")?,
        language: column(row, "language")?,
        is_active: column(row, "is_active")?,
    })
}

fn row_to_crop(row: &SqliteRow) -> Result<CropRecord, StoreError> {
    Ok(CropRecord {
        name: column(row, "name")?,
        variety: column(row, "variety")?,
        status: column(row, "status")?,
    })
}

fn row_to_livestock(row: &SqliteRow) -> Result<LivestockRecord, StoreError> {
    let count: i64 = column(row, "count")?;
    Ok(LivestockRecord {
        animal_type: column(row, "animal_type")?,
        breed: column(row, "breed")?,
        count: u32::try_from(count).unwrap_or(0),
    })
}

fn row_to_user(row: &SqliteRow) -> Result<UserProfile, StoreError> {
    let created_at: String = column(row, "created_at")?;
    Ok(UserProfile {
        id: column(row, "id")?,
        username: column(row, "username")?,
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        phone_number: column(row, "phone_number")?,
        is_premium: column(row, "is_premium")?,
        created_at: parse_ts(&created_at)?,
    })
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record_turn(&self, turn: TurnRecord) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&turn.metadata)
            .map_err(|e| StoreError::Storage(format!("metadata encode: {e}")))?;
        let now = format_ts(turn.assistant_timestamp);

        let mut tx = self.pool.begin().await.map_err(transaction_failed)?;

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (session_id, title, user_id, is_active, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            ON CONFLICT(session_id) DO NOTHING
            "#,
        )
        .bind(&turn.session_id)
        .bind(&turn.title)
        .bind(turn.user_id)
        .bind(format_ts(turn.user_timestamp))
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?;

        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content, metadata, timestamp) VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(&turn.session_id)
        .bind(StoredRole::User.as_str())
        .bind(&turn.user_content)
        .bind(format_ts(turn.user_timestamp))
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?;

        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content, metadata, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&turn.session_id)
        .bind(StoredRole::Assistant.as_str())
        .bind(&turn.assistant_content)
        .bind(&metadata)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?;

        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE session_id = ?")
            .bind(&now)
            .bind(&turn.session_id)
            .execute(&mut *tx)
            .await
            .map_err(query_failed)?;

        tx.commit().await.map_err(transaction_failed)?;
        debug!(session_id = %turn.session_id, "Turn committed");
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query(
            "SELECT session_id, title, user_id, is_active, created_at, updated_at FROM chat_sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed)?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query(
            r#"
            SELECT session_id, role, content, metadata, timestamp FROM (
                SELECT id, session_id, role, content, metadata, timestamp
                FROM chat_messages
                WHERE session_id = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT ?
            )
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter().map(row_to_message).collect()
    }
}

#[async_trait]
impl KnowledgeBase for SqliteStore {
    async fn find_active_by_category(
        &self,
        category_fragment: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, content, category, language, is_active
            FROM knowledge_base
            WHERE is_active = 1 AND instr(COALESCE(category, ''), ?) > 0
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(category_fragment)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter().map(row_to_knowledge).collect()
    }

    async fn add_entry(&self, entry: KnowledgeEntry) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO knowledge_base (title, content, category, language, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(&entry.category)
        .bind(&entry.language)
        .bind(entry.is_active)
        .bind(format_ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl FarmRecords for SqliteStore {
    async fn farms_for_user(&self, user_id: i64) -> Result<Vec<FarmSnapshot>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, location, size, farm_type FROM farms WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        let mut farms = Vec::with_capacity(rows.len());
        for row in &rows {
            let farm_id: i64 = column(row, "id")?;
            farms.push(FarmSnapshot {
                name: column(row, "name")?,
                location: column(row, "location")?,
                size: column(row, "size")?,
                farm_type: column(row, "farm_type")?,
                crops: self.crops_for_farm(farm_id).await?,
                livestock: self.livestock_for_farm(farm_id).await?,
            });
        }
        Ok(farms)
    }

    async fn add_farm(&self, user_id: i64, farm: FarmSnapshot) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(transaction_failed)?;

        let farm_id = sqlx::query(
            "INSERT INTO farms (user_id, name, location, size, farm_type, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&farm.name)
        .bind(&farm.location)
        .bind(farm.size)
        .bind(&farm.farm_type)
        .bind(format_ts(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?
        .last_insert_rowid();

        for crop in &farm.crops {
            sqlx::query("INSERT INTO crops (farm_id, name, variety, status) VALUES (?, ?, ?, ?)")
                .bind(farm_id)
                .bind(&crop.name)
                .bind(&crop.variety)
                .bind(&crop.status)
                .execute(&mut *tx)
                .await
                .map_err(query_failed)?;
        }

        for herd in &farm.livestock {
            sqlx::query(
                "INSERT INTO livestock (farm_id, animal_type, breed, count) VALUES (?, ?, ?, ?)",
            )
            .bind(farm_id)
            .bind(&herd.animal_type)
            .bind(&herd.breed)
            .bind(i64::from(herd.count))
            .execute(&mut *tx)
            .await
            .map_err(query_failed)?;
        }

        tx.commit().await.map_err(transaction_failed)?;
        Ok(farm_id)
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, first_name, last_name, phone_number, is_premium, created_at FROM users WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn register(
        &self,
        username: &str,
        phone_number: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        let created_at = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (username, phone_number, is_premium, created_at) VALUES (?, ?, 0, ?)",
        )
        .bind(username)
        .bind(phone_number)
        .bind(format_ts(created_at))
        .execute(&self.pool)
        .await
        .map_err(query_failed)?
        .last_insert_rowid();

        Ok(UserProfile {
            id,
            username: username.to_string(),
            first_name: None,
            last_name: None,
            phone_number: phone_number.map(str::to_string),
            is_premium: false,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 5).await.unwrap()
    }

    fn turn(session_id: &str, question: &str, answer: &str, at: DateTime<Utc>) -> TurnRecord {
        TurnRecord {
            session_id: session_id.into(),
            user_id: None,
            title: question.into(),
            user_content: question.into(),
            user_timestamp: at,
            assistant_content: answer.into(),
            assistant_timestamp: at + Duration::milliseconds(5),
            metadata: serde_json::json!({"classification": {"category": "crop_management", "confidence": 0.9}}),
        }
    }

    #[tokio::test]
    async fn record_turn_creates_session_and_messages() {
        let db = test_store().await;
        let t0 = Utc::now();
        db.record_turn(turn("sms:+254700000001", "When to plant maize?", "Plant at onset of long rains.", t0))
            .await
            .unwrap();

        let session = db.find_session("sms:+254700000001").await.unwrap().unwrap();
        assert_eq!(session.title.as_deref(), Some("When to plant maize?"));
        assert!(session.is_active);

        let history = db.history("sms:+254700000001", None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, StoredRole::User);
        assert!(history[0].metadata.is_none());
        assert_eq!(history[1].role, StoredRole::Assistant);
        assert_eq!(
            history[1].metadata.as_ref().unwrap()["classification"]["category"],
            "crop_management"
        );
    }

    #[tokio::test]
    async fn stored_metadata_rebuilds_context_bag() {
        use mkulima_core::agent::{ContextBag, QueryClassification};

        let db = test_store().await;
        let bag = ContextBag {
            classification: Some(QueryClassification {
                category: "livestock".into(),
                confidence: 0.85,
                requires_farm_data: true,
                specific_subject: Some("dairy cows".into()),
            }),
            farms: Some(vec![FarmSnapshot {
                name: "Kapseret plot".into(),
                location: Some("Eldoret".into()),
                size: Some(2.5),
                farm_type: Some("dairy".into()),
                crops: vec![CropRecord {
                    name: "napier grass".into(),
                    variety: Some("Kakamega 1".into()),
                    status: Some("growing".into()),
                }],
                livestock: vec![LivestockRecord {
                    animal_type: "cattle".into(),
                    breed: Some("Friesian".into()),
                    count: 4,
                }],
            }]),
            knowledge: vec![KnowledgeEntry::new(
                "Mastitis control",
                "Milk infected quarters last and dry-treat at drying off.",
                "livestock",
            )],
        };

        let mut record = turn("s-bag", "My cow's milk is watery", "Check for mastitis.", Utc::now());
        record.metadata = bag.to_metadata();
        db.record_turn(record).await.unwrap();

        let history = db.history("s-bag", None).await.unwrap();
        let stored = history[1].metadata.as_ref().unwrap();
        assert_eq!(ContextBag::from_metadata(stored).unwrap(), bag);
    }

    #[tokio::test]
    async fn second_turn_reuses_session_and_bumps_updated_at() {
        let db = test_store().await;
        let t0 = Utc::now();
        db.record_turn(turn("s1", "First question", "a1", t0)).await.unwrap();
        let before = db.find_session("s1").await.unwrap().unwrap();

        let mut second = turn("s1", "Second", "a2", t0 + Duration::seconds(10));
        second.title = "Ignored".into();
        db.record_turn(second).await.unwrap();

        let after = db.find_session("s1").await.unwrap().unwrap();
        assert_eq!(after.title.as_deref(), Some("First question"));
        assert!(after.updated_at > before.updated_at);
        assert_eq!(db.history("s1", None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn history_limit_keeps_most_recent_in_ascending_order() {
        let db = test_store().await;
        let t0 = Utc::now();
        for i in 0..3 {
            db.record_turn(turn(
                "s1",
                &format!("q{i}"),
                &format!("a{i}"),
                t0 + Duration::seconds(i),
            ))
            .await
            .unwrap();
        }

        let last = db.history("s1", Some(3)).await.unwrap();
        let contents: Vec<&str> = last.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a1", "q2", "a2"]);
    }

    #[tokio::test]
    async fn unknown_session_is_none_and_empty() {
        let db = test_store().await;
        assert!(db.find_session("nope").await.unwrap().is_none());
        assert!(db.history("nope", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn knowledge_filters_inactive_and_limits() {
        let db = test_store().await;
        for i in 0..4 {
            db.add_entry(KnowledgeEntry::new(format!("Maize {i}"), "content", "crop_management"))
                .await
                .unwrap();
        }
        let mut hidden = KnowledgeEntry::new("Old advice", "content", "crop_management");
        hidden.is_active = false;
        db.add_entry(hidden).await.unwrap();
        db.add_entry(KnowledgeEntry::new("Dairy", "content", "livestock"))
            .await
            .unwrap();

        let found = db.find_active_by_category("crop", 3).await.unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|e| e.is_active));
        assert_eq!(found[0].title, "Maize 0");
    }

    #[tokio::test]
    async fn farms_roundtrip_with_crops_and_livestock() {
        let db = test_store().await;
        let user = db.register("wanjiru", Some("+254711000000")).await.unwrap();
        db.add_farm(
            user.id,
            FarmSnapshot {
                name: "Shamba".into(),
                location: Some("Eldoret".into()),
                size: Some(3.0),
                farm_type: Some("mixed".into()),
                crops: vec![CropRecord {
                    name: "maize".into(),
                    variety: None,
                    status: Some("planted".into()),
                }],
                livestock: vec![LivestockRecord {
                    animal_type: "goats".into(),
                    breed: None,
                    count: 7,
                }],
            },
        )
        .await
        .unwrap();

        let farms = db.farms_for_user(user.id).await.unwrap();
        assert_eq!(farms.len(), 1);
        assert_eq!(farms[0].crops[0].name, "maize");
        assert_eq!(farms[0].livestock[0].count, 7);
        assert!(db.farms_for_user(user.id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn users_found_by_phone() {
        let db = test_store().await;
        let user = db.register("otieno", Some("+254722000000")).await.unwrap();
        let found = db.find_by_phone("+254722000000").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.find_by_phone("+254733000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("mkulima.db").display());

        {
            let db = SqliteStore::connect(&url, 2).await.unwrap();
            db.record_turn(turn("s1", "q", "a", Utc::now())).await.unwrap();
        }

        let db = SqliteStore::connect(&url, 2).await.unwrap();
        assert_eq!(db.history("s1", None).await.unwrap().len(), 2);
    }
}
