//! Application database: documents, chat turns, voice notes and persisted
//! vector indexes, all in one SQLite file.
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tracing::info;

pub mod chat;
pub mod documents;
pub mod models;
pub mod vectors;
pub mod voice;

/// Shared handle used by the server and the SQLite index store.
pub type SharedDb = Arc<TokioMutex<Db>>;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at DATETIME NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id, created_at);

CREATE TABLE IF NOT EXISTS chat_turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    document_id TEXT NOT NULL,
    user_query TEXT NOT NULL,
    ai_response TEXT NOT NULL,
    created_at DATETIME NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_turns_owner ON chat_turns(user_id, document_id);

CREATE TABLE IF NOT EXISTS voice_notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    document_id TEXT NOT NULL,
    audio_url TEXT NOT NULL,
    script TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    UNIQUE(user_id, document_id)
);

CREATE TABLE IF NOT EXISTS vector_indexes (
    index_key TEXT PRIMARY KEY,
    dimensions INTEGER NOT NULL,
    built_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS index_entries (
    index_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    vector BLOB NOT NULL,
    PRIMARY KEY (index_key, position),
    FOREIGN KEY (index_key) REFERENCES vector_indexes(index_key) ON DELETE CASCADE
);
"#;

/// A wrapper around a SQLite connection initialized with the application schema.
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open a database connection at the given path and initialize the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Initializing database: {}", path.display());

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Open an in-memory database connection (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Wrap the connection for sharing across tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedDb {
        Arc::new(TokioMutex::new(self))
    }
}

/// Serialize a float32 vector into little-endian bytes for BLOB storage.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Inverse of [`serialize_vector`]. Returns `None` for a truncated BLOB.
pub fn deserialize_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    // pod_collect_to_vec copies, so the BLOB need not be 4-byte aligned
    let values: Vec<u32> = bytemuck::pod_collect_to_vec(bytes);
    Some(
        values
            .into_iter()
            .map(|bits| f32::from_bits(u32::from_le(bits)))
            .collect(),
    )
}
