use super::{Db, models::*};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result, params};

impl Db {
    /// Stores a freshly uploaded document.
    pub fn insert_document(
        &self,
        document_id: &str,
        user_id: &str,
        filename: &str,
        text: &str,
    ) -> Result<Document> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO documents (document_id, user_id, filename, text, created_at) VALUES (?, ?, ?, ?, ?)",
            params![document_id, user_id, filename, text, created_at],
        )?;
        Ok(Document {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            text: text.to_string(),
            created_at,
        })
    }

    /// Fetches a document owned by `user_id`.
    pub fn get_document(&self, user_id: &str, document_id: &str) -> Result<Option<Document>> {
        self.conn
            .query_row(
                "SELECT document_id, user_id, filename, text, created_at FROM documents WHERE user_id = ? AND document_id = ?",
                params![user_id, document_id],
                |row| {
                    Ok(Document {
                        document_id: row.get(0)?,
                        user_id: row.get(1)?,
                        filename: row.get(2)?,
                        text: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
    }

    /// Returns the user's documents, newest first
    pub fn list_user_documents(&self, user_id: &str) -> Result<Vec<DocumentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id, filename, created_at FROM documents WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let created_at: DateTime<Utc> = row.get(2)?;
            Ok(DocumentSummary {
                document_id: row.get(0)?,
                filename: row.get(1)?,
                created_at,
            })
        })?;
        rows.collect()
    }

    /// Deletes a document together with its chat turns and voice note.
    ///
    /// The persisted vector index is owned by the index store and removed
    /// separately. Returns false when the user owns no such document.
    pub fn delete_document(&mut self, user_id: &str, document_id: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let rows = tx.execute(
            "DELETE FROM documents WHERE user_id = ? AND document_id = ?",
            params![user_id, document_id],
        )?;
        if rows > 0 {
            tx.execute(
                "DELETE FROM chat_turns WHERE user_id = ? AND document_id = ?",
                params![user_id, document_id],
            )?;
            tx.execute(
                "DELETE FROM voice_notes WHERE user_id = ? AND document_id = ?",
                params![user_id, document_id],
            )?;
        }
        tx.commit()?;
        Ok(rows > 0)
    }
}
