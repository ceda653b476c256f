use super::{Db, models::VoiceNote};
use chrono::Utc;
use rusqlite::{OptionalExtension, Result, params};

impl Db {
    pub fn get_voice_note(&self, user_id: &str, document_id: &str) -> Result<Option<VoiceNote>> {
        self.conn
            .query_row(
                "SELECT audio_url, script, created_at FROM voice_notes WHERE user_id = ? AND document_id = ?",
                params![user_id, document_id],
                |row| {
                    Ok(VoiceNote {
                        audio_url: row.get(0)?,
                        script: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    /// Inserts or replaces the narration for (user, document). Last write wins.
    pub fn upsert_voice_note(
        &self,
        user_id: &str,
        document_id: &str,
        audio_url: &str,
        script: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO voice_notes (user_id, document_id, audio_url, script, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, document_id) DO UPDATE SET
                audio_url = excluded.audio_url,
                script = excluded.script,
                created_at = excluded.created_at
            "#,
            params![user_id, document_id, audio_url, script, Utc::now()],
        )?;
        Ok(())
    }
}
