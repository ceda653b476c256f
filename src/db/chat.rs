use super::{Db, models::ChatTurn};
use chrono::Utc;
use rusqlite::{Result, params};

impl Db {
    /// Appends one question/answer pair to the conversation log.
    pub fn append_turn(
        &self,
        user_id: &str,
        document_id: &str,
        user_query: &str,
        ai_response: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO chat_turns (user_id, document_id, user_query, ai_response, created_at) VALUES (?, ?, ?, ?, ?)",
            params![user_id, document_id, user_query, ai_response, Utc::now()],
        )?;
        Ok(())
    }

    /// Returns the conversation for one document in chronological order.
    pub fn get_history(&self, user_id: &str, document_id: &str) -> Result<Vec<ChatTurn>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_query, ai_response, created_at FROM chat_turns WHERE user_id = ? AND document_id = ? ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user_id, document_id], |row| {
            Ok(ChatTurn {
                user_query: row.get(0)?,
                ai_response: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_chronological() {
        let db = Db::open_in_memory().unwrap();
        db.append_turn("alice", "doc-1", "What is ATP?", "Energy currency.")
            .unwrap();
        db.append_turn("alice", "doc-1", "Who makes it?", "Mitochondria.")
            .unwrap();
        db.append_turn("alice", "doc-2", "Other doc", "Other answer")
            .unwrap();

        let turns = db.get_history("alice", "doc-1").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].user_query, "What is ATP?");
        assert_eq!(turns[1].ai_response, "Mitochondria.");
        assert_eq!(
            turns[0].history_line(),
            "User: What is ATP?\nAI: Energy currency."
        );
    }

    #[test]
    fn test_history_scoped_to_user() {
        let db = Db::open_in_memory().unwrap();
        db.append_turn("alice", "doc-1", "q", "a").unwrap();
        assert!(db.get_history("bob", "doc-1").unwrap().is_empty());
    }
}
