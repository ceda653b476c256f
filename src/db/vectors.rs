use super::{Db, deserialize_vector, serialize_vector};
use crate::error::Error;
use crate::vector::{IndexEntry, VectorIndex};
use chrono::Utc;
use rusqlite::{OptionalExtension, Result, params};

impl Db {
    /// Replaces the persisted index under `key` in a single transaction, so a
    /// reader never observes a partially written index.
    pub fn save_index(&mut self, key: &str, index: &VectorIndex) -> Result<()> {
        let tx = self.conn.transaction()?;

        // cascades to index_entries
        tx.execute(
            "DELETE FROM vector_indexes WHERE index_key = ?",
            params![key],
        )?;
        tx.execute(
            "INSERT INTO vector_indexes (index_key, dimensions, built_at) VALUES (?, ?, ?)",
            params![key, index.dimensions() as i64, Utc::now()],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO index_entries (index_key, position, text, vector) VALUES (?, ?, ?, ?)",
            )?;
            for (position, entry) in index.entries().iter().enumerate() {
                stmt.execute(params![
                    key,
                    position as i64,
                    entry.text,
                    serialize_vector(&entry.vector)
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Loads the persisted index under `key`, entries in insertion order.
    pub fn load_index(&self, key: &str) -> crate::error::Result<Option<VectorIndex>> {
        let dimensions: Option<i64> = self
            .conn
            .query_row(
                "SELECT dimensions FROM vector_indexes WHERE index_key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(dimensions) = dimensions else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT text, vector FROM index_entries WHERE index_key = ? ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            let text: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((text, blob))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (text, blob) = row?;
            let vector = deserialize_vector(&blob).ok_or_else(|| {
                Error::Storage(format!("corrupt vector blob in index {key}"))
            })?;
            entries.push(IndexEntry { text, vector });
        }

        VectorIndex::from_entries(dimensions as usize, entries).map(Some)
    }

    /// Removes the persisted index under `key`. Returns false when absent.
    pub fn delete_index(&self, key: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM vector_indexes WHERE index_key = ?",
            params![key],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> VectorIndex {
        VectorIndex::from_entries(
            3,
            vec![
                IndexEntry {
                    text: "first chunk".to_string(),
                    vector: vec![1.0, 0.0, 0.0],
                },
                IndexEntry {
                    text: "second chunk".to_string(),
                    vector: vec![0.0, 0.6, 0.8],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_index() {
        let mut db = Db::open_in_memory().unwrap();
        let index = sample_index();
        db.save_index("doc-1", &index).unwrap();

        let loaded = db.load_index("doc-1").unwrap().unwrap();
        assert_eq!(loaded, index);
        assert!(db.load_index("doc-2").unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_index() {
        let mut db = Db::open_in_memory().unwrap();
        db.save_index("doc-1", &sample_index()).unwrap();

        let replacement = VectorIndex::from_entries(
            3,
            vec![IndexEntry {
                text: "only".to_string(),
                vector: vec![0.0, 0.0, 1.0],
            }],
        )
        .unwrap();
        db.save_index("doc-1", &replacement).unwrap();

        let loaded = db.load_index("doc-1").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].text, "only");
    }

    #[test]
    fn test_empty_index_round_trip() {
        let mut db = Db::open_in_memory().unwrap();
        db.save_index("empty", &VectorIndex::new(384)).unwrap();

        let loaded = db.load_index("empty").unwrap().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimensions(), 384);
    }

    #[test]
    fn test_delete_index() {
        let mut db = Db::open_in_memory().unwrap();
        db.save_index("doc-1", &sample_index()).unwrap();

        assert!(db.delete_index("doc-1").unwrap());
        assert!(db.load_index("doc-1").unwrap().is_none());
        assert!(!db.delete_index("doc-1").unwrap());

        let entries: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM index_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entries, 0);
    }
}
