//! Turning document text into a searchable vector index.
pub mod chunker;
pub mod core;

pub use chunker::{TextChunker, split_into_chunks};
pub use self::core::Indexer;
