//! # StudyMate: study assistant backend
//!
//! Students upload PDF, DOCX or TXT documents and then ask an agent to chat
//! about them (retrieval-augmented), summarize them, narrate them as audio,
//! find further references, or clarify free-form doubts.
//!
//! ## Architecture
//!
//! - **[`config`]**: JSON configuration with defaults and validation
//! - **[`db`]**: SQLite persistence: documents, chat turns, voice notes, vector indexes
//! - **[`embedder`]**: Text embedding (ONNX all-MiniLM-L6-v2, remote HTTP, mock)
//! - **[`indexer`]**: Overlapping text chunking and index building
//! - **[`vector`]**: Per-document vector index and its persistence backends
//! - **[`retrieval`]**: Three-tier index lookup with per-document single-flight builds
//! - **[`agent`]**: Mode dispatcher and the chat/summarize/voice/reference/doubt handlers
//! - **[`llm`]**, **[`speech`]**, **[`search`]**: External collaborators
//! - **[`extract`]**: Plain-text extraction from uploads
//! - **[`server`]**: axum HTTP routes

pub mod agent;
pub mod config;
pub mod db;
pub mod deadline;
pub mod embedder;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod llm;
pub mod retrieval;
pub mod search;
pub mod server;
pub mod speech;
pub mod vector;
