//! Sentence embeddings over HTTP, plus offline precompute for datasets.
//!
//! `sbert-service` wraps the all-MiniLM-L6-v2 sentence-embedding model (384
//! dimensions, run locally through ONNX Runtime) in a small JSON API and a
//! batch command that enriches a microcontents dataset with embeddings.
//!
//! # Architecture
//!
//! - **Model**: loaded lazily, once per process, behind [`embedding::LazyModel`]
//! - **Text**: every caller builds model input with
//!   [`record::ContentRecord::embedding_text`], so stored and live embeddings agree
//! - **Service**: axum routes `/health`, `/embedding`, `/similarity`
//! - **Batch**: one `embed_batch` call per dataset, file rewritten only on success
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`embedding`] — Text-to-vector embedding pipeline via ONNX Runtime
//! - [`record`] — Content records and the embedding text rule
//! - [`precompute`] — Dataset enrichment and embedding statistics
//! - [`server`] — HTTP API
//! - [`client`] — HTTP client for the API

pub mod client;
pub mod config;
pub mod embedding;
pub mod precompute;
pub mod record;
pub mod server;
