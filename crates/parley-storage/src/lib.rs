//! parley-storage
//!
//! The document store behind session histories: a `DocumentStore` trait, an
//! S3-backed implementation (one JSON object per document), an in-memory
//! implementation for tests, and the shared process-wide client.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod objects;
pub mod store;
