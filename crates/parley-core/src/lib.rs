//! parley-core
//!
//! Pure domain types, the stored-record codec, and document key conventions.
//! No AWS SDK dependency — this is the shared vocabulary of the system.

pub mod codec;
pub mod error;
pub mod keys;
pub mod models;
