//! Storage abstractions for service layer
//!
//! Contains reusable file-backed stores that keep a whole document in memory
//! and rewrite it to disk after every mutation.

pub mod json_doc_store;
