//! File-backed implementations of the service repositories.

pub mod user_store;
