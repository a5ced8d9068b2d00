//! Service layer for player profiles.
//! - `storage`: generic JSON document persistence, one file per document.
//! - `file`: the file-backed user store built on top of it.
//! - `repository`: the trait the HTTP layer depends on, so backends can be swapped in tests.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod file;
pub mod repository;
