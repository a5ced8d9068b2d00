//! Domain types for player profiles.
//! - `user_profile`: the persisted record, its default template and partial updates.
//! - `errors`: field-level validation errors shared with the service layer.

pub mod errors;
pub mod user_profile;

pub use user_profile::{Database, FormationSlot, UserPatch, UserRecord};
