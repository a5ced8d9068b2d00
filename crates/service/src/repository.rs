use async_trait::async_trait;
use models::{UserPatch, UserRecord};

use crate::errors::ServiceError;

/// Storage seam for player profiles.
/// The HTTP layer only sees this trait; `file::user_store::UserStore` is the production backend.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_all(&self) -> Vec<UserRecord>;
    async fn find_by_id(&self, id: u64) -> Option<UserRecord>;
    async fn find_by_name(&self, name: &str) -> Option<UserRecord>;
    async fn insert(&self, record: UserRecord) -> Result<UserRecord, ServiceError>;
    async fn create(&self, name: &str) -> Result<UserRecord, ServiceError>;
    async fn update(&self, id: u64, patch: UserPatch) -> Result<UserRecord, ServiceError>;
    async fn remove(&self, id: u64) -> Result<UserRecord, ServiceError>;
    async fn reset_to_default(&self, id: u64) -> Result<UserRecord, ServiceError>;
}
