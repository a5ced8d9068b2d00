use std::{collections::HashSet, path::PathBuf, sync::Arc};

use chrono::Utc;
use models::{user_profile::validate_name, Database, UserPatch, UserRecord};
use rand::Rng;
use tracing::info;

use crate::errors::ServiceError;
use crate::repository::UserRepository;
use crate::storage::json_doc_store::JsonDocStore;

/// Upper bound for generated identifiers; keeps ids readable for players.
const MAX_GENERATED_ID: u64 = 999_999_999;

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Player profiles persisted as a single JSON document (`{ "users": [...] }`).
///
/// All records live in memory in insertion order; lookups are linear scans.
pub struct UserStore {
    doc: JsonDocStore<Database>,
}

impl UserStore {
    /// Load the data file, seed the guest record if the collection is empty, and write it back.
    pub async fn load<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let doc = JsonDocStore::<Database>::open(path).await?;
        Self::init(doc).await
    }

    /// Store without a backing file, seeded the same way as [`UserStore::load`].
    pub async fn in_memory() -> Result<Arc<Self>, ServiceError> {
        Self::init(JsonDocStore::in_memory(Database::default())).await
    }

    async fn init(doc: JsonDocStore<Database>) -> Result<Arc<Self>, ServiceError> {
        let count = doc
            .update(|db| {
                let mut seen = HashSet::new();
                if let Some(dup) = db.users.iter().find(|u| !seen.insert(u.id)) {
                    return Err(ServiceError::Validation(format!(
                        "duplicate user id {} in data file",
                        dup.id
                    )));
                }
                if db.users.is_empty() {
                    db.users.push(UserRecord::guest(now_millis()));
                }
                Ok(db.users.len())
            })
            .await?;
        info!(count, path = ?doc.path(), "user store loaded");
        Ok(Arc::new(Self { doc }))
    }

    pub async fn list_all(&self) -> Vec<UserRecord> {
        self.doc.read(|db| db.users.clone()).await
    }

    pub async fn find_by_id(&self, id: u64) -> Option<UserRecord> {
        self.doc.read(|db| db.users.iter().find(|u| u.id == id).cloned()).await
    }

    /// First record with this name, in insertion order.
    pub async fn find_by_name(&self, name: &str) -> Option<UserRecord> {
        self.doc.read(|db| db.users.iter().find(|u| u.name == name).cloned()).await
    }

    /// Append a fully formed record. The id must not already be in use.
    pub async fn insert(&self, record: UserRecord) -> Result<UserRecord, ServiceError> {
        validate_name(&record.name)?;
        let rec = self
            .doc
            .update(|db| {
                if db.users.iter().any(|u| u.id == record.id) {
                    return Err(ServiceError::Validation(format!(
                        "user id {} already exists",
                        record.id
                    )));
                }
                db.users.push(record.clone());
                Ok(record)
            })
            .await?;
        info!(user_id = rec.id, "user inserted");
        Ok(rec)
    }

    /// Create a profile from the default template with a server-generated id.
    pub async fn create(&self, name: &str) -> Result<UserRecord, ServiceError> {
        validate_name(name)?;
        let rec = self
            .doc
            .update(|db| {
                let mut rng = rand::thread_rng();
                let id = loop {
                    let candidate = rng.gen_range(1..=MAX_GENERATED_ID);
                    if !db.users.iter().any(|u| u.id == candidate) {
                        break candidate;
                    }
                };
                let rec = UserRecord::template(id, name, now_millis());
                db.users.push(rec.clone());
                Ok(rec)
            })
            .await?;
        info!(user_id = rec.id, name = %rec.name, "user created");
        Ok(rec)
    }

    /// Shallow-merge `patch` onto the record and persist.
    pub async fn update(&self, id: u64, patch: UserPatch) -> Result<UserRecord, ServiceError> {
        patch.validate()?;
        let rec = self
            .doc
            .update(|db| {
                let existing = db
                    .users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or_else(|| ServiceError::not_found("user", id))?;
                patch.apply(existing);
                Ok(existing.clone())
            })
            .await?;
        info!(user_id = id, "user updated");
        Ok(rec)
    }

    /// Remove the record and persist; returns what was removed.
    pub async fn remove(&self, id: u64) -> Result<UserRecord, ServiceError> {
        let rec = self
            .doc
            .update(|db| {
                let idx = db
                    .users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| ServiceError::not_found("user", id))?;
                Ok(db.users.remove(idx))
            })
            .await?;
        info!(user_id = id, "user removed");
        Ok(rec)
    }

    /// Restore template values, keeping `id` and `name`.
    pub async fn reset_to_default(&self, id: u64) -> Result<UserRecord, ServiceError> {
        let rec = self
            .doc
            .update(|db| {
                let existing = db
                    .users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or_else(|| ServiceError::not_found("user", id))?;
                existing.reset(now_millis());
                Ok(existing.clone())
            })
            .await?;
        info!(user_id = id, "user reset to defaults");
        Ok(rec)
    }
}

#[async_trait::async_trait]
impl UserRepository for UserStore {
    async fn list_all(&self) -> Vec<UserRecord> {
        self.list_all().await
    }

    async fn find_by_id(&self, id: u64) -> Option<UserRecord> {
        self.find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> Option<UserRecord> {
        self.find_by_name(name).await
    }

    async fn insert(&self, record: UserRecord) -> Result<UserRecord, ServiceError> {
        self.insert(record).await
    }

    async fn create(&self, name: &str) -> Result<UserRecord, ServiceError> {
        self.create(name).await
    }

    async fn update(&self, id: u64, patch: UserPatch) -> Result<UserRecord, ServiceError> {
        self.update(id, patch).await
    }

    async fn remove(&self, id: u64) -> Result<UserRecord, ServiceError> {
        self.remove(id).await
    }

    async fn reset_to_default(&self, id: u64) -> Result<UserRecord, ServiceError> {
        self.reset_to_default(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tmp_path() -> PathBuf {
        std::env::temp_dir().join(format!("svc_users_{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn load_seeds_guest_and_writes_file() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = UserStore::load(&tmp).await?;

        let users = store.list_all().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, 0);
        assert_eq!(users[0].name, "guest");

        let on_disk: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&tmp).await?)?;
        assert_eq!(on_disk["users"].as_array().map(Vec::len), Some(1));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn user_store_crud_persists() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = UserStore::load(&tmp).await?;

        // create
        let alice = store.create("Alice").await?;
        assert_eq!(alice.gold, 1000);
        assert_eq!(alice.current_level, 1);
        assert_eq!(alice.formation.len(), 3);
        assert_ne!(alice.id, 0);

        // lookups
        assert_eq!(store.find_by_id(alice.id).await, Some(alice.clone()));
        assert_eq!(store.find_by_name("Alice").await.map(|u| u.id), Some(alice.id));
        assert!(store.find_by_name("nobody").await.is_none());

        // update
        let patch =
            UserPatch { gold: Some(5), finish_guides: Some(vec![1, 2]), ..Default::default() };
        let updated = store.update(alice.id, patch).await?;
        assert_eq!(updated.gold, 5);
        assert_eq!(updated.finish_guides, vec![1, 2]);
        assert_eq!(updated.current_level, alice.current_level);

        // reload from disk
        let reloaded = UserStore::load(&tmp).await?;
        assert_eq!(reloaded.list_all().await, store.list_all().await);

        // remove
        let removed = store.remove(alice.id).await?;
        assert_eq!(removed.id, alice.id);
        assert!(store.find_by_id(alice.id).await.is_none());
        let reloaded = UserStore::load(&tmp).await?;
        assert_eq!(reloaded.list_all().await.len(), 1);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() -> Result<(), anyhow::Error> {
        let store = UserStore::in_memory().await?;
        let before = store.list_all().await;

        assert!(matches!(
            store.update(999, UserPatch::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(store.remove(999).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(store.reset_to_default(999).await, Err(ServiceError::NotFound(_))));
        assert!(store.find_by_id(999).await.is_none());

        assert_eq!(store.list_all().await, before);
        Ok(())
    }

    #[tokio::test]
    async fn reset_preserves_id_and_name() -> Result<(), anyhow::Error> {
        let store = UserStore::in_memory().await?;
        let bob = store.create("Bob").await?;
        let patch = UserPatch {
            gold: Some(1),
            current_level: Some(12),
            buy_times: Some(3),
            has_used_fire_ball: Some(true),
            formation: Some(Vec::new()),
            ..Default::default()
        };
        store.update(bob.id, patch).await?;

        let reset = store.reset_to_default(bob.id).await?;
        assert_eq!(reset.id, bob.id);
        assert_eq!(reset.name, "Bob");
        assert_eq!(reset, UserRecord::template(bob.id, "Bob", reset.create_date));
        Ok(())
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() -> Result<(), anyhow::Error> {
        let store = UserStore::in_memory().await?;
        store.insert(UserRecord::template(42, "Eve", 0)).await?;
        let dup = store.insert(UserRecord::template(42, "Mallory", 0)).await;
        assert!(matches!(dup, Err(ServiceError::Validation(_))));
        assert_eq!(store.list_all().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn blank_names_are_rejected() -> Result<(), anyhow::Error> {
        let store = UserStore::in_memory().await?;
        assert!(matches!(store.create("   ").await, Err(ServiceError::Model(_))));
        let patch = UserPatch { name: Some(String::new()), ..Default::default() };
        assert!(matches!(store.update(0, patch).await, Err(ServiceError::Model(_))));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_ids_in_file_fail_to_load() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let db = Database {
            users: vec![UserRecord::template(1, "a", 0), UserRecord::template(1, "b", 0)],
        };
        tokio::fs::write(&tmp, serde_json::to_vec(&db)?).await?;
        assert!(matches!(UserStore::load(&tmp).await, Err(ServiceError::Validation(_))));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_change() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = UserStore::load(&tmp).await?;
        // Turn the data file into a directory so the next write fails.
        tokio::fs::remove_file(&tmp).await?;
        tokio::fs::create_dir(&tmp).await?;

        let res = store.update(0, UserPatch { gold: Some(7), ..Default::default() }).await;
        assert!(matches!(res, Err(ServiceError::Storage(_))));
        assert_eq!(store.find_by_id(0).await.map(|u| u.gold), Some(7));

        let _ = tokio::fs::remove_dir(&tmp).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_unique_ids() -> Result<(), anyhow::Error> {
        let store = UserStore::in_memory().await?;
        let mut handles = Vec::new();
        for i in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.create(&format!("player{}", i)).await }));
        }
        for h in handles {
            h.await??;
        }

        let users = store.list_all().await;
        assert_eq!(users.len(), 65);
        let ids: HashSet<u64> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), users.len());
        Ok(())
    }
}
