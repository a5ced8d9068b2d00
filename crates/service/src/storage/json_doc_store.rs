use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::RwLock};
use tracing::error;

use crate::errors::ServiceError;

/// Generic JSON file-backed document store.
///
/// Keeps the whole document `D` in memory and rewrites the file in full after
/// every mutation. A store built with [`JsonDocStore::in_memory`] has no file and
/// never touches the disk.
pub struct JsonDocStore<D> {
    inner: RwLock<D>,
    file_path: Option<PathBuf>,
}

impl<D> JsonDocStore<D>
where
    D: serde::Serialize + serde::de::DeserializeOwned + Default + Send + Sync,
{
    /// Load the document from `path`. A missing or blank file yields `D::default()`;
    /// unreadable or malformed content is an error.
    ///
    /// The parent directory must already exist (see `runtime::ensure_data_dir`).
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let file_path = path.into();

        let doc: D = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => D::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ServiceError::Storage(format!("invalid data file {}: {}", file_path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => D::default(),
            Err(e) => return Err(ServiceError::Storage(e.to_string())),
        };

        Ok(Self { inner: RwLock::new(doc), file_path: Some(file_path) })
    }

    pub fn in_memory(doc: D) -> Self {
        Self { inner: RwLock::new(doc), file_path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    async fn save(&self, doc: &D) -> Result<(), ServiceError> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let data =
            serde_json::to_vec_pretty(doc).map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::write(path, data).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to write data file");
            ServiceError::Storage(e.to_string())
        })
    }

    /// Run `f` against a shared borrow of the document.
    pub async fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        let doc = self.inner.read().await;
        f(&doc)
    }

    /// Apply a mutation and persist the full document.
    ///
    /// The write lock is held until the file write finishes, so snapshots hit the
    /// disk in mutation order. If `f` fails nothing is written. If the write fails
    /// the in-memory change is kept and the error is returned.
    pub async fn update<R>(
        &self,
        f: impl FnOnce(&mut D) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let mut doc = self.inner.write().await;
        let out = f(&mut doc)?;
        self.save(&doc).await?;
        Ok(out)
    }
}
