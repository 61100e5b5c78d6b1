use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::{ports::FileStore, DomainError};

/// Stores uploads as plain files under one directory.
pub struct LocalFileStore {
    dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Keeps only the final path component so uploads cannot escape the
/// upload directory.
fn sanitize_filename(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| DomainError::validation(format!("invalid file name: {filename:?}")))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DomainError::io(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.dir.join(format!("{}_{name}", Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::io(format!("Failed to write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "upload saved");
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> Result<(), DomainError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::io(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_dir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\docs\\a.pdf").as_deref(), Some("a.pdf"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let store = LocalFileStore::new(temp_dir().join("uploads"));

        let path = store.save("doc.pdf", b"%PDF-1.4").await.unwrap();
        assert!(path.starts_with(store.dir()));
        assert!(path.to_string_lossy().ends_with("_doc.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

        store.remove(&path).await.unwrap();
        assert!(!path.exists());
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_name_does_not_clobber() {
        let store = LocalFileStore::new(temp_dir());
        let a = store.save("doc.pdf", b"a").await.unwrap();
        let b = store.save("doc.pdf", b"b").await.unwrap();
        assert_ne!(a, b);
    }
}
