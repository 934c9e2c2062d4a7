use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::{
    dto::files::StoredFile,
    error::{AppError, AppResult},
};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Upper bound for a whole upload request, several files included.
pub const MAX_UPLOAD_REQUEST: usize = 50 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Blob storage for uploaded images, rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub async fn init(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::info!(dir = %root.display(), "upload directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates and stores one upload under a freshly generated name.
    pub async fn store(
        &self,
        original_name: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> AppResult<StoredFile> {
        let extension = validate_upload(original_name, bytes.len())?;
        let filename = format!("{}.{}", Uuid::new_v4(), extension);

        fs::write(self.root.join(&filename), bytes).await?;
        tracing::info!(%filename, original = %original_name, size = bytes.len(), "file stored");

        Ok(StoredFile {
            url: format!("/api/files/{filename}"),
            filename,
            original_name: original_name.to_string(),
            size: bytes.len() as u64,
            content_type,
            uploaded_at: Utc::now(),
        })
    }

    /// Runs the upload checks without writing anything.
    pub fn check_upload(&self, original_name: &str, size: usize) -> AppResult<()> {
        validate_upload(original_name, size).map(|_| ())
    }

    /// Resolves a stored name to its path, refusing anything that could escape the root.
    pub fn resolve(&self, filename: &str) -> AppResult<PathBuf> {
        check_file_name(filename)?;
        Ok(self.root.join(filename))
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.resolve(filename) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn delete(&self, filename: &str) -> AppResult<()> {
        let path = self.resolve(filename)?;
        if !fs::try_exists(&path).await? {
            return Err(AppError::NotFound(format!("File not found: {filename}")));
        }
        fs::remove_file(&path).await?;
        tracing::info!(%filename, "file deleted");
        Ok(())
    }
}

fn check_file_name(filename: &str) -> AppResult<()> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(AppError::BadRequest(format!(
            "Filename contains invalid path sequence: {filename}"
        )));
    }
    Ok(())
}

/// Checks an upload and returns its lower-cased extension.
fn validate_upload(original_name: &str, size: usize) -> AppResult<String> {
    if size == 0 {
        return Err(AppError::BadRequest("File is empty".into()));
    }
    check_file_name(original_name)?;
    if size > MAX_FILE_SIZE {
        return Err(AppError::BadRequest(
            "File is too large. Maximum size is 10MB".into(),
        ));
    }

    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest(
            "File type not allowed. Only JPG, JPEG, PNG, GIF and WEBP can be uploaded".into(),
        ));
    }

    Ok(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_image_extensions_in_any_case() {
        assert_eq!(validate_upload("dish.JPG", 10).unwrap(), "jpg");
        assert_eq!(validate_upload("menu.final.webp", 10).unwrap(), "webp");
    }

    #[test]
    fn rejects_bad_uploads() {
        assert!(validate_upload("notes.txt", 10).is_err());
        assert!(validate_upload("noextension", 10).is_err());
        assert!(validate_upload("empty.png", 0).is_err());
        assert!(validate_upload("huge.png", MAX_FILE_SIZE + 1).is_err());
        assert!(validate_upload("../escape.png", 10).is_err());
    }

    #[test]
    fn refuses_traversal_on_lookup() {
        let storage = FileStorage {
            root: PathBuf::from("uploads"),
        };
        assert!(storage.resolve("../Cargo.toml").is_err());
        assert!(storage.resolve("nested/file.png").is_err());
        assert_eq!(
            storage.resolve("abc.png").unwrap(),
            PathBuf::from("uploads").join("abc.png")
        );
    }

    #[tokio::test]
    async fn stores_checks_and_deletes_files() {
        let dir = std::env::temp_dir().join(format!("foodstore-files-{}", Uuid::new_v4()));
        let storage = FileStorage::init(&dir).await.unwrap();

        let stored = storage
            .store("banh-mi.png", Some("image/png".into()), b"\x89PNG fake")
            .await
            .unwrap();
        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.url, format!("/api/files/{}", stored.filename));
        assert!(storage.exists(&stored.filename).await);

        storage.delete(&stored.filename).await.unwrap();
        assert!(!storage.exists(&stored.filename).await);
        assert!(matches!(
            storage.delete(&stored.filename).await,
            Err(AppError::NotFound(_))
        ));

        let _ = fs::remove_dir_all(&dir).await;
    }
}
