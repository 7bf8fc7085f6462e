use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Blob storage backed by the local upload directory, served publicly under
/// `/uploads`. Given a relative path and a payload it returns the publicly
/// resolvable URL.
#[derive(Clone)]
pub struct StorageService {
    upload_dir: PathBuf,
    public_base_url: String,
    max_file_size: usize,
}

impl StorageService {
    pub fn new(upload_dir: &str, public_base_url: &str, max_file_size: usize) -> Self {
        Self {
            upload_dir: PathBuf::from(upload_dir),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_file_size,
        }
    }

    pub async fn upload_file(&self, path: &str, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(AppError::BadRequest("Empty file".to_string()));
        }
        if data.len() > self.max_file_size {
            return Err(AppError::BadRequest(format!(
                "File size {} exceeds maximum allowed size {}",
                data.len(),
                self.max_file_size
            )));
        }

        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            return Err(AppError::BadRequest("Invalid storage path".to_string()));
        }

        let target = self.upload_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&target).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(format!("{}/uploads/{}", self.public_base_url, relative))
    }

    /// Images are decoded-format checked before they land on disk.
    pub async fn upload_image(&self, path: &str, data: &[u8]) -> Result<String> {
        image::guess_format(data)
            .map_err(|_| AppError::BadRequest("Unrecognized image format".to_string()))?;

        self.upload_file(path, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> StorageService {
        StorageService::new("/tmp/share-ur-save-test", "http://localhost:3000/", 1024)
    }

    #[tokio::test]
    async fn rejects_empty_payload() {
        let err = service().upload_file("a/b", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn rejects_oversized_payload() {
        let data = vec![0u8; 2048];
        let err = service().upload_file("a/b", &data).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let err = service().upload_file("../etc/passwd", b"x").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn rejects_non_image_payload_for_images() {
        let err = service()
            .upload_image("u/thumbnail", b"definitely not an image")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn stored_file_resolves_to_public_url() {
        let url = service().upload_file("s1/thumbnail", b"bytes").await.unwrap();
        assert_eq!(url, "http://localhost:3000/uploads/s1/thumbnail");
    }
}
