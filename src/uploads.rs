use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
};
use uuid::Uuid;

use crate::api::error::ApiError;

/// Public URL prefix under which [`UploadStore`] files are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Resolves the MIME type from the declared content type, falling back to
    /// the file name.
    pub fn mime(&self) -> mime::Mime {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .filter(|m| *m != mime::APPLICATION_OCTET_STREAM)
            .unwrap_or_else(|| mime_guess::from_path(&self.file_name).first_or_octet_stream())
    }

    /// Stored extension for the accepted raster formats. Taken from the MIME
    /// type only, never from the client's file name. SVG is refused since it
    /// can carry script.
    fn extension(&self) -> Option<&'static str> {
        match self.mime().essence_str() {
            "image/png" => Some("png"),
            "image/jpeg" | "image/pjpeg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            "image/bmp" => Some("bmp"),
            _ => None,
        }
    }
}

/// Text fields and files of a `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

#[async_trait]
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::collect(multipart).await
    }
}

impl MultipartForm {
    async fn collect(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    // Browsers send an empty part when no file was chosen
                    if !data.is_empty() {
                        form.files.insert(
                            name,
                            UploadedFile {
                                file_name,
                                content_type,
                                data,
                            },
                        );
                    }
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// A trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Writes uploaded images below a root directory that is served statically.
#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores an image under `<root>/<kind>/` and returns its public path.
    pub async fn save_image(&self, kind: &str, file: &UploadedFile) -> Result<String, ApiError> {
        let Some(extension) = file.extension() else {
            return Err(ApiError::bad_request(format!(
                "{} is not a supported image.",
                file.file_name
            )));
        };

        let dir = self.root.join(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating upload directory {}", dir.display()))?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = dir.join(&stored_name);
        tokio::fs::write(&path, &file.data)
            .await
            .with_context(|| format!("writing upload {}", path.display()))?;

        tracing::info!(
            "stored upload {} ({} bytes) as {}",
            file.file_name,
            file.data.len(),
            path.display()
        );

        Ok(format!("{PUBLIC_PREFIX}/{kind}/{stored_name}"))
    }

    /// Removes a file stored by [`UploadStore::save_image`] whose database row
    /// was never written.
    pub async fn discard(&self, public_path: &str) {
        let Some(relative) = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|p| p.strip_prefix('/'))
            .filter(|p| !p.split('/').any(|segment| segment == ".."))
        else {
            return;
        };

        let path = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("failed to discard upload {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            data: Bytes::from_static(b"\x89PNG\r\n"),
        }
    }

    #[test]
    fn mime_falls_back_to_file_name() {
        assert_eq!(file("avatar.png", None).extension(), Some("png"));
        assert_eq!(file("avatar.png", Some("application/octet-stream")).extension(), Some("png"));
        assert_eq!(file("blob", Some("image/jpeg")).extension(), Some("jpg"));
        assert_eq!(file("notes.txt", None).extension(), None);
        assert_eq!(file("avatar.png", Some("text/plain")).extension(), None);
    }

    #[test]
    fn extension_ignores_client_file_name() {
        assert_eq!(file("Avatar.PNG", None).extension(), Some("png"));
        assert_eq!(file("evil.html", Some("image/png")).extension(), Some("png"));
        assert_eq!(file("photo.jpeg", Some("image/jpeg")).extension(), Some("jpg"));
    }

    #[test]
    fn svg_is_not_accepted() {
        assert_eq!(file("logo.svg", Some("image/svg+xml")).extension(), None);
        assert_eq!(file("logo.svg", None).extension(), None);
    }

    #[tokio::test]
    async fn save_image_writes_under_kind_directory() {
        let root = std::env::temp_dir().join(format!("drms-uploads-{}", Uuid::new_v4()));
        let store = UploadStore::new(&root);

        let public = store.save_image("profiles", &file("me.png", Some("image/png"))).await.unwrap();
        assert!(public.starts_with("/uploads/profiles/"));
        assert!(public.ends_with(".png"));

        let stored = root.join(public.trim_start_matches("/uploads/"));
        assert_eq!(tokio::fs::read(&stored).await.unwrap(), b"\x89PNG\r\n");

        let rejected = store.save_image("profiles", &file("notes.txt", Some("text/plain"))).await;
        assert!(matches!(rejected, Err(ApiError::BadRequest(_))));

        let html = store
            .save_image("profiles", &file("evil.html", Some("image/png")))
            .await
            .unwrap();
        assert!(html.ends_with(".png"));

        let svg = store.save_image("logos", &file("logo.svg", Some("image/svg+xml"))).await;
        assert!(matches!(svg, Err(ApiError::BadRequest(_))));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn discard_removes_stored_file() {
        let root = std::env::temp_dir().join(format!("drms-uploads-{}", Uuid::new_v4()));
        let store = UploadStore::new(&root);

        let public = store.save_image("logos", &file("logo.png", Some("image/png"))).await.unwrap();
        let stored = root.join(public.trim_start_matches("/uploads/"));
        assert!(stored.exists());

        store.discard(&public).await;
        assert!(!stored.exists());

        // Paths outside the store are ignored
        store.discard("/uploads/../Cargo.toml").await;
        store.discard("/etc/passwd").await;

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
