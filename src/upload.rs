use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum_extra::extract::Multipart;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};

pub const IMAGE_FIELD: &str = "image";

static JPEG_MIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)jpeg|jpg").unwrap());

#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// JPEG only: the declared content type and the file extension must both agree.
pub fn is_allowed(file_name: &str, content_type: Option<&str>) -> bool {
    let mime_ok = content_type.is_some_and(|ct| JPEG_MIME_RE.is_match(ct));
    let ext_ok = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    mime_ok && ext_ok
}

/// Reads the single `image` file part. Text fields are skipped; any other file
/// part is rejected. The part body is only read once its metadata passes the filter.
pub async fn read_image(multipart: &mut Multipart) -> Result<UploadedImage> {
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await? {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        if field.name() != Some(IMAGE_FIELD) || image.is_some() {
            return Err(Error::unexpected_field());
        }

        let content_type = field.content_type().map(|ct| ct.to_string());
        if !is_allowed(&file_name, content_type.as_deref()) {
            return Err(Error::unsupported_type());
        }

        let bytes = field.bytes().await?;
        image = Some(UploadedImage {
            file_name,
            content_type: content_type.unwrap_or_default(),
            bytes,
        });
    }

    image.ok_or_else(Error::no_file)
}

/// An upload written to the staging directory. The file is deleted when the
/// guard is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct StagedUpload {
    path: Option<PathBuf>,
}

impl StagedUpload {
    pub async fn write(dir: &Path, image: &UploadedImage) -> io::Result<Self> {
        let staged = Self {
            path: Some(dir.join(staging_name(&image.file_name))),
        };
        tokio::fs::write(staged.path(), &image.bytes).await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    pub async fn remove(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => tokio::fs::remove_file(path).await,
            None => Ok(()),
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            // blocking, but a single unlink of a small file
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed staged upload {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove staged upload {}: {}", path.display(), e),
            }
        }
    }
}

fn staging_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let safe: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    format!("{}-{}", Uuid::new_v4(), safe)
}
