use chrono::Utc;
use tracing::info;

use crate::common::{Actor, ApiError, ApiResult, Capability};
use crate::kernel::{ServerDeps, IMAGE_BUCKET};

/// A file taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Store an uploaded image as `original/<millis>.<ext>` and return its URL.
///
/// Without a file, an already-set URL is kept as is.
pub async fn upload_image(
    actor: Actor,
    file: Option<ImageUpload>,
    existing_url: Option<String>,
    deps: &ServerDeps,
) -> ApiResult<String> {
    actor.can(Capability::ManageNews).check()?;

    let Some(file) = file.filter(|f| !f.bytes.is_empty()) else {
        return existing_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("No image selected"));
    };

    let content_type = file
        .content_type
        .clone()
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| {
            file.file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(ApiError::bad_request("Only image files can be uploaded"));
    }

    let path = format!(
        "original/{}.{}",
        Utc::now().timestamp_millis(),
        extension_for(file.file_name.as_deref(), &content_type)
    );

    let size = file.bytes.len();
    deps.image_storage
        .put(&path, file.bytes, &content_type)
        .await?;

    info!(path = %path, size, "image uploaded");
    Ok(deps.image_storage.public_url(&path))
}

/// Object path inside the managed bucket, if the URL points into it.
pub fn managed_image_path(image_url: &str) -> Option<String> {
    let marker = format!("{}/", IMAGE_BUCKET);
    let start = image_url.find(&marker)? + marker.len();
    let path = image_url[start..]
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    (!path.is_empty()).then(|| path.to_string())
}

fn extension_for(file_name: Option<&str>, content_type: &str) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_path_from_public_url() {
        assert_eq!(
            managed_image_path("http://localhost:8080/storage/news-images/original/17.png"),
            Some("original/17.png".to_string())
        );
        assert_eq!(
            managed_image_path("https://cdn.test/news-images/original/17.png?v=2"),
            Some("original/17.png".to_string())
        );
    }

    #[test]
    fn external_urls_are_not_managed() {
        assert_eq!(managed_image_path("https://example.com/photo.jpg"), None);
        assert_eq!(managed_image_path("https://cdn.test/news-images/"), None);
    }

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(extension_for(Some("Photo.JPG"), "image/jpeg"), "jpg");
        assert_eq!(extension_for(None, "image/png"), "png");
        assert_eq!(extension_for(Some("noext"), "image/png"), "png");
    }
}
