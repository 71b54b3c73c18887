use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::instrument;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum ImageFileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a base64 data URI")]
    NotDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone)]
enum FileSource {
    Memory(Bytes),
    Path(PathBuf),
}

/// A user-picked file: a name, the MIME type the picker reported, and its
/// contents, which are only read when asked for.
#[derive(Debug, Clone)]
pub struct ImageFile {
    name: String,
    mime_type: String,
    source: FileSource,
}

impl ImageFile {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    /// Type is derived from the extension the way a file picker does it.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = image::ImageFormat::from_path(path)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME_TYPE);

        Self {
            name,
            mime_type: mime_type.to_string(),
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub async fn read_bytes(&self) -> Result<Bytes, ImageFileError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|source| ImageFileError::Read {
                    path: path.clone(),
                    source,
                }),
        }
    }

    #[instrument(skip(self), fields(file = %self.name))]
    pub async fn read_as_data_url(&self) -> Result<String, ImageFileError> {
        let bytes = self.read_bytes().await?;
        let mime_type = if self.mime_type.is_empty() {
            FALLBACK_MIME_TYPE
        } else {
            self.mime_type.as_str()
        };
        Ok(format!("data:{};base64,{}", mime_type, STANDARD.encode(&bytes)))
    }
}

/// Splits a `data:<mime>;base64,<payload>` URI into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), ImageFileError> {
    let rest = url.strip_prefix("data:").ok_or(ImageFileError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageFileError::NotDataUrl)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(ImageFileError::NotDataUrl)?;
    let bytes = STANDARD.decode(payload)?;

    Ok((mime_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_from_extension() {
        assert_eq!(ImageFile::from_path("scan.png").mime_type(), "image/png");
        assert_eq!(ImageFile::from_path("dir/scan.JPG").mime_type(), "image/jpeg");
        assert_eq!(
            ImageFile::from_path("notes.txt").mime_type(),
            "application/octet-stream"
        );
        assert_eq!(ImageFile::from_path("dir/scan.png").name(), "scan.png");
    }

    #[test]
    fn test_is_image_checks_prefix_only() {
        assert!(ImageFile::from_bytes("a", "image/x-anything", Vec::<u8>::new()).is_image());
        assert!(!ImageFile::from_bytes("a", "text/plain", Vec::<u8>::new()).is_image());
        assert!(!ImageFile::from_bytes("a", "", Vec::<u8>::new()).is_image());
    }

    #[tokio::test]
    async fn test_read_as_data_url() -> Result<(), Box<dyn std::error::Error>> {
        let file = ImageFile::from_bytes("dot.png", "image/png", vec![1u8, 2, 3]);
        let url = file.read_as_data_url().await?;

        assert_eq!(url, "data:image/png;base64,AQID");

        let (mime_type, bytes) = decode_data_url(&url)?;
        assert_eq!(mime_type, "image/png");
        assert_eq!(bytes, vec![1, 2, 3]);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_fails_to_read() {
        let file = ImageFile::from_path("/definitely/not/here.png");
        let result = file.read_as_data_url().await;

        assert!(matches!(result, Err(ImageFileError::Read { .. })));
    }

    #[test]
    fn test_decode_rejects_plain_urls() {
        assert!(matches!(
            decode_data_url("https://example.com/result.png"),
            Err(ImageFileError::NotDataUrl)
        ));
    }
}
