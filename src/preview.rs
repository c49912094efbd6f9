//! Local preview files.

use crate::options::LocalPreview;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Generated names look like `example_1a2b3c4d.png`.
pub fn random_file_name() -> String {
    format!("example_{}.png", hex::encode(rand::random::<[u8; 4]>()))
}

/// Destination of a preview; a relative name when no directory is configured.
pub fn preview_path(preview: &LocalPreview) -> PathBuf {
    let name = preview
        .file_name
        .clone()
        .unwrap_or_else(random_file_name);
    if preview.dir.as_os_str().is_empty() {
        PathBuf::from(name)
    } else {
        preview.dir.join(name)
    }
}

/// Writes the image bytes unchanged.
pub async fn write_preview(path: &Path, image: &[u8]) -> Result<()> {
    tokio::fs::write(path, image)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_names_have_eight_hex_chars() {
        let name = random_file_name();
        let hex_part = name
            .strip_prefix("example_")
            .and_then(|s| s.strip_suffix(".png"))
            .unwrap();
        assert_eq!(hex_part.len(), 8);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fixed_name_joined_with_dir() {
        let preview = LocalPreview {
            dir: PathBuf::from("/tmp/shots"),
            file_name: Some("example.png".into()),
        };
        assert_eq!(preview_path(&preview), PathBuf::from("/tmp/shots/example.png"));

        let trailing = LocalPreview {
            dir: PathBuf::from("/tmp/shots/"),
            file_name: Some("example.png".into()),
        };
        assert_eq!(preview_path(&trailing), PathBuf::from("/tmp/shots/example.png"));
    }

    #[test]
    fn empty_dir_means_working_directory() {
        let preview = LocalPreview {
            dir: PathBuf::new(),
            file_name: None,
        };
        let path = preview_path(&preview);
        assert_eq!(path.parent(), Some(Path::new("")));
        assert!(path.to_string_lossy().starts_with("example_"));
    }

    #[tokio::test]
    async fn writes_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let bytes = [0x89, b'P', b'N', b'G', 0, 1, 2, 255];
        write_preview(&path, &bytes).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("shot.png");
        let err = write_preview(&path, b"x").await.unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }
}
