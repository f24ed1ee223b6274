//! Reading a local image into an uploadable payload.

use std::path::Path;

use mammoscan_client::ImageFile;
use mammoscan_common::{MammoscanError, Result};

pub const DICOM_MIME: &str = "application/dicom";

/// MIME type from the file extension; `.dcm` / `.dicom` map to DICOM.
pub fn content_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("dcm") | Some("dicom") => DICOM_MIME.to_string(),
        _ => mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

pub async fn read_image(path: &Path) -> Result<ImageFile> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MammoscanError::InvalidFile(format!("no file name in {}", path.display())))?
        .to_string();

    let bytes = tokio::fs::read(path).await?;
    Ok(ImageFile::new(filename, content_type_for(path), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("scan.png")), "image/png");
        assert_eq!(content_type_for(Path::new("scan.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("study/IM0001.DCM")), "application/dicom");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_read_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("right_mlo.png");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let image = read_image(&path).await.unwrap();
        assert_eq!(image.filename, "right_mlo.png");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.size(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = read_image(Path::new("/no/such/dir/scan.png")).await.unwrap_err();
        assert!(matches!(err, MammoscanError::Io(_)));
    }
}
