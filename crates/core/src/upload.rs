//! File acceptance checks run before the preview parser.
//!
//! Rejected files never reach the Job Service.

use crate::error::FileError;

/// Maximum accepted upload size (10 MiB).
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions of delimited-text files the wizard accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Content types of delimited-text files the wizard accepts.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "text/plain",
    "text/tab-separated-values",
];

/// Spreadsheet workbook extensions. These are binary and must be exported
/// to CSV before import.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "ods"];

/// A file picked by the user.
#[derive(Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    /// Build an upload, guessing the content type from the file name.
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            content,
        }
    }

    /// Build an upload with an explicit content type (e.g. from a browser).
    pub fn with_content_type(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            content,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Lowercase extension without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Content type without parameters, lower-cased.
    fn essence(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Check type and size of an upload.
pub fn check_upload(upload: &FileUpload, max_bytes: u64) -> Result<(), FileError> {
    let extension = upload.extension();
    let essence = upload.essence();

    if extension
        .as_deref()
        .is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e))
    {
        return Err(FileError::UnsupportedType(upload.file_name.clone()));
    }

    let extension_ok = extension
        .as_deref()
        .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e));
    let type_ok = ACCEPTED_CONTENT_TYPES.contains(&essence.as_str());
    if !extension_ok && !type_ok {
        return Err(FileError::UnsupportedType(essence));
    }

    if upload.size() > max_bytes {
        return Err(FileError::TooLarge {
            size: upload.size(),
            limit: max_bytes,
        });
    }

    if upload.content.is_empty() {
        return Err(FileError::Empty);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn content_type_is_guessed_from_name() {
        assert_eq!(FileUpload::new("a.csv", vec![]).content_type, "text/csv");
        assert_eq!(FileUpload::new("a.txt", vec![]).content_type, "text/plain");
    }

    #[test]
    fn csv_is_accepted() {
        let upload = FileUpload::new("Fournisseurs.CSV", b"name\nAcme\n".to_vec());
        assert!(check_upload(&upload, MAX_FILE_BYTES).is_ok());
    }

    #[test]
    fn csv_labelled_as_excel_by_browser_is_accepted() {
        let upload = FileUpload::with_content_type(
            "export.csv",
            "application/vnd.ms-excel",
            b"a\n1".to_vec(),
        );
        assert!(check_upload(&upload, MAX_FILE_BYTES).is_ok());
    }

    #[test]
    fn workbook_is_rejected() {
        let upload = FileUpload::new("clients.xlsx", vec![0x50, 0x4b, 0x03, 0x04]);
        assert_matches!(check_upload(&upload, MAX_FILE_BYTES), Err(FileError::UnsupportedType(_)));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let upload = FileUpload::with_content_type("photo", "image/png", vec![1, 2, 3]);
        assert_matches!(
            check_upload(&upload, MAX_FILE_BYTES),
            Err(FileError::UnsupportedType(t)) if t == "image/png"
        );
    }

    #[test]
    fn oversize_is_rejected() {
        let upload = FileUpload::new("big.csv", vec![b'a'; 11]);
        assert_matches!(
            check_upload(&upload, 10),
            Err(FileError::TooLarge { size: 11, limit: 10 })
        );
    }

    #[test]
    fn zero_bytes_is_empty() {
        let upload = FileUpload::new("empty.csv", vec![]);
        assert_matches!(check_upload(&upload, MAX_FILE_BYTES), Err(FileError::Empty));
    }
}
