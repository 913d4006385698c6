//! Upload metadata handed over by the blob storage collaborator.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Describes a finished upload. The core never touches the bytes; it
/// only attaches these fields to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_extension"))]
pub struct FileMetadata {
    /// The client-side file name, including extension.
    #[validate(length(min = 1, max = 1024))]
    pub original_name: String,
    /// Opaque storage key produced by the blob store.
    #[validate(length(min = 1))]
    pub file_url: String,
    /// Size in bytes.
    #[validate(range(min = 0))]
    pub size_bytes: i64,
    /// MIME type reported by the upload.
    #[validate(length(min = 1))]
    pub mime_type: String,
    /// Explicit extension; derived from `original_name` when absent.
    #[serde(default)]
    pub extension: Option<String>,
}

impl FileMetadata {
    /// The lowercase extension without a leading dot.
    pub fn normalized_extension(&self) -> String {
        match &self.extension {
            Some(ext) => ext.trim_start_matches('.').to_lowercase(),
            None => extension_of(&self.original_name),
        }
    }

    /// `original_name` without its extension.
    pub fn stem(&self) -> String {
        match extension_start(&self.original_name) {
            Some(pos) => self.original_name[..pos].to_string(),
            None => self.original_name.clone(),
        }
    }
}

/// The extension ends up in the document's path, so it may not carry a
/// path separator or whitespace.
fn validate_extension(meta: &FileMetadata) -> Result<(), ValidationError> {
    let extension = meta.normalized_extension();
    if extension.chars().any(|c| c == '/' || c.is_whitespace() || c.is_control()) {
        let mut err = ValidationError::new("extension");
        err.message = Some(format!("Invalid file extension '{extension}'").into());
        return Err(err);
    }
    Ok(())
}

fn extension_start(file_name: &str) -> Option<usize> {
    file_name
        .rfind('.')
        .filter(|pos| *pos > 0 && pos + 1 < file_name.len())
}

/// Lowercase text after the last `.`, or empty when there is none.
/// A leading dot (`.env`) does not start an extension.
pub fn extension_of(file_name: &str) -> String {
    extension_start(file_name)
        .map(|pos| file_name[pos + 1..].to_lowercase())
        .unwrap_or_default()
}
