use crate::FileType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File name cannot be empty")]
    EmptyFileName,
    #[error("Please use .html, .css, or .js extension")]
    UnsupportedExtension,
    #[error("Folder name cannot be empty")]
    EmptyFolderName,
    #[error("Folder names should not contain dots")]
    DottedFolderName,
}

/// Checks a new file name and returns the content type its extension implies.
pub fn validate_file_name(name: &str) -> Result<FileType, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyFileName);
    }
    FileType::from_file_name(name).ok_or(ValidationError::UnsupportedExtension)
}

pub fn validate_folder_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyFolderName);
    }
    if name.contains('.') {
        return Err(ValidationError::DottedFolderName);
    }
    Ok(())
}
