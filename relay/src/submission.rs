use std::path::PathBuf;

/// The validated text fields of one petition form post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub payment_date: String,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
}

/// A `proof` file part held in memory between intake and storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename exactly as the client declared it.
    pub original_name: String,
    pub content: Vec<u8>,
}

/// A proof file persisted to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub original_name: String,
    pub storage_path: PathBuf,
}
