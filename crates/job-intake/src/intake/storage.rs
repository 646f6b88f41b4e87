use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::config::StorageConfig;

/// Extensions accepted for resume uploads, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Errors raised by the resume file store.
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("No file uploaded")]
    NoFile,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Only PDF, DOC, and DOCX files are allowed")]
    InvalidFileType,
    #[error("File exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: usize },
    #[error("Invalid file path")]
    InvalidPath,
    #[error("File not found")]
    NotFound,
    #[error("resume storage unavailable: {0}")]
    Io(#[from] io::Error),
}

/// Reduce a user supplied filename to a single safe path segment.
///
/// The name is NFKD-decomposed so accented letters keep their base letter,
/// remaining non-ASCII characters are dropped, path separators become word breaks,
/// words are joined with `_`, anything outside `[A-Za-z0-9_.-]` is removed,
/// and leading/trailing dots and underscores are trimmed. The result never
/// contains a separator and is never `.` or `..`; it may be empty.
pub fn sanitize_filename(raw: &str) -> String {
    let spaced: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|ch| if ch == '/' || ch == '\\' { ' ' } else { ch })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|ch| ch == '.' || ch == '_')
        .to_string()
}

/// True when the text after the last dot is an allowed resume extension.
pub fn has_allowed_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}

/// Owns the upload directory. Completed files are written once and never
/// moved or deleted by this process.
#[derive(Debug, Clone)]
pub struct ResumeStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ResumeStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.upload_dir.clone(), config.max_upload_bytes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), FileStoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Store an upload under a timestamp-prefixed sanitized name.
    pub fn upload(&self, bytes: &[u8], declared_filename: &str) -> Result<String, FileStoreError> {
        self.upload_at(bytes, declared_filename, Local::now().naive_local())
    }

    pub fn upload_at(
        &self,
        bytes: &[u8],
        declared_filename: &str,
        received_at: NaiveDateTime,
    ) -> Result<String, FileStoreError> {
        if declared_filename.is_empty() {
            return Err(FileStoreError::NoFileSelected);
        }
        if !has_allowed_extension(declared_filename) {
            return Err(FileStoreError::InvalidFileType);
        }
        if bytes.len() > self.max_bytes {
            return Err(FileStoreError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        let sanitized = sanitize_filename(declared_filename);
        if sanitized.is_empty() || !has_allowed_extension(&sanitized) {
            return Err(FileStoreError::InvalidFileType);
        }

        let stored_name = format!("{}_{}", received_at.format(TIMESTAMP_FORMAT), sanitized);

        self.ensure_root()?;
        write_new_file(&self.root.join(&stored_name), |file| {
            file.write_all(bytes)?;
            file.sync_all()
        })?;

        info!(stored_name = %stored_name, size = bytes.len(), "resume stored");
        Ok(stored_name)
    }

    /// Map a candidate name to the absolute path of an existing file inside
    /// the upload directory.
    pub fn resolve(&self, candidate_filename: &str) -> Result<PathBuf, FileStoreError> {
        let sanitized = sanitize_filename(candidate_filename);
        if sanitized.is_empty() {
            return Err(FileStoreError::InvalidPath);
        }

        let root = match fs::canonicalize(&self.root) {
            Ok(root) => root,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FileStoreError::NotFound)
            }
            Err(err) => return Err(FileStoreError::Io(err)),
        };

        let candidate = root.join(&sanitized);
        if candidate.parent() != Some(root.as_path()) {
            return Err(FileStoreError::InvalidPath);
        }

        let resolved = match fs::canonicalize(&candidate) {
            Ok(resolved) => resolved,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FileStoreError::NotFound)
            }
            Err(err) => return Err(FileStoreError::Io(err)),
        };

        // Symlinks inside the root may still point elsewhere.
        if !resolved.starts_with(&root) {
            return Err(FileStoreError::InvalidPath);
        }
        if !resolved.is_file() {
            return Err(FileStoreError::NotFound);
        }

        Ok(resolved)
    }
}

/// Create `path` (never replacing an existing file) and fill it. A file left
/// half written by a failed `fill` is removed before the error is returned.
pub(crate) fn write_new_file<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    if let Err(err) = fill(&mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial upload");
        }
        return Err(err);
    }
    Ok(())
}
