//! Audio upload validation.
//!
//! Checks a local audio file before it is sent to `POST /run`: size cap,
//! accepted extensions, and prompt normalisation.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Largest accepted upload (50 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Accepted extensions and the MIME type sent for each
const ACCEPTED_FORMATS: &[(&str, &str)] = &[
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
];

/// Errors that can occur while validating an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Audio file not found: {0}")]
    NotFound(PathBuf),

    #[error("Max file size is 50MB (got {actual} bytes)")]
    TooLarge { actual: u64 },

    #[error("Only audio files (.wav, .mp3, .m4a, .flac, .ogg) are accepted: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An audio file plus the optional user prompt
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub path: PathBuf,
    prompt: Option<String>,
}

impl AudioUpload {
    pub fn new(path: impl Into<PathBuf>, prompt: Option<String>) -> Self {
        Self {
            path: path.into(),
            prompt,
        }
    }

    /// Trimmed prompt, or `None` when blank
    pub fn prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// File name sent in the multipart part
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// MIME type for the file, derived from its extension
    pub fn mime_type(&self) -> Result<&'static str, UploadError> {
        mime_for(&self.path).ok_or_else(|| UploadError::UnsupportedFormat(self.path.clone()))
    }

    /// Check format and size
    pub fn validate(&self) -> Result<u64, UploadError> {
        self.mime_type()?;

        if !self.path.exists() {
            return Err(UploadError::NotFound(self.path.clone()));
        }

        let size = std::fs::metadata(&self.path)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge { actual: size });
        }

        Ok(size)
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_FORMATS
        .iter()
        .find(|(accepted, _)| *accepted == ext)
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_is_trimmed() {
        let upload = AudioUpload::new("clip.wav", Some("  what is this?  ".to_string()));
        assert_eq!(upload.prompt(), Some("what is this?"));

        let blank = AudioUpload::new("clip.wav", Some("   ".to_string()));
        assert_eq!(blank.prompt(), None);
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(AudioUpload::new("a.WAV", None).mime_type().unwrap(), "audio/wav");
        assert_eq!(AudioUpload::new("a.m4a", None).mime_type().unwrap(), "audio/mp4");
        assert!(AudioUpload::new("a.txt", None).mime_type().is_err());
        assert!(AudioUpload::new("noext", None).mime_type().is_err());
    }

    #[test]
    fn test_validate_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.flac");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0u8; 1024]).unwrap();

        let upload = AudioUpload::new(&path, None);
        assert_eq!(upload.validate().unwrap(), 1024);
        assert_eq!(upload.file_name(), "clip.flac");
    }

    #[test]
    fn test_validate_missing_file() {
        let upload = AudioUpload::new("/definitely/not/here.ogg", None);
        assert!(matches!(upload.validate(), Err(UploadError::NotFound(_))));
    }

    #[test]
    fn test_validate_oversized_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.mp3");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

        let upload = AudioUpload::new(&path, None);
        assert!(matches!(
            upload.validate(),
            Err(UploadError::TooLarge { actual }) if actual == MAX_UPLOAD_BYTES + 1
        ));
    }
}
