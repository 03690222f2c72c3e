//! Upload validator — pre-flight checks on files before they reach the server.
//!
//! Rules:
//! - declared size above the configured maximum → `too_large`
//! - mime (or, failing that, file extension) outside the allow-list →
//!   `unsupported_type`
//!
//! Validation is pure. A passing candidate becomes a [`ValidatedUpload`],
//! the only thing the mutation pipeline accepts for a dataset upload.

use mlstudio_config::UploadConfig;
use mlstudio_core::error::ValidationError;
use std::path::Path;

/// Mime types the server understands, with the extension each maps to.
const KNOWN_MIME_TYPES: &[(&str, &str)] = &[
    ("text/csv", "csv"),
    ("application/json", "json"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("application/vnd.ms-excel", "xls"),
    ("application/parquet", "parquet"),
];

/// A file the user wants to upload, described by what it claims to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub file_name: String,
    pub declared_size: u64,
    pub declared_mime: Option<String>,
}

impl UploadCandidate {
    pub fn new(file_name: impl Into<String>, declared_size: u64, declared_mime: Option<String>) -> Self {
        Self {
            file_name: file_name.into(),
            declared_size,
            declared_mime,
        }
    }

    /// Describe a file on disk from its metadata. No mime is declared.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, metadata.len(), None))
    }

    /// Lower-cased file extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// A candidate that passed validation.
///
/// Only [`UploadValidator::approve`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    file_name: String,
    extension: String,
    mime: String,
    size: u64,
}

impl ValidatedUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The declared mime, or the canonical one for the extension.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_size_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

impl UploadValidator {
    pub fn new(max_size_bytes: u64, allowed_extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            max_size_bytes,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_size_bytes, config.allowed_extensions.iter().cloned())
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Check a candidate against the size limit and the type allow-list.
    pub fn validate(&self, candidate: &UploadCandidate) -> Result<(), ValidationError> {
        self.approve(candidate).map(|_| ())
    }

    /// Validate and, on success, produce the token the upload mutation takes.
    pub fn approve(&self, candidate: &UploadCandidate) -> Result<ValidatedUpload, ValidationError> {
        if candidate.declared_size > self.max_size_bytes {
            return Err(ValidationError::too_large(
                candidate.declared_size,
                self.max_size_bytes,
            ));
        }

        let extension = self.resolve_extension(candidate).ok_or_else(|| {
            let what = candidate
                .declared_mime
                .clone()
                .or_else(|| candidate.extension().map(|e| format!(".{e}")))
                .unwrap_or_else(|| candidate.file_name.clone());
            ValidationError::unsupported_type(what)
        })?;

        let mime = candidate
            .declared_mime
            .clone()
            .filter(|m| extension_for_mime(m).is_some())
            .or_else(|| mime_for_extension(&extension).map(String::from))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(ValidatedUpload {
            file_name: candidate.file_name.clone(),
            extension,
            mime,
            size: candidate.declared_size,
        })
    }

    /// Mime first; the file extension only when the mime is absent or unknown.
    fn resolve_extension(&self, candidate: &UploadCandidate) -> Option<String> {
        let from_mime = candidate
            .declared_mime
            .as_deref()
            .and_then(extension_for_mime)
            .map(String::from);

        from_mime
            .into_iter()
            .chain(candidate.extension())
            .find(|ext| self.allowed_extensions.iter().any(|a| a == ext))
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    KNOWN_MIME_TYPES
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    KNOWN_MIME_TYPES
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(m, _)| *m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlstudio_core::error::ValidationReason;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn oversized_file_rejected() {
        let validator = UploadValidator::default();
        let candidate = UploadCandidate::new("big.csv", 150 * MIB, Some("text/csv".into()));
        let err = validator.validate(&candidate).unwrap_err();
        assert_eq!(err.reason, ValidationReason::TooLarge);
        assert!(err.user_message().contains("too large"));
    }

    #[test]
    fn small_csv_passes() {
        let validator = UploadValidator::default();
        let candidate = UploadCandidate::new("iris.csv", 1024, Some("text/csv".into()));
        assert!(validator.validate(&candidate).is_ok());

        let upload = validator.approve(&candidate).unwrap();
        assert_eq!(upload.extension(), "csv");
        assert_eq!(upload.mime(), "text/csv");
        assert_eq!(upload.size(), 1024);
    }

    #[test]
    fn exactly_at_limit_passes() {
        let validator = UploadValidator::default();
        let candidate = UploadCandidate::new("edge.parquet", 100 * MIB, None);
        assert!(validator.validate(&candidate).is_ok());
    }

    #[test]
    fn unknown_mime_falls_back_to_extension() {
        let validator = UploadValidator::default();
        let candidate = UploadCandidate::new("Sales.XLSX", 2048, Some("application/octet-stream".into()));
        let upload = validator.approve(&candidate).unwrap();
        assert_eq!(upload.extension(), "xlsx");
        assert_eq!(
            upload.mime(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn mime_parameters_ignored() {
        let validator = UploadValidator::default();
        let candidate = UploadCandidate::new("data", 10, Some("application/json; charset=utf-8".into()));
        assert_eq!(validator.approve(&candidate).unwrap().extension(), "json");
    }

    #[test]
    fn unsupported_type_rejected() {
        let validator = UploadValidator::default();
        let err = validator
            .validate(&UploadCandidate::new("setup.exe", 10, None))
            .unwrap_err();
        assert_eq!(err.reason, ValidationReason::UnsupportedType);
        assert!(err.detail.contains(".exe"));

        let err = validator
            .validate(&UploadCandidate::new("notes", 10, Some("text/plain".into())))
            .unwrap_err();
        assert_eq!(err.reason, ValidationReason::UnsupportedType);
    }

    #[test]
    fn configured_allow_list_narrows_types() {
        let validator = UploadValidator::new(10 * MIB, [".CSV"]);
        assert!(validator.validate(&UploadCandidate::new("a.csv", 1, None)).is_ok());
        assert!(validator.validate(&UploadCandidate::new("a.json", 1, None)).is_err());
    }

    #[test]
    fn from_path_reads_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titanic.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let candidate = UploadCandidate::from_path(&path).unwrap();
        assert_eq!(candidate.file_name, "titanic.csv");
        assert_eq!(candidate.declared_size, 8);
        assert_eq!(candidate.declared_mime, None);
        assert_eq!(candidate.extension().as_deref(), Some("csv"));
    }
}
