use std::collections::BTreeSet;

use crate::DEFAULT_MAX_FILE_BYTES;

/// Reasons a file is refused at intake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{name}: file type not allowed (expected {expected})")]
    InvalidType { name: String, expected: String },

    #[error("{name}: {size} bytes exceeds the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("{name}: already queued")]
    Duplicate { name: String },
}

impl ValidationError {
    /// Name of the rejected file.
    pub fn file_name(&self) -> &str {
        match self {
            Self::InvalidType { name, .. }
            | Self::TooLarge { name, .. }
            | Self::Duplicate { name } => name,
        }
    }
}

/// Lowercased extension of `name`, without the dot.
///
/// Everything after the last dot counts, so a bare `".xml"` has extension
/// `xml`. Returns `None` for names without one (`"invoice"`, `"invoice."`).
pub fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Type and size rules applied to every candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRules {
    allowed_extensions: BTreeSet<String>,
    max_bytes: u64,
}

impl IntakeRules {
    /// Builds rules from a list of extensions (matched case-insensitively,
    /// leading dots ignored) and a size limit in bytes.
    pub fn new<I, S>(allowed_extensions: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            allowed_extensions,
            max_bytes,
        }
    }

    /// Largest accepted file in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Accepted extensions, lowercased.
    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }

    /// Checks the type first, then the size.
    pub fn check(&self, name: &str, size: u64) -> Result<(), ValidationError> {
        let allowed = file_extension(name)
            .is_some_and(|ext| self.allowed_extensions.contains(&ext));
        if !allowed {
            return Err(ValidationError::InvalidType {
                name: name.to_string(),
                expected: self.expected_label(),
            });
        }

        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                name: name.to_string(),
                size,
                max: self.max_bytes,
            });
        }

        Ok(())
    }

    fn expected_label(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self::new(["xml"], DEFAULT_MAX_FILE_BYTES)
    }
}
