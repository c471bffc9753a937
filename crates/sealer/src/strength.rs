//! Passphrase policy check run when a new encryption passphrase is provisioned.
//!
//! Independent of the encryption path and free of KDF cost. Every check runs,
//! so a caller can show all violations at once.

use std::fmt;

/// Minimum passphrase length, in characters.
pub const MIN_LENGTH: usize = 16;

/// Placeholder and demo values that must never be used as a real passphrase.
/// Compared case-insensitively after trimming.
pub const BLACKLIST: &[&str] = &[
    "changeme",
    "change-me",
    "password",
    "passphrase",
    "secret",
    "default",
    "your-encryption-key",
    "your-encryption-key-here",
    "your-32-character-encryption-key",
    "default-encryption-key",
    "dev-encryption-key",
    "test-encryption-key",
    "encryption-key-change-me",
    "development-secret-key",
    "supersecretpassphrase",
    "0123456789abcdef0123456789abcdef",
];

/// A single policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthIssue {
    TooShort { length: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSymbol,
    KnownDefault,
}

impl fmt::Display for StrengthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrengthIssue::TooShort { length } => write!(
                f,
                "passphrase must be at least {MIN_LENGTH} characters (got {length})"
            ),
            StrengthIssue::MissingUppercase => {
                f.write_str("passphrase must contain an uppercase letter")
            }
            StrengthIssue::MissingLowercase => {
                f.write_str("passphrase must contain a lowercase letter")
            }
            StrengthIssue::MissingDigit => f.write_str("passphrase must contain a digit"),
            StrengthIssue::MissingSymbol => f.write_str("passphrase must contain a symbol"),
            StrengthIssue::KnownDefault => {
                f.write_str("passphrase is a known default or demo value")
            }
        }
    }
}

/// Result of [`validate_strength`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthReport {
    pub is_valid: bool,
    pub issues: Vec<StrengthIssue>,
}

impl StrengthReport {
    /// Human-readable message per issue, in check order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Run every check against `passphrase`.
pub fn validate_strength(passphrase: &str) -> StrengthReport {
    let mut issues = Vec::new();

    let length = passphrase.chars().count();
    if length < MIN_LENGTH {
        issues.push(StrengthIssue::TooShort { length });
    }
    if !passphrase.chars().any(char::is_uppercase) {
        issues.push(StrengthIssue::MissingUppercase);
    }
    if !passphrase.chars().any(char::is_lowercase) {
        issues.push(StrengthIssue::MissingLowercase);
    }
    if !passphrase.chars().any(char::is_numeric) {
        issues.push(StrengthIssue::MissingDigit);
    }
    if !passphrase
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        issues.push(StrengthIssue::MissingSymbol);
    }
    let normalised = passphrase.trim().to_lowercase();
    if BLACKLIST.iter().any(|known| *known == normalised) {
        issues.push(StrengthIssue::KnownDefault);
    }

    StrengthReport {
        is_valid: issues.is_empty(),
        issues,
    }
}
