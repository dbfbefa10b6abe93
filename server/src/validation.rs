//! Query validation and sanitization.
//!
//! Every inbound query passes through [`validate_query`] before anything else
//! touches it, and accepted queries are normalized by [`sanitize_query`]
//! before being dispatched to a backend.
//!
//! # Invariants
//!
//! - Validation is total: every input, including absent and non-string
//!   values, yields a [`ValidationOutcome`].
//! - Rules are applied in a fixed order and the first failure wins.
//! - `sanitize_query` is idempotent and never returns more than
//!   [`MAX_QUERY_LENGTH`] characters.

use std::sync::LazyLock;

use regex::{Regex, RegexSet};
use serde_json::Value;

/// Maximum number of characters accepted in a query.
pub const MAX_QUERY_LENGTH: usize = 1000;

/// Case-insensitive patterns that flag destructive SQL.
///
/// Whitespace classes include U+FEFF (zero-width no-break space).
const HARMFUL_PATTERNS: &[&str] = &[
    r"(?i)drop[\s\x{FEFF}]+table",
    r"(?i)delete[\s\x{FEFF}]+from",
    r"(?i)truncate",
    r"(?i)alter[\s\x{FEFF}]+table",
    r"(?i)create[\s\x{FEFF}]+table",
    r"(?i)insert[\s\x{FEFF}]+into",
    r"(?i)update[\s\x{FEFF}]+.*set",
];

#[allow(clippy::expect_used)] // The pattern set is a compile-time constant
static HARMFUL_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(HARMFUL_PATTERNS).expect("harmful patterns must compile"));

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x{FEFF}]+").expect("whitespace pattern must compile"));

/// Unicode whitespace plus U+FEFF, which `char::is_whitespace` leaves out.
fn is_query_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

/// Reason a query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No query was supplied, or it was `null`.
    Missing,
    /// The query was present but not a string.
    NotAString,
    /// The query was blank after trimming.
    Empty,
    /// The query exceeded [`MAX_QUERY_LENGTH`] characters.
    TooLong,
    /// The query matched a destructive SQL pattern.
    HarmfulContent,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "Query is required"),
            Self::NotAString => write!(f, "Query must be a string"),
            Self::Empty => write!(f, "Query cannot be empty"),
            Self::TooLong => write!(
                f,
                "Query is too long (maximum {MAX_QUERY_LENGTH} characters)"
            ),
            Self::HarmfulContent => write!(f, "Query contains potentially harmful content"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a raw query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub error: Option<ValidationError>,
}

impl ValidationOutcome {
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    #[must_use]
    pub const fn invalid(error: ValidationError) -> Self {
        Self {
            is_valid: false,
            error: Some(error),
        }
    }

    /// Convert into a `Result`, yielding the rejection reason on failure.
    pub const fn into_result(self) -> Result<(), ValidationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Validate a raw query value taken from a request body.
///
/// `None` means the field was absent altogether.
#[must_use]
pub fn validate_query(input: Option<&Value>) -> ValidationOutcome {
    let text = match input {
        None | Some(Value::Null) => return ValidationOutcome::invalid(ValidationError::Missing),
        Some(Value::String(text)) => text,
        Some(_) => return ValidationOutcome::invalid(ValidationError::NotAString),
    };
    validate_text(text)
}

/// Validate a query that is already known to be a string.
#[must_use]
pub fn validate_text(text: &str) -> ValidationOutcome {
    if text.trim_matches(is_query_whitespace).is_empty() {
        return ValidationOutcome::invalid(ValidationError::Empty);
    }

    if text.chars().count() > MAX_QUERY_LENGTH {
        return ValidationOutcome::invalid(ValidationError::TooLong);
    }

    if HARMFUL_SET.is_match(text) {
        return ValidationOutcome::invalid(ValidationError::HarmfulContent);
    }

    ValidationOutcome::valid()
}

/// Normalize an accepted query before dispatch.
///
/// Trims the ends, collapses whitespace runs into a single space and caps the
/// result at [`MAX_QUERY_LENGTH`] characters.
#[must_use]
pub fn sanitize_query(input: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(input.trim_matches(is_query_whitespace), " ");
    match collapsed.char_indices().nth(MAX_QUERY_LENGTH) {
        // Truncation can expose a space at the cut point.
        Some((cut, _)) => collapsed[..cut].trim_end_matches(is_query_whitespace).to_string(),
        None => collapsed.into_owned(),
    }
}
