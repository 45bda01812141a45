//! Request decoding and validation

use courier_common::Job;
use serde::Deserialize;
use thiserror::Error;

/// Why a decoded request cannot become a job
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("Invalid email format")]
    InvalidAddress,
}

/// Body of `POST /send-email`.
///
/// Absent and `null` fields decode as missing so they are reported by
/// validation rather than as malformed JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl EmailRequest {
    /// Check every field and build a fresh job.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] if any field is absent or
    /// empty, then [`ValidationError::InvalidAddress`] if `to` is not of the
    /// form `local@domain.tld`.
    pub fn into_job(self) -> Result<Job, ValidationError> {
        let (Some(to), Some(subject), Some(body)) = (
            non_empty(self.to),
            non_empty(self.subject),
            non_empty(self.body),
        ) else {
            return Err(ValidationError::MissingFields);
        };

        if !is_valid_address(&to) {
            return Err(ValidationError::InvalidAddress);
        }

        Ok(Job::new(to, subject, body))
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Basic `local@domain.tld` shape check.
///
/// No ASCII whitespace (space, tab, newline, carriage return or form feed),
/// exactly one `@`, a non-empty local part and a domain with a
/// `.` that has text on both sides.
pub fn is_valid_address(address: &str) -> bool {
    if address
        .chars()
        .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c'))
    {
        return false;
    }

    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(idx, c)| c == '.' && idx > 0 && idx + 1 < domain.len())
}
