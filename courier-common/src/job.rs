use serde::{Deserialize, Serialize};

/// A single email-send request together with its retry metadata.
///
/// The retry count only ever grows, and only through [`Job::record_failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "retryCount", default)]
    retry_count: u32,
}

impl Job {
    /// Create a fresh job that has never been attempted
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            retry_count: 0,
        }
    }

    /// Number of failed delivery attempts observed so far
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Record an observed delivery failure, returning the new retry count
    pub const fn record_failure(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }
}
