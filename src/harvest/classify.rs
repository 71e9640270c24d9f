//! Classification of search failures.
//!
//! Categories are checked in a fixed order: authorization, then content
//! gone, then transient conditions. A `503 backendError` for a removed video
//! must land in [`FailureClass::ContentGone`] before the generic 503 rule can
//! turn it into an endless retry.
//!
//! Structured signals (HTTP status, API `reason` code, connection-reset
//! variant) decide whenever they are present. Text matching on the API's
//! error message is kept as a compatibility shim for HTTP failures that carry
//! no structured reason (`Not Found`, `Backend Error`). Transport failures
//! are classified by variant only: a reset is detected from the socket error
//! kind, everything else aborts.

use crate::harvest::traits::ApiFailure;

/// Disjoint categories of search failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Key invalid or out of quota
    AuthRejected,
    /// Service momentarily down
    TransientUnavailable,
    /// Peer closed the TCP connection mid-request
    ConnectionReset,
    /// The seed's content was removed or cannot be processed
    ContentGone,
    /// Anything else
    Unclassified,
}

/// What the loop does about a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Advance the credential pool, reconnect, retry immediately.
    RotateCredential,
    /// Count against the retry budget, sleep, retry the same seed.
    Backoff { reconnect: bool },
    /// The seed yields zero records.
    Skip,
    /// End the run.
    Abort,
}

impl FailureClass {
    pub fn action(self) -> Action {
        match self {
            FailureClass::AuthRejected => Action::RotateCredential,
            FailureClass::TransientUnavailable => Action::Backoff { reconnect: false },
            FailureClass::ConnectionReset => Action::Backoff { reconnect: true },
            FailureClass::ContentGone => Action::Skip,
            FailureClass::Unclassified => Action::Abort,
        }
    }
}

const AUTH_REASONS: &[&str] = &[
    "keyInvalid",
    "keyExpired",
    "quotaExceeded",
    "dailyLimitExceeded",
    "accessNotConfigured",
    "forbidden",
];

const GONE_REASONS: &[&str] = &["notFound", "videoNotFound", "backendError"];

/// Places a raw failure into exactly one [`FailureClass`].
pub fn classify(failure: &ApiFailure) -> FailureClass {
    match failure {
        ApiFailure::Http {
            status,
            reason,
            message,
        } => classify_http(*status, reason.as_deref(), message),
        ApiFailure::ConnectionReset(_) => FailureClass::ConnectionReset,
        ApiFailure::Transport(_) => FailureClass::Unclassified,
        ApiFailure::Decode(_) => FailureClass::Unclassified,
    }
}

fn classify_http(status: u16, reason: Option<&str>, message: &str) -> FailureClass {
    if status == 401 || status == 403 || reason.is_some_and(|r| AUTH_REASONS.contains(&r)) {
        return FailureClass::AuthRejected;
    }

    if status == 404 || reason.is_some_and(|r| GONE_REASONS.contains(&r)) {
        return FailureClass::ContentGone;
    }

    if reason.is_none() && mentions_missing_content(message) {
        return FailureClass::ContentGone;
    }

    if status == 503 {
        return FailureClass::TransientUnavailable;
    }

    FailureClass::Unclassified
}

/// Compatibility shim: classify an API error message that came without a
/// reason code.
fn mentions_missing_content(text: &str) -> bool {
    text.contains("Not Found") || text.contains("Backend Error")
}
