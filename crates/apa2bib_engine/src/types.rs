use std::fmt;

use thiserror::Error;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CacheHit,
    Requesting { attempt: u32 },
    BackingOff { attempt: u32, delay_ms: u64 },
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionProgress {
    pub request_id: RequestId,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(ConversionProgress),
    ConversionCompleted {
        request_id: RequestId,
        outcome: ConversionOutcome,
    },
}

/// Result of one orchestrated conversion. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted { bibtex: String, from_cache: bool },
    /// Input was empty after trimming; nothing was sent.
    NothingToConvert,
    Failed(ConversionError),
    /// A newer call replaced this one before it resolved.
    Superseded,
}

impl ConversionOutcome {
    pub fn bibtex(&self) -> Option<&str> {
        match self {
            ConversionOutcome::Converted { bibtex, .. } => Some(bibtex),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, ConversionOutcome::Superseded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ConversionError {
    pub kind: FailureKind,
    pub message: String,
}

impl ConversionError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Message suitable for showing to the person who pasted the reference.
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::NotConfigured => {
                "No API key configured. Add one to the settings file or set APA2BIB_API_KEY."
                    .to_string()
            }
            FailureKind::AuthError => {
                "The API key was rejected. Check that it is valid and enabled.".to_string()
            }
            FailureKind::RateLimited => {
                "Too many requests. Wait a moment and try again.".to_string()
            }
            FailureKind::QuotaExceeded => {
                "The API quota for this key is exhausted. Try again later or use another key."
                    .to_string()
            }
            FailureKind::Network => {
                format!("Could not reach the conversion service ({}).", self.message)
            }
            FailureKind::Timeout => "The conversion service did not answer in time.".to_string(),
            FailureKind::EmptyResponse => {
                "The model returned no BibTeX. Check that the input is a complete APA reference."
                    .to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotConfigured,
    AuthError,
    RateLimited,
    QuotaExceeded,
    Network,
    Timeout,
    EmptyResponse,
}

impl FailureKind {
    /// Whether another attempt could plausibly change the outcome.
    pub fn is_retryable(self) -> bool {
        match self {
            FailureKind::RateLimited
            | FailureKind::Network
            | FailureKind::Timeout
            | FailureKind::EmptyResponse => true,
            FailureKind::NotConfigured | FailureKind::AuthError | FailureKind::QuotaExceeded => {
                false
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NotConfigured => write!(f, "not configured"),
            FailureKind::AuthError => write!(f, "authentication failed"),
            FailureKind::RateLimited => write!(f, "rate limited"),
            FailureKind::QuotaExceeded => write!(f, "quota exceeded"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::EmptyResponse => write!(f, "empty response"),
        }
    }
}
