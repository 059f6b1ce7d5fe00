//! Provider API errors.

use std::collections::BTreeMap;

use thiserror::Error;

/// A provider-reported problem with one request field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: Option<String>,
    pub message: String,
}

/// Errors returned by provider calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No API key configured; no request was sent.
    #[error("no API key configured; set LAMBDA_API_KEY or pass --api-key")]
    MissingCredential,

    /// 401/403.
    #[error("authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// Provider rejected the request parameters.
    #[error("request rejected ({status}): {message}{}", render_fields(.field_errors))]
    Validation {
        status: u16,
        message: String,
        field_errors: Vec<FieldError>,
    },

    /// 5xx or network failure. Safe for the caller to retry.
    #[error("transient failure{}: {message}", render_status(.status))]
    Transient { status: Option<u16>, message: String },

    /// Unexpected response body.
    #[error("unexpected response ({status}): {message}")]
    Protocol { status: u16, message: String },

    /// Any other non-2xx.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

fn render_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

fn render_fields(fields: &[FieldError]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect();
    format!(" [{}]", parts.join("; "))
}

/// Coarse error class, used for exit codes and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Input,
    Auth,
    Validation,
    Transient,
    Protocol,
    Provider,
    System,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Input => "in",
            Self::Auth => "auth",
            Self::Validation => "val",
            Self::Transient => "net",
            Self::Protocol => "proto",
            Self::Provider => "ext",
            Self::System => "sys",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config | Self::Input => 1,
            Self::Auth => 3,
            Self::Transient => 4,
            Self::Validation => 5,
            Self::Protocol => 6,
            Self::Provider | Self::System => 2,
        }
    }
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredential | Self::Authentication { .. } => ErrorCategory::Auth,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Transient { .. } => ErrorCategory::Transient,
            Self::Protocol { .. } => ErrorCategory::Protocol,
            Self::Api { .. } => ErrorCategory::Provider,
            Self::Client(_) => ErrorCategory::System,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::Validation { status, .. }
            | Self::Protocol { status, .. }
            | Self::Api { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            Self::MissingCredential | Self::Client(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Classify a non-2xx response.
    ///
    /// `code` is the provider's `error.code`, if the body carried one.
    pub fn from_status(
        status: u16,
        code: Option<&str>,
        message: String,
        field_errors: BTreeMap<String, (Option<String>, String)>,
    ) -> Self {
        let field_errors: Vec<FieldError> = field_errors
            .into_iter()
            .map(|(field, (code, message))| FieldError {
                field,
                code,
                message,
            })
            .collect();

        match status {
            401 | 403 => Self::Authentication { status, message },
            500..=599 => Self::Transient {
                status: Some(status),
                message,
            },
            _ if status == 422 || !field_errors.is_empty() || (status == 400 && code.is_some()) => {
                Self::Validation {
                    status,
                    message,
                    field_errors,
                }
            }
            _ => Self::Api { status, message },
        }
    }
}
