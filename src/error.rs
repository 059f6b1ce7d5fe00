//! Command-level errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::{ApiError, ErrorCategory};

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Named filesystem does not exist on the account.
    #[error("filesystem '{0}' not found")]
    FilesystemNotFound(String),

    /// Named filesystem lives in a different region than the launch.
    #[error("filesystem '{name}' is in {filesystem_region}, but the instance is launching in {region}")]
    FilesystemRegionMismatch {
        name: String,
        filesystem_region: String,
        region: String,
    },

    /// Bad local input (files, flags).
    #[error("{0}")]
    Input(String),

    /// The launch call succeeded but returned no instance id.
    #[error("launch accepted but no instance id was returned")]
    NoInstanceReturned,

    /// Some terminations failed; every outcome was already printed.
    #[error("{failed} of {total} terminations failed; first failure: {first}")]
    TerminationIncomplete {
        failed: usize,
        total: usize,
        first: ApiError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::Api(e) => e.category(),
            Error::FilesystemNotFound(_) | Error::FilesystemRegionMismatch { .. } => {
                ErrorCategory::Validation
            }
            Error::Input(_) => ErrorCategory::Input,
            Error::NoInstanceReturned => ErrorCategory::Protocol,
            Error::TerminationIncomplete { first, .. } => first.category(),
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config(ConfigError::ProfileNotFound { .. }) => "PROFILE_NOT_FOUND",
            Error::Config(ConfigError::MissingRequiredField(_)) => "MISSING_REQUIRED_FIELD",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Api(ApiError::MissingCredential) => "MISSING_API_KEY",
            Error::Api(ApiError::Authentication { .. }) => "AUTH_FAILED",
            Error::Api(ApiError::Validation { .. }) => "VALIDATION_FAILED",
            Error::Api(ApiError::Transient { .. }) => "TRANSIENT",
            Error::Api(ApiError::Protocol { .. }) => "PROTOCOL_ERROR",
            Error::Api(ApiError::Api { .. }) => "API_ERROR",
            Error::Api(ApiError::Client(_)) => "HTTP_CLIENT",
            Error::FilesystemNotFound(_) => "FILESYSTEM_NOT_FOUND",
            Error::FilesystemRegionMismatch { .. } => "FILESYSTEM_REGION_MISMATCH",
            Error::Input(_) => "INVALID_INPUT",
            Error::NoInstanceReturned => "NO_INSTANCE_RETURNED",
            Error::TerminationIncomplete { .. } => "TERMINATION_INCOMPLETE",
        }
    }

    fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) | Error::TerminationIncomplete { first: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api().and_then(ApiError::status)
    }

    pub fn field_errors(&self) -> &[crate::provider::FieldError] {
        match self.api() {
            Some(ApiError::Validation { field_errors, .. }) => field_errors,
            _ => &[],
        }
    }
}
