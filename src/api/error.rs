//! Errors returned by the remote activity API

use std::fmt;

/// Errors that can occur when talking to the activity API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401 Unauthorized - token missing, invalid or expired
    Unauthorized { operation: String },
    /// 403 Forbidden - caller cannot act on this organization or activity
    Forbidden { operation: String },
    /// 404 Not Found - the activity does not exist (or is hidden from us)
    NotFound { operation: String },
    /// 429 Rate Limited
    RateLimited {
        operation: String,
        retry_after_secs: Option<u64>,
    },
    /// Connection, TLS or timeout failure
    NetworkError { operation: String, message: String },
    /// Any other non-2xx status
    HttpError {
        operation: String,
        status: u16,
        message: String,
    },
    /// Response carried an error envelope, even if the status was 2xx
    Rejected {
        operation: String,
        code: Option<String>,
        message: String,
    },
    /// Response body did not have the expected shape
    Decode { operation: String, message: String },
    /// Client is missing a required setting (e.g. base URL)
    NotConfigured { setting: String },
}

impl ApiError {
    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Check if this is a rate limiting error
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    /// Get retry-after seconds if rate limited
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// The API operation that failed, if the error came from a request
    pub fn operation(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { operation }
            | ApiError::Forbidden { operation }
            | ApiError::NotFound { operation }
            | ApiError::RateLimited { operation, .. }
            | ApiError::NetworkError { operation, .. }
            | ApiError::HttpError { operation, .. }
            | ApiError::Rejected { operation, .. }
            | ApiError::Decode { operation, .. } => Some(operation),
            ApiError::NotConfigured { .. } => None,
        }
    }

    pub fn unauthorized(operation: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            operation: operation.into(),
        }
    }

    pub fn forbidden(operation: impl Into<String>) -> Self {
        ApiError::Forbidden {
            operation: operation.into(),
        }
    }

    pub fn not_found(operation: impl Into<String>) -> Self {
        ApiError::NotFound {
            operation: operation.into(),
        }
    }

    pub fn rate_limited(operation: impl Into<String>, retry_after: Option<u64>) -> Self {
        ApiError::RateLimited {
            operation: operation.into(),
            retry_after_secs: retry_after,
        }
    }

    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn http(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    pub fn rejected(
        operation: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        ApiError::Rejected {
            operation: operation.into(),
            code,
            message: message.into(),
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Decode {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(setting: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            setting: setting.into(),
        }
    }

    /// Map a non-success HTTP status to the matching variant
    pub fn from_status(
        operation: impl Into<String>,
        status: u16,
        retry_after: Option<u64>,
        body: impl Into<String>,
    ) -> Self {
        match status {
            401 => ApiError::unauthorized(operation),
            403 => ApiError::forbidden(operation),
            404 => ApiError::not_found(operation),
            429 => ApiError::rate_limited(operation, retry_after),
            _ => ApiError::http(operation, status, body),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { operation } => {
                write!(f, "{operation}: Unauthorized (401) - check the API token")
            }
            ApiError::Forbidden { operation } => {
                write!(f, "{operation}: Forbidden (403) - insufficient permissions")
            }
            ApiError::NotFound { operation } => write!(f, "{operation}: Not found (404)"),
            ApiError::RateLimited {
                operation,
                retry_after_secs,
            } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "{operation}: Rate limited - retry after {secs}s")
                } else {
                    write!(f, "{operation}: Rate limited")
                }
            }
            ApiError::NetworkError { operation, message } => {
                write!(f, "{operation}: Network error - {message}")
            }
            ApiError::HttpError {
                operation,
                status,
                message,
            } => write!(f, "{operation}: HTTP {status} - {message}"),
            ApiError::Rejected {
                operation,
                code: Some(code),
                message,
            } => write!(f, "{operation}: Rejected ({code}) - {message}"),
            ApiError::Rejected {
                operation,
                code: None,
                message,
            } => write!(f, "{operation}: Rejected - {message}"),
            ApiError::Decode { operation, message } => {
                write!(f, "{operation}: Unexpected response - {message}")
            }
            ApiError::NotConfigured { setting } => {
                write!(f, "API client not configured ({setting} is empty)")
            }
        }
    }
}

impl std::error::Error for ApiError {}
