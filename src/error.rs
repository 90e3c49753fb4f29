//! Error types and handling for the `clima` dashboard

use thiserror::Error;

/// Main error type for the `clima` library
#[derive(Error, Debug)]
pub enum ClimaError {
    /// The user (or configuration) refused access to the position
    #[error("Location permission denied: {message}")]
    PermissionDenied { message: String },

    /// The position provider could not produce a fix
    #[error("Position unavailable: {message}")]
    PositionUnavailable { message: String },

    /// The position provider did not answer in time
    #[error("Timed out waiting for a position after {seconds}s")]
    GeolocationTimeout { seconds: u64 },

    /// No API key configured (or still the placeholder)
    #[error("Weather API key is not configured")]
    MissingApiKey,

    /// API answered 401
    #[error("Weather API rejected the key")]
    InvalidApiKey,

    /// API answered 404
    #[error("Location not found")]
    NotFound,

    /// API answered 429
    #[error("Too many requests to the weather API")]
    RateLimited,

    /// API answered with a 5xx status
    #[error("Weather API server error (HTTP {status})")]
    Server { status: u16 },

    /// Any other non-success answer
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport timeout
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// Transport failure (DNS, connection refused, reset...)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The API answered but the payload lacks required fields
    #[error("Incomplete data: {message}")]
    IncompleteData { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Persistent storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ClimaError {
    /// Create a new permission error
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a new position-unavailable error
    pub fn position_unavailable<S: Into<String>>(message: S) -> Self {
        Self::PositionUnavailable {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new incomplete-data error
    pub fn incomplete<S: Into<String>>(message: S) -> Self {
        Self::IncompleteData {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status to the matching variant.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Self::InvalidApiKey,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Server { status },
            _ => Self::Api {
                status,
                message: message.unwrap_or_else(|| "Unknown error".to_string()),
            },
        }
    }

    /// Whether another attempt of the same request can succeed.
    ///
    /// Used both by the retry loop and by the dashboard to decide if a
    /// retry affordance is offered.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ClimaError::PermissionDenied { .. }
                | ClimaError::MissingApiKey
                | ClimaError::InvalidApiKey
                | ClimaError::NotFound
                | ClimaError::Config { .. }
                | ClimaError::Validation { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ClimaError::PermissionDenied { .. } => {
                "Could not get your location. Allow location access and try again.".to_string()
            }
            ClimaError::PositionUnavailable { .. } => {
                "Could not get your location. Your position is not available right now."
                    .to_string()
            }
            ClimaError::GeolocationTimeout { .. } => {
                "Could not get your location. The request timed out, try again.".to_string()
            }
            ClimaError::MissingApiKey => {
                "API key not configured. Set api.api_key in your config file or CLIMA_API__API_KEY. \
                 You can get one for free at https://openweathermap.org/api"
                    .to_string()
            }
            ClimaError::InvalidApiKey => {
                "Invalid or expired API key. Check your OpenWeatherMap key.".to_string()
            }
            ClimaError::NotFound => "Location not found. Try another location.".to_string(),
            ClimaError::RateLimited => {
                "Too many requests. Wait a moment and try again.".to_string()
            }
            ClimaError::Server { status } => {
                format!("OpenWeatherMap server error ({status}). Try again later.")
            }
            ClimaError::Api { status, message } => format!("API error: {status} - {message}"),
            ClimaError::Timeout { .. } => {
                "Connection too slow. Check your internet and try again.".to_string()
            }
            ClimaError::Network { .. } => {
                "No internet connection. Check your connectivity.".to_string()
            }
            ClimaError::IncompleteData { .. } => {
                "Incomplete weather data. Try again.".to_string()
            }
            ClimaError::Config { message } => format!("Configuration error: {message}"),
            ClimaError::Validation { message } => format!("Invalid input: {message}"),
            ClimaError::Storage { .. } => {
                "Local storage failed. You may need to clear your cache.".to_string()
            }
            ClimaError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ClimaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClimaError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ClimaError::incomplete(err.to_string())
        } else {
            ClimaError::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClimaError {
    fn from(err: serde_json::Error) -> Self {
        ClimaError::incomplete(err.to_string())
    }
}
