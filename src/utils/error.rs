use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("AWS credentials error: {message}")]
    CredentialsError { message: String },

    #[error("Request signing failed: {message}")]
    SigningError { message: String },

    #[error("{service} returned {status} {code}: {message}")]
    ServiceError {
        service: String,
        status: u16,
        code: String,
        message: String,
    },

    #[error("Athena query {query_id} ended in state {state}: {reason}")]
    QueryError {
        query_id: String,
        state: String,
        reason: String,
    },

    #[error("Unsupported resource: {message}")]
    UnsupportedError { message: String },

    #[error("{message}")]
    CriticalError { message: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Service,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code of a failed run; never zero.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ExportError {
    pub fn critical(message: impl Into<String>) -> Self {
        ExportError::CriticalError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ExportError::ConfigError {
            message: message.into(),
        }
    }

    /// Error code reported by the service, if this is a service error.
    pub fn service_code(&self) -> Option<&str> {
        match self {
            ExportError::ServiceError { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ExportError::ServiceError { status, code, .. } => {
                *status == 404
                    || code == "ResourceNotFoundException"
                    || code == "EntityNotFoundException"
            }
            _ => false,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        match self {
            ExportError::ServiceError { status, code, .. } => {
                *status == 401 || *status == 403 || code == "AccessDeniedException"
            }
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::ConfigError { .. }
            | ExportError::MissingConfigError { .. }
            | ExportError::InvalidConfigValueError { .. }
            | ExportError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            ExportError::CredentialsError { .. } | ExportError::SigningError { .. } => {
                ErrorCategory::Authentication
            }
            ExportError::ServiceError { .. } if self.is_access_denied() => {
                ErrorCategory::Authentication
            }
            ExportError::HttpError(_)
            | ExportError::ServiceError { .. }
            | ExportError::QueryError { .. } => ErrorCategory::Service,
            ExportError::JsonError(_)
            | ExportError::YamlError(_)
            | ExportError::UnsupportedError { .. }
            | ExportError::CriticalError { .. } => ErrorCategory::Data,
            ExportError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::HttpError(_) | ExportError::QueryError { .. } => ErrorSeverity::Medium,
            ExportError::ServiceError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            ExportError::CriticalError { .. } | ExportError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ExportError::ConfigError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. } => {
                "Check the command line options and the --config file".to_string()
            }
            ExportError::MissingConfigError { field } => {
                format!("Provide a value for {} on the command line or in the config file", field)
            }
            ExportError::CredentialsError { .. } | ExportError::SigningError { .. } => {
                "Check AWS credentials (AWS_PROFILE, --profile) and region (--region)".to_string()
            }
            ExportError::ServiceError { .. } if self.is_access_denied() => {
                "Make sure the caller has QuickSight and Athena read permissions".to_string()
            }
            ExportError::ServiceError { .. } if self.is_not_found() => {
                "Check the resource id and that it lives in the selected account and region"
                    .to_string()
            }
            ExportError::HttpError(_) | ExportError::ServiceError { .. } => {
                "Retry later; the service may be throttling or temporarily unavailable".to_string()
            }
            ExportError::QueryError { .. } => {
                "Check the Athena workgroup, its output location and the database name".to_string()
            }
            ExportError::UnsupportedError { .. } => {
                "Rework the dataset in QuickSight so it only uses Athena sources".to_string()
            }
            ExportError::CriticalError { .. } => {
                "Fix the analysis or its datasets and run the export again".to_string()
            }
            ExportError::JsonError(_) | ExportError::YamlError(_) => {
                "The service returned an unexpected document; run with --verbose".to_string()
            }
            ExportError::IoError(_) => "Check the output path and its permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Authentication => format!("Access problem: {}", self),
            ErrorCategory::Service => format!("AWS call failed: {}", self),
            ErrorCategory::Data => format!("Export failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}
