use crate::api::ApiError;
use crate::config::ConfigError;
use crate::lookup::CacheError;
use crate::telemetry::TelemetryError;
use crate::workflows::auth::AuthError;
use crate::workflows::review::ReviewError;
use crate::workflows::settings::SettingsError;
use crate::workflows::signatures::SignatureError;
use crate::workflows::wizard::WizardError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Api(ApiError),
    Cache(CacheError),
    Auth(AuthError),
    Wizard(WizardError),
    Review(ReviewError),
    Signature(SignatureError),
    Settings(SettingsError),
}

impl AppError {
    /// Text suitable for showing to a portal user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(err) => err.user_message(),
            AppError::Review(ReviewError::Api(err)) => err.user_message(),
            AppError::Wizard(WizardError::Api(err)) => err.user_message(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Api(err) => write!(f, "backend error: {}", err),
            AppError::Cache(err) => write!(f, "cache error: {}", err),
            AppError::Auth(err) => write!(f, "authentication error: {}", err),
            AppError::Wizard(err) => write!(f, "wizard error: {}", err),
            AppError::Review(err) => write!(f, "review error: {}", err),
            AppError::Signature(err) => write!(f, "signature error: {}", err),
            AppError::Settings(err) => write!(f, "settings error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Api(err) => Some(err),
            AppError::Cache(err) => Some(err),
            AppError::Auth(err) => Some(err),
            AppError::Wizard(err) => Some(err),
            AppError::Review(err) => Some(err),
            AppError::Signature(err) => Some(err),
            AppError::Settings(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ApiError> for AppError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<CacheError> for AppError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<WizardError> for AppError {
    fn from(value: WizardError) -> Self {
        Self::Wizard(value)
    }
}

impl From<ReviewError> for AppError {
    fn from(value: ReviewError) -> Self {
        Self::Review(value)
    }
}

impl From<SignatureError> for AppError {
    fn from(value: SignatureError) -> Self {
        Self::Signature(value)
    }
}

impl From<SettingsError> for AppError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}
