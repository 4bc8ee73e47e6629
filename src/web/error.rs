use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    cache::CacheError,
    error::log_error,
    market::MarketError,
    model::{DatabaseError, ResourceType},
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,

    #[error("RegistrationInvalid: {reason}")]
    RegistrationInvalid { reason: String },
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationTokenInvalid, source: {source_name}. Error: {error}")]
    AuthenticationTokenInvalid {
        source_name: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationAdminRequired")]
    AuthenticationAdminRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,

    #[error("AuthenticationRefreshInvalid")]
    AuthenticationRefreshInvalid,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}. Reason: {reason}")]
    ResourceBadRequest {
        resource_type: ResourceType,
        reason: String,
    },

    #[error("ResourceConflict: {resource_type:?}")]
    ResourceConflict { resource_type: ResourceType },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ValidationInvalidField: {field}. Reason: {reason}")]
    ValidationInvalidField { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("UpstreamMarketError: {0}")]
    UpstreamMarketError(#[from] MarketError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] CryptError),

    #[error("ServerCacheError: {0}")]
    ServerCacheError(#[from] CacheError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
            Self::RegistrationInvalid { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user already exists.")
            }
            Self::RegistrationInvalid { reason } => format!("Registration error, {reason}."),
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationAdminRequired => StatusCode::FORBIDDEN,
            Self::AuthenticationRequired
            | Self::AuthenticationInvalidCredentials
            | Self::AuthenticationRefreshInvalid
            | Self::AuthenticationTokenInvalid { .. } => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationTokenInvalid { .. } => {
                String::from("Authentication error, token invalid or expired.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationAdminRequired => String::from("Administrator role required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
            Self::AuthenticationRefreshInvalid => {
                String::from("Authentication error, refresh token invalid or expired.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { .. } => String::from("Resource error, resource forbidden."),
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
            Self::ResourceBadRequest { reason, .. } => {
                format!("Resource error, bad request: {reason}.")
            }
            Self::ResourceConflict { .. } => {
                String::from("Resource error, resource already exists.")
            }
        }
    }
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ValidationInvalidField { field, reason } => {
                format!("Validation error, {field}: {reason}.")
            }
        }
    }
}

impl UpstreamError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UpstreamMarketError(MarketError::SymbolNotFound(_)) => StatusCode::NOT_FOUND,
            Self::UpstreamMarketError(
                MarketError::InvalidSymbol(_) | MarketError::InvalidParameter(_),
            ) => StatusCode::BAD_REQUEST,
            Self::UpstreamMarketError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::UpstreamMarketError(MarketError::SymbolNotFound(symbol)) => {
                format!("Market data error, symbol {symbol} not found.")
            }
            Self::UpstreamMarketError(e) if e.is_client_error() => {
                format!("Market data error, {e}.")
            }
            Self::UpstreamMarketError(_) => {
                String::from("Market data error, upstream provider unavailable.")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("ValidationError - {0}")]
    ValidationError(#[from] ValidationError),
    #[error("UpstreamError - {0}")]
    UpstreamError(#[from] UpstreamError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    /// Ownership and ledger rejections surface as 403 and 400, everything else as 500.
    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        match error {
            DatabaseError::Forbidden => Self::resource_forbidden(r#type),
            DatabaseError::LedgerError(e) => Self::resource_bad_request(r#type, e.to_string()),
            error => Self::ResourceError(ResourceError::ResourceFetchError {
                resource_type: r#type,
                error,
            }),
        }
    }

    pub fn resource_bad_request<S: Into<String>>(r#type: ResourceType, reason: S) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
            reason: reason.into(),
        })
    }

    pub fn resource_conflict(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
        })
    }

    pub fn auth_token_invalid<S: Into<String>>(
        source_name: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationTokenInvalid {
            source_name: source_name.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn admin_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationAdminRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn auth_refresh_invalid() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRefreshInvalid)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn registration_invalid<S: Into<String>>(reason: S) -> Self {
        Self::RegistrationError(RegistrationError::RegistrationInvalid {
            reason: reason.into(),
        })
    }

    pub fn invalid_field<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::ValidationError(ValidationError::ValidationInvalidField {
            field: field.into(),
            reason: reason.into(),
        })
    }

    pub fn market_error(e: MarketError) -> Self {
        Self::UpstreamError(UpstreamError::UpstreamMarketError(e))
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn server_cache_error(e: CacheError) -> Self {
        Self::ServerError(ServerError::ServerCacheError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::ValidationError(e) => e.status_code(),
            Self::UpstreamError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::ValidationError(e) => e.client_display(),
            Self::UpstreamError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();

        let body = ErrorResponse {
            message: display,
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::ledger::LedgerError;

    #[test]
    fn ledger_rejections_are_bad_requests() {
        let err = WebError::resource_fetch_error(
            ResourceType::Portfolio,
            DatabaseError::LedgerError(LedgerError::InsufficientFunds {
                required: dec!(10),
                available: dec!(5),
            }),
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.client_display().contains("insufficient funds"));
    }

    #[test]
    fn ownership_failures_are_forbidden() {
        let err = WebError::resource_fetch_error(ResourceType::Portfolio, DatabaseError::Forbidden);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn market_errors_map_by_cause() {
        let status = |e| WebError::market_error(e).status_code();
        assert_eq!(
            status(MarketError::SymbolNotFound(String::from("ZZZ"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(MarketError::InvalidSymbol(String::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(MarketError::RateLimited(String::from("slow down"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(MarketError::Malformed(String::from("bad json"))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn invalid_tokens_are_unauthorized() {
        let jwt_err = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidToken,
        );
        let err = WebError::auth_token_invalid("SID", jwt_err);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(WebError::admin_required().status_code(), StatusCode::FORBIDDEN);
    }
}
