use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use hpp_engine::{AdminApiError, CheckoutError, OrderStoreError, WebhookError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with a concurrent change. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is not valid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The callback signature is invalid.")]
    InvalidSignature,
    #[error("Requests from this address are not accepted.")]
    ForbiddenPeer,
}

impl From<OrderStoreError> for ServerError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            OrderStoreError::VersionConflict { .. } | OrderStoreError::OrderAlreadyExists(_) => {
                Self::Conflict(e.to_string())
            },
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::ValidationError(_) => Self::ValidationError(e.to_string()),
            CheckoutError::ConfigurationError { .. } | CheckoutError::InvalidGatewayUrl { .. } => {
                Self::ConfigurationError(e.to_string())
            },
            CheckoutError::SignatureError(_) => Self::BackendError(e.to_string()),
            CheckoutError::StoreError(e) => e.into(),
        }
    }
}

impl From<WebhookError> for ServerError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::MissingField(_) | WebhookError::InvalidReference(_) => Self::ValidationError(e.to_string()),
            WebhookError::InvalidSignature => Self::AuthenticationError(AuthError::InvalidSignature),
            WebhookError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            WebhookError::ConfigurationError => Self::ConfigurationError(e.to_string()),
            WebhookError::ConcurrencyConflict(_) => Self::Conflict(e.to_string()),
            WebhookError::StoreError(e) => e.into(),
        }
    }
}

impl From<AdminApiError> for ServerError {
    fn from(e: AdminApiError) -> Self {
        match e {
            AdminApiError::InvalidEnumValue(_) | AdminApiError::ValidationError(_) => {
                Self::ValidationError(e.to_string())
            },
            AdminApiError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            AdminApiError::ConcurrencyConflict(_) => Self::Conflict(e.to_string()),
            AdminApiError::StoreError(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use hpp_engine::db_types::OrderId;

    use super::*;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let id = OrderId::new("o1");
        let cases: Vec<(ServerError, StatusCode)> = vec![
            (WebhookError::MissingField("ivp_cart").into(), StatusCode::BAD_REQUEST),
            (WebhookError::InvalidSignature.into(), StatusCode::UNAUTHORIZED),
            (WebhookError::OrderNotFound(id.clone()).into(), StatusCode::NOT_FOUND),
            (WebhookError::ConcurrencyConflict(id.clone()).into(), StatusCode::CONFLICT),
            (WebhookError::ConfigurationError.into(), StatusCode::INTERNAL_SERVER_ERROR),
            (CheckoutError::ValidationError("empty".into()).into(), StatusCode::BAD_REQUEST),
            (
                CheckoutError::ConfigurationError { order_id: id.clone(), missing: vec!["HPP_GATEWAY_API_KEY"] }.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AdminApiError::OrderNotFound(id.clone()).into(), StatusCode::NOT_FOUND),
            (AdminApiError::StoreError(OrderStoreError::DatabaseError("down".into())).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (OrderStoreError::OrderAlreadyExists(id.clone()).into(), StatusCode::CONFLICT),
            (CheckoutError::StoreError(OrderStoreError::OrderAlreadyExists(id.clone())).into(), StatusCode::CONFLICT),
            (OrderStoreError::OrderNotFound(id).into(), StatusCode::NOT_FOUND),
            (AuthError::MissingToken.into(), StatusCode::UNAUTHORIZED),
            (AuthError::InsufficientPermissions("admin".into()).into(), StatusCode::UNAUTHORIZED),
            (AuthError::ForbiddenPeer.into(), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }
}
