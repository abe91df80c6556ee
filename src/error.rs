//! Typed errors and HTTP mapping.

use crate::kind::EntityKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: {kind} field {field}")]
    InvalidPrimaryKey { kind: String, field: String },
    #[error("duplicate entity kind: {0}")]
    DuplicateKind(String),
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unsupported field name '{field}' for {kind}")]
    UnsupportedField { kind: EntityKind, field: String },
    #[error("invalid identifier for {kind}: {reason}")]
    InvalidIdentifier { kind: EntityKind, reason: String },
    #[error("{kind} not found: {identifier}")]
    NotFound { kind: EntityKind, identifier: String },
    #[error("{kind} lookup matched {count} rows: {identifier}")]
    AmbiguousResult {
        kind: EntityKind,
        identifier: String,
        count: usize,
    },
    #[error("cannot map {kind}: {reason}")]
    Mapping { kind: EntityKind, reason: String },
    #[error("storage: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl CatalogError {
    pub fn storage(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CatalogError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn mapping(kind: EntityKind, reason: impl Into<String>) -> Self {
        CatalogError::Mapping {
            kind,
            reason: reason.into(),
        }
    }

    pub fn invalid_identifier(kind: EntityKind, reason: impl Into<String>) -> Self {
        CatalogError::InvalidIdentifier {
            kind,
            reason: reason.into(),
        }
    }

    pub fn unsupported_field(kind: EntityKind, field: impl Into<String>) -> Self {
        CatalogError::UnsupportedField {
            kind,
            field: field.into(),
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::storage("database", e)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CatalogError::Config(ConfigError::UnknownKind(_)) => (StatusCode::NOT_FOUND, "unknown_kind"),
            CatalogError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            CatalogError::UnsupportedField { .. } => (StatusCode::BAD_REQUEST, "unsupported_field"),
            CatalogError::InvalidIdentifier { .. } => (StatusCode::BAD_REQUEST, "invalid_identifier"),
            CatalogError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            CatalogError::AmbiguousResult { .. } => (StatusCode::CONFLICT, "ambiguous_result"),
            CatalogError::Mapping { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "mapping_error"),
            CatalogError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
