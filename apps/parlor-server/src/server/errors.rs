use axum::{http::StatusCode, response::IntoResponse, Json};

use super::types::ApiError;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ApiFailure {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ReservedRole,
    RoleAlreadyExists,
    RoomNameTaken,
    SubroomAlreadyExists,
    FileAlreadyAssociated,
    RoomCreationLimitReached,
    PayloadTooLarge,
    Internal,
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ApiFailure {
    pub(crate) const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "invalid_token",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::ReservedRole => "reserved_role",
            Self::RoleAlreadyExists => "role_already_exists",
            Self::RoomNameTaken => "room_name_taken",
            Self::SubroomAlreadyExists => "subroom_already_exists",
            Self::FileAlreadyAssociated => "file_already_associated",
            Self::RoomCreationLimitReached => "room_creation_limit_reached",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Internal => "internal_error",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::ReservedRole => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::RoomCreationLimitReached => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RoleAlreadyExists | Self::RoomNameTaken | Self::SubroomAlreadyExists
            | Self::FileAlreadyAssociated => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> axum::response::Response {
        (
            self.status(),
            Json(ApiError {
                error: self.error_code(),
            }),
        )
            .into_response()
    }
}

impl From<parlor_core::DomainError> for ApiFailure {
    fn from(error: parlor_core::DomainError) -> Self {
        match error {
            parlor_core::DomainError::ReservedRoleName => Self::ReservedRole,
            _ => Self::InvalidRequest,
        }
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .with_span_list(true)
        .init();
}
