pub mod auth;
pub mod event;
pub mod rsvp;

use actix_web::{HttpMessage, HttpRequest};
use uuid::Uuid;

use crate::core::CoreError;
use crate::utils::jwt::Claims;

pub(crate) fn viewer_id(req: &HttpRequest) -> Result<Uuid, actix_web::Error> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("No claims found"))?;

    Uuid::parse_str(&claims.sub)
        .map_err(|_| actix_web::error::ErrorInternalServerError("Invalid user id"))
}

pub(crate) fn map_core_error(err: CoreError) -> actix_web::Error {
    match err {
        CoreError::Validation { field, message } => actix_web::error::ErrorBadRequest(
            serde_json::json!({ "field": field, "message": message }),
        ),
        CoreError::NotFound => actix_web::error::ErrorNotFound("Invalid or expired invite"),
        CoreError::Database(e) => {
            log::error!("database error: {e}");
            actix_web::error::ErrorInternalServerError("Database error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn validation_errors_carry_field_level_feedback() {
        let err = map_core_error(CoreError::validation("dates", "invalid range"));
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            err.to_string(),
            r#"{"field":"dates","message":"invalid range"}"#
        );
    }

    #[test]
    fn missing_invites_map_to_not_found() {
        let err = map_core_error(CoreError::NotFound);
        assert_eq!(err.as_response_error().status_code(), StatusCode::NOT_FOUND);
    }
}
