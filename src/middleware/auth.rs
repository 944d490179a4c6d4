use actix_web::{dev::ServiceRequest, error::ErrorUnauthorized, web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::utils;

/// JWT signing secret, resolved once at startup and shared through
/// application data.
#[derive(Clone)]
pub struct AuthSecret(pub String);

pub async fn jwt_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let secret = match req.app_data::<web::Data<AuthSecret>>() {
        Some(secret) => secret.0.clone(),
        None => return Err((ErrorUnauthorized("Auth not configured"), req)),
    };

    match utils::jwt::decode_jwt(credentials.token(), secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Err(_) => Err((ErrorUnauthorized("Invalid or expired token"), req)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test::TestRequest, FromRequest};
    use uuid::Uuid;

    use crate::utils::jwt::{create_jwt, Claims};

    async fn bearer(token: &str) -> BearerAuth {
        let (req, mut payload) = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_parts();
        BearerAuth::from_request(&req, &mut payload).await.unwrap()
    }

    #[actix_web::test]
    async fn accepts_token_signed_with_configured_secret() {
        let user_id = Uuid::new_v4();
        let token = create_jwt(user_id, "ada", "topsecret").unwrap();

        let req = TestRequest::default()
            .app_data(web::Data::new(AuthSecret("topsecret".to_string())))
            .to_srv_request();

        let req = jwt_validator(req, bearer(&token).await).await.unwrap();
        let claims = req.extensions().get::<Claims>().cloned().unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "ada");
    }

    #[actix_web::test]
    async fn rejects_token_signed_with_other_secret() {
        let token = create_jwt(Uuid::new_v4(), "ada", "othersecret").unwrap();

        let req = TestRequest::default()
            .app_data(web::Data::new(AuthSecret("topsecret".to_string())))
            .to_srv_request();

        assert!(jwt_validator(req, bearer(&token).await).await.is_err());
    }
}
