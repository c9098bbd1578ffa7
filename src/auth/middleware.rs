use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({
        "error": "unauthorized",
        "message": message,
    }));
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let header_value = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map(str::to_owned));
    let header_value = match header_value {
        Some(Ok(v)) => v,
        Some(Err(_)) => return Ok(unauthorized(req, "Invalid Authorization header encoding")),
        None => return Ok(unauthorized(req, "Missing Authorization header")),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(unauthorized(req, "Authorization header must start with Bearer"));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return Ok(unauthorized(req, "Invalid or expired token"));
        }
    };

    let Some(role) = Role::from_id(claims.role) else {
        return Ok(unauthorized(req, "Invalid role"));
    };

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        profile_id: claims.profile_id,
    });

    next.call(req).await
}
