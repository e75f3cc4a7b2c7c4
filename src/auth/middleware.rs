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
use tracing::debug;

fn unauthorized(req: ServiceRequest, message: &str) -> Result<ServiceResponse<BoxBody>, Error> {
    debug!(path = %req.path(), message, "Request rejected");
    let resp = HttpResponse::Unauthorized().json(json!({ "error": message }));
    Ok(req.into_response(resp.map_into_boxed_body()))
}

/// Scope-level gate: verifies the bearer token and stashes the acting
/// identity for handlers that read it through extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let jwt_secret = config.jwt_secret.clone();

    let token = match req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().unwrap_or_default())
    {
        None => return unauthorized(req, "Missing Authorization header"),
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => token.to_owned(),
            None => return unauthorized(req, "Authorization header must start with Bearer"),
        },
    };

    let claims = match verify_token(&token, &jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return unauthorized(req, "Invalid or expired token"),
    };

    let Some(role) = Role::from_id(claims.role) else {
        return unauthorized(req, "Invalid role");
    };

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    });

    next.call(req).await
}
