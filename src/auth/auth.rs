use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

/// Acting identity carried by the auth service's bearer token. Manual
/// attendance actions stamp `user_id` onto audit entries as `created_by`.
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(token) = bearer_token(req) else {
            return ready(Err(ErrorUnauthorized("Missing token")));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(actix_web::error::ErrorInternalServerError(
                "Config missing",
            )));
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(claims) => claims,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let Some(role) = Role::from_id(claims.role) else {
            return ready(Err(ErrorUnauthorized("Invalid role")));
        };

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        }))
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.is_privileged() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn is_hr_or_admin(&self) -> bool {
        self.role.is_privileged()
    }

    /// Recording attendance for someone else needs HR/Admin; everyone may
    /// act for their own employee record.
    pub fn require_can_act_for(&self, employee_id: u64) -> actix_web::Result<()> {
        if self.employee_id == Some(employee_id) {
            return Ok(());
        }
        self.require_hr_or_admin()
    }
}
