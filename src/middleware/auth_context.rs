use std::future::{ready, Ready};

use actix_web::{
    dev::Payload, error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest,
};

use crate::middleware::auth::Claims;
use crate::services::checkout_service::Buyer;

/// Signed-in customer taken from the claims `AuthMiddleware` attached.
/// Use `Option<AuthenticatedUser>` where guests are allowed.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

impl AuthenticatedUser {
    pub fn buyer(&self) -> Buyer {
        Buyer {
            user_id: self.user_id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.email.clone()),
            email: self.email.clone(),
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(claims) = req.extensions().get::<Claims>() {
            ready(Ok(AuthenticatedUser {
                user_id: claims.user_id.clone(),
                email: claims.sub.clone(),
                name: claims.name.clone(),
            }))
        } else {
            ready(Err(ErrorUnauthorized("User not authenticated")))
        }
    }
}
