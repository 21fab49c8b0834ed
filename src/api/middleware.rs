use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::Response,
};
use std::convert::Infallible;
use uuid::Uuid;

const SESSION_COOKIE: &str = "user_id";

/// Opaque per-client session identity. Read from the `user_id` cookie when
/// present; a fresh token is minted otherwise and `is_new` tells the
/// handler to issue the cookie on its response.
pub struct Session {
    pub user_id: String,
    pub is_new: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let existing = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| {
                cookies
                    .split(';')
                    .map(str::trim)
                    .find_map(|c| {
                        c.strip_prefix(SESSION_COOKIE)
                            .and_then(|rest| rest.strip_prefix('='))
                    })
            })
            .map(str::to_string)
            .filter(|v| !v.is_empty());

        match existing {
            Some(user_id) => Ok(Session {
                user_id,
                is_new: false,
            }),
            None => Ok(Session {
                user_id: Uuid::new_v4().to_string(),
                is_new: true,
            }),
        }
    }
}

impl Session {
    /// Attach the Set-Cookie header when this request minted a new token.
    pub fn apply_cookie(&self, response: &mut Response) {
        if !self.is_new {
            return;
        }

        let value = format!(
            "{}={}; Path=/; Max-Age=31536000; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, self.user_id
        );
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            response.headers_mut().append(header::SET_COOKIE, header_value);
        }
    }
}
