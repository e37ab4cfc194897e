use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use circulo_types::api::Claims;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "circulo_session";

/// Decode the session cookie, if any, and stash the claims in request
/// extensions. Invalid or expired tokens are treated as anonymous.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match decode_session(cookie.value(), &state.session.secret) {
            Some(claims) => {
                req.extensions_mut().insert(claims);
            }
            None => debug!("Ignoring invalid session cookie"),
        }
    }
    next.run(req).await
}

/// Redirect anonymous requests to the login page, remembering where they were going.
pub async fn require_auth(req: Request, next: Next) -> Response {
    if req.extensions().get::<Claims>().is_some() {
        return next.run(req).await;
    }
    let target = format!("/login/?next={}", encode_next(req.uri().path()));
    Redirect::to(&target).into_response()
}

pub fn decode_session(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Percent-encode a path for use as a query value; `/` is left readable.
fn encode_next(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_next_escapes_query_syntax() {
        assert_eq!(encode_next("/profile/"), "/profile/");
        assert_eq!(encode_next("/profile/a&b/"), "/profile/a%26b/");
        assert_eq!(encode_next("/profile/jo%C3%A3o/"), "/profile/jo%25C3%25A3o/");
    }

    #[test]
    fn garbage_token_is_anonymous() {
        assert!(decode_session("not-a-jwt", "secret").is_none());
    }
}
