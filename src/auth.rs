//! Anti-forgery state and the cookies carrying the OAuth session.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::{distributions::Alphanumeric, Rng};

use crate::error::AppError;

pub const STATE_COOKIE: &str = "spotify_auth_state";
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

const STATE_LEN: usize = 16;

pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Succeeds only when both values are present and equal.
pub fn verify_state(expected: Option<&str>, returned: Option<&str>) -> Result<(), AppError> {
    match (expected, returned) {
        (Some(expected), Some(returned)) if !expected.is_empty() && expected == returned => Ok(()),
        _ => Err(AppError::AuthState),
    }
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn state_cookie(state: String) -> Cookie<'static> {
    session_cookie(STATE_COOKIE, state)
}

pub fn access_token_cookie(token: String) -> Cookie<'static> {
    session_cookie(ACCESS_TOKEN_COOKIE, token)
}

pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

/// Expire the state cookie once the callback has consumed it.
pub fn clear_state(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(STATE_COOKIE).path("/"))
}
