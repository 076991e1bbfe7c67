use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "admin_session";

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, AuthError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidSecret)?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

/// The signed value, if the signature checks out.
pub fn verify_signed_cookie<'a>(secret: &str, signed_value: &'a str) -> Option<&'a str> {
    if let Some((value, signature_b64)) = signed_value.rsplit_once(':')
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        if mac.verify_slice(&signature).is_ok() {
            return Some(value);
        }
    }
    None
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

/// Session token for an admin login that stays valid until `expires_at`
/// (unix seconds).
pub fn create_session(secret: &str, expires_at: i64) -> Result<String, AuthError> {
    create_signed_cookie(secret, &expires_at.to_string())
}

/// Whether `token` is a correctly signed session that has not expired at
/// `now` (unix seconds).
pub fn session_is_valid(secret: &str, token: &str, now: i64) -> bool {
    verify_signed_cookie(secret, token)
        .and_then(|value| value.parse::<i64>().ok())
        .is_some_and(|expires_at| expires_at > now)
}

/// Whether the request carries a valid admin session cookie.
pub fn is_admin(headers: &HeaderMap, secret: &str) -> bool {
    get_cookie_value(headers, SESSION_COOKIE)
        .is_some_and(|token| session_is_valid(secret, &token, chrono::Utc::now().timestamp()))
}

/// Compares two secrets without short-circuiting on the first difference.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn session_cookie_header(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    )
}

pub fn clear_session_cookie_header() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}
