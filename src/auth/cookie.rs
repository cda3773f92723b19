use axum::http::{header, HeaderMap};

/// Name of the HttpOnly cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "jwt";

fn attributes(secure: bool) -> &'static str {
    // browsers drop SameSite=None cookies that are not Secure
    if secure {
        "HttpOnly; Path=/; SameSite=None; Secure"
    } else {
        "HttpOnly; Path=/; SameSite=Lax"
    }
}

pub fn refresh_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{REFRESH_COOKIE}={token}; Max-Age={max_age_secs}; {}",
        attributes(secure)
    )
}

pub fn clear_refresh_cookie(secure: bool) -> String {
    format!("{REFRESH_COOKIE}=; Max-Age=0; {}", attributes(secure))
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}
