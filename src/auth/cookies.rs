// Host-only auth cookies: HttpOnly, Secure, SameSite=Lax, Path=/

use actix_web::cookie::{time::Duration, Cookie, SameSite};

/// Cookie names derived from the configured prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub access: String,
    pub refresh: String,
}

impl CookieNames {
    pub fn new(prefix: &str) -> Self {
        Self {
            access: format!("{}-access-token", prefix),
            refresh: format!("{}-refresh-token", prefix),
        }
    }
}

/// Build an auth cookie living for `max_age_seconds`
pub fn build_cookie(name: &str, value: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name.to_owned(), value.to_owned())
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// Build a cookie that clears `name` on the client
pub fn build_delete_cookie(name: &str) -> Cookie<'static> {
    build_cookie(name, "", 0)
}

/// Find a cookie value in a raw `Cookie` header.
///
/// Values are returned verbatim, without percent-decoding.
pub fn token_from_cookie_header<'a>(header: Option<&'a str>, name: &str) -> Option<&'a str> {
    header?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_names() {
        let names = CookieNames::new("app");
        assert_eq!(names.access, "app-access-token");
        assert_eq!(names.refresh, "app-refresh-token");
    }

    #[test]
    fn test_build_cookie_attributes() {
        let header = build_cookie("app-access-token", "abc.def.ghi", 900).to_string();

        assert!(header.starts_with("app-access-token=abc.def.ghi"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=900"));
        assert!(!header.contains("Domain"));
    }

    #[test]
    fn test_delete_cookie() {
        let header = build_delete_cookie("app-refresh-token").to_string();

        assert!(header.starts_with("app-refresh-token=;"));
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("HttpOnly"));
    }

    #[test]
    fn test_extract_from_header() {
        let header = Some("theme=dark; app-access-token=a.b.c;app-refresh-token=xyz_-");

        assert_eq!(token_from_cookie_header(header, "app-access-token"), Some("a.b.c"));
        assert_eq!(token_from_cookie_header(header, "app-refresh-token"), Some("xyz_-"));
        assert_eq!(token_from_cookie_header(header, "theme"), Some("dark"));
    }

    #[test]
    fn test_extract_missing() {
        assert_eq!(token_from_cookie_header(None, "app-access-token"), None);
        assert_eq!(token_from_cookie_header(Some(""), "app-access-token"), None);
        assert_eq!(
            token_from_cookie_header(Some("other-access-token=1"), "app-access-token"),
            None
        );
    }

    #[test]
    fn test_extract_requires_exact_name() {
        // a longer cookie name sharing the prefix must not match
        let header = Some("app-access-token-old=stale; app-access-token=fresh");
        assert_eq!(token_from_cookie_header(header, "app-access-token"), Some("fresh"));
    }

    #[test]
    fn test_extract_does_not_decode() {
        let header = Some("app-refresh-token=a%3Db");
        assert_eq!(token_from_cookie_header(header, "app-refresh-token"), Some("a%3Db"));
    }
}
