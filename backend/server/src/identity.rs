//! # Voter Identity
//!
//! Anonymous, client-held voter id carried in the `voterId` cookie.
//!
//! ## Cookie
//! - value: UUID v4 string
//! - HttpOnly, Path=/, SameSite=Lax, Max-Age of one year
//! - Secure when running in production
//!
//! ## Resolution
//! - Cookie holds a UUID in the exact form we issue (lowercase, hyphenated): reuse it verbatim
//! - Missing, empty or garbled: issue a fresh UUID and hand back a `Set-Cookie` value
//!
//! There is no server-side registry of issued ids.
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use uuid::Uuid;

pub const VOTER_COOKIE: &str = "voterId";
pub const VOTER_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct Identity {
    pub voter: String,
    pub set_cookie: Option<HeaderValue>,
}

pub fn resolve_identity(headers: &HeaderMap, secure: bool) -> Result<Identity, InvalidHeaderValue> {
    if let Some(voter) = find_cookie(headers, VOTER_COOKIE).filter(|value| is_issued(value)) {
        return Ok(Identity {
            voter: voter.to_string(),
            set_cookie: None,
        });
    }

    let voter = Uuid::new_v4().to_string();
    let set_cookie = issue_cookie(&voter, secure)?;

    Ok(Identity {
        voter,
        set_cookie: Some(set_cookie),
    })
}

// Only the lowercase hyphenated form we hand out, so one UUID cannot become several voters.
fn is_issued(value: &str) -> bool {
    Uuid::parse_str(value).is_ok_and(|id| id.hyphenated().to_string() == value)
}

fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

fn issue_cookie(voter: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{VOTER_COOKIE}={voter}; Path=/; Max-Age={VOTER_COOKIE_MAX_AGE}; SameSite=Lax; HttpOnly"
    );

    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_reuses_existing_id() {
        let id = Uuid::new_v4().to_string();
        let identity = resolve_identity(&headers(&format!("theme=dark; voterId={id}")), false).unwrap();

        assert_eq!(identity.voter, id);
        assert!(identity.set_cookie.is_none());
    }

    #[test]
    fn test_issues_when_missing() {
        let identity = resolve_identity(&HeaderMap::new(), false).unwrap();

        assert!(Uuid::parse_str(&identity.voter).is_ok());

        let cookie = identity.set_cookie.unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("voterId={}", identity.voter)));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=31536000"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_secure_flag() {
        let identity = resolve_identity(&HeaderMap::new(), true).unwrap();

        assert!(identity.set_cookie.unwrap().to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn test_garbled_id_is_replaced() {
        let identity = resolve_identity(&headers("voterId=not-a-real-id"), false).unwrap();

        assert_ne!(identity.voter, "not-a-real-id");
        assert!(identity.set_cookie.is_some());

        let identity = resolve_identity(&headers("voterId="), false).unwrap();
        assert!(identity.set_cookie.is_some());
    }

    #[test]
    fn test_alternate_uuid_forms_are_replaced() {
        let id = Uuid::new_v4();

        for form in [
            format!("{{{id}}}"),
            id.urn().to_string(),
            id.simple().to_string(),
            id.hyphenated().to_string().to_uppercase(),
        ] {
            let identity = resolve_identity(&headers(&format!("voterId={form}")), false).unwrap();

            assert_ne!(identity.voter, form);
            assert!(identity.set_cookie.is_some(), "form {form}");
        }
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = resolve_identity(&HeaderMap::new(), false).unwrap();
        let b = resolve_identity(&HeaderMap::new(), false).unwrap();

        assert_ne!(a.voter, b.voter);
    }

    #[test]
    fn test_similar_cookie_names_ignored() {
        let id = Uuid::new_v4().to_string();
        let identity =
            resolve_identity(&headers(&format!("oldvoterId={id}; voterIds={id}")), false).unwrap();

        assert_ne!(identity.voter, id);
    }
}
