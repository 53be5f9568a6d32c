use std::{convert::Infallible, net::SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use serde_json::Value;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Pulls `option` out of a vote body. Anything unusable comes back empty and is
/// rejected downstream as a missing option.
pub fn get_option_from_body(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|payload| payload.get("option")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// First hop of `X-Forwarded-For` when a proxy set it, else the peer address, else empty.
pub fn client_origin(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => String::new(),
    }
}

pub struct ClientOrigin(pub String);

impl<S> FromRequestParts<S> for ClientOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self(client_origin(&parts.headers, peer)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn option(body: &str) -> String {
        get_option_from_body(&Bytes::from(body.to_string()))
    }

    #[test]
    fn test_option_from_body() {
        assert_eq!(option(r#"{"option":"jjamppong"}"#), "jjamppong");
        assert_eq!(option(r#"{"option":""}"#), "");
        assert_eq!(option(r#"{"option":7}"#), "");
        assert_eq!(option(r#"{"other":"x"}"#), "");
        assert_eq!(option("not json"), "");
        assert_eq!(option(""), "");
        assert_eq!(option(r#"["option"]"#), "");
    }

    #[test]
    fn test_origin_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(client_origin(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_origin_falls_back_to_peer() {
        let peer: SocketAddr = "192.168.1.4:5000".parse().unwrap();

        assert_eq!(client_origin(&HeaderMap::new(), Some(peer)), "192.168.1.4");

        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(""));
        assert_eq!(client_origin(&headers, Some(peer)), "192.168.1.4");
    }

    #[test]
    fn test_origin_unknown() {
        assert_eq!(client_origin(&HeaderMap::new(), None), "");
    }
}
