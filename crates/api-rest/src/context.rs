//! Per-request origin information used to build absolute image URLs.

use axum::http::{header, HeaderMap};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Scheme, host and port the client used to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl RequestContext {
    /// Reads the scheme from `X-Forwarded-Proto` (default `http`) and the host and port from
    /// `Host`. Without a `Host` header, `fallback_authority` (usually the bind address) is used.
    pub fn from_headers(headers: &HeaderMap, fallback_authority: &str) -> Self {
        let scheme = headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "http".to_owned());

        let authority = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(fallback_authority)
            .trim();

        let (host, port) = split_host_port(authority);
        let port = port.unwrap_or(if scheme == "https" { 443 } else { 80 });

        Self { scheme, host, port }
    }

    /// `<scheme>://<host>:<port>/uploads/<image_path>`
    pub fn image_url(&self, image_path: &str) -> String {
        format!(
            "{}://{}:{}/uploads/{}",
            self.scheme, self.host, self.port, image_path
        )
    }
}

fn split_host_port(authority: &str) -> (String, Option<u16>) {
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (format!("[{}]", host), port);
        }
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_owned(), Some(port)),
            Err(_) => (authority.to_owned(), None),
        },
        None => (authority.to_owned(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_host_header_with_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("rently.example:8080"));

        let ctx = RequestContext::from_headers(&headers, "0.0.0.0:3000");
        assert_eq!(ctx.scheme, "http");
        assert_eq!(ctx.host, "rently.example");
        assert_eq!(ctx.port, 8080);
        assert_eq!(
            ctx.image_url("annunci/1/Ab3dE9xY0qLm.jpg"),
            "http://rently.example:8080/uploads/annunci/1/Ab3dE9xY0qLm.jpg"
        );
    }

    #[test]
    fn test_forwarded_proto_sets_default_port() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("rently.example"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("HTTPS, http"));

        let ctx = RequestContext::from_headers(&headers, "0.0.0.0:3000");
        assert_eq!(ctx.scheme, "https");
        assert_eq!(ctx.port, 443);
    }

    #[test]
    fn test_missing_host_uses_fallback() {
        let ctx = RequestContext::from_headers(&HeaderMap::new(), "127.0.0.1:3000");
        assert_eq!(ctx.host, "127.0.0.1");
        assert_eq!(ctx.port, 3000);
    }

    #[test]
    fn test_ipv6_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("[::1]:3000"));

        let ctx = RequestContext::from_headers(&headers, "0.0.0.0:3000");
        assert_eq!(ctx.host, "[::1]");
        assert_eq!(ctx.port, 3000);
    }
}
