//! CORS (Cross-Origin Resource Sharing) support

use http::{HeaderMap, HeaderName, HeaderValue, header};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const DEFAULT_ALLOW_HEADERS: &str = "Content-Type, Authorization, Accept, Mcp-Session-Id";
const MAX_AGE_SECONDS: &str = "86400";

/// Permissive CORS headers for browser-based MCP clients
#[derive(Debug, Clone)]
pub struct CorsLayer {
    allow_headers: HeaderValue,
}

impl Default for CorsLayer {
    fn default() -> Self {
        Self {
            allow_headers: HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
        }
    }
}

impl CorsLayer {
    /// Allow the credential header alongside the MCP headers
    pub fn new(credential_header: Option<&HeaderName>) -> Self {
        let Some(credential_header) = credential_header else {
            return Self::default();
        };

        let allowed = format!(
            "Content-Type, {}, Accept, Mcp-Session-Id",
            credential_header.as_str()
        );
        HeaderValue::from_str(&allowed)
            .map(|allow_headers| Self { allow_headers })
            .unwrap_or_default()
    }

    /// Apply CORS headers to a response
    pub fn apply_cors_headers(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            self.allow_headers.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECONDS),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_cors_headers() {
        let mut headers = HeaderMap::new();
        CorsLayer::default().apply_cors_headers(&mut headers);

        assert_eq!(headers.get("Access-Control-Allow-Origin").unwrap(), "*");
        assert_eq!(
            headers.get("Access-Control-Allow-Methods").unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type, Authorization, Accept, Mcp-Session-Id"
        );
        assert_eq!(headers.get("Access-Control-Max-Age").unwrap(), "86400");
    }

    #[test]
    fn test_custom_credential_header_allowed() {
        let header = HeaderName::from_static("x-api-key");
        let mut headers = HeaderMap::new();
        CorsLayer::new(Some(&header)).apply_cors_headers(&mut headers);

        assert_eq!(
            headers.get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type, x-api-key, Accept, Mcp-Session-Id"
        );
    }
}
