//! API-key credential checks
//!
//! The credential is looked for in the configured header first, as
//! `<scheme> <credential>`, then in the configured query parameter. The
//! expected value is resolved once when the guard is built.

use http::{HeaderMap, HeaderName};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::config::{ApiKeyAuth, ConfigError};

/// Outcome of checking one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheckResult {
    /// No credential supplied
    Missing,
    /// A credential was supplied but does not match
    Invalid,
    Valid,
}

#[derive(Debug, Clone)]
pub struct ApiKeyGuard {
    header_name: HeaderName,
    scheme: String,
    query_param_name: Option<String>,
    expected: Option<String>,
}

impl ApiKeyGuard {
    /// Build a guard, resolving environment credentials from the process environment
    pub fn new(auth: &ApiKeyAuth) -> Result<Self, ConfigError> {
        Self::with_resolver(auth, |name| std::env::var(name).ok())
    }

    /// Build a guard with an explicit environment lookup
    pub fn with_resolver(
        auth: &ApiKeyAuth,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let header_name = auth.header_name()?;
        let expected = auth
            .credential_source
            .resolve_with(lookup)
            .filter(|value| !value.is_empty());

        match &expected {
            Some(_) => info!(
                header = %header_name,
                source = %auth.credential_source.describe(),
                "API key authentication enabled"
            ),
            None => warn!(
                source = %auth.credential_source.describe(),
                "API key authentication is configured but no credential could be resolved; \
                 requests will NOT be authenticated"
            ),
        }

        Ok(Self {
            header_name,
            scheme: auth.scheme.clone(),
            query_param_name: auth.query_param_name.clone(),
            expected,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// True when no expected credential was resolved and every request passes
    pub fn is_open(&self) -> bool {
        self.expected.is_none()
    }

    pub fn check(&self, headers: &HeaderMap, query: Option<&str>) -> CredentialCheckResult {
        let Some(expected) = &self.expected else {
            return CredentialCheckResult::Valid;
        };

        match self.extract_credential(headers, query) {
            None => CredentialCheckResult::Missing,
            Some(supplied) if bool::from(supplied.as_bytes().ct_eq(expected.as_bytes())) => {
                CredentialCheckResult::Valid
            }
            Some(_) => CredentialCheckResult::Invalid,
        }
    }

    /// Header credential, falling back to the query parameter
    pub fn extract_credential(&self, headers: &HeaderMap, query: Option<&str>) -> Option<String> {
        self.from_header(headers)
            .or_else(|| query.and_then(|query| self.from_query(query)))
    }

    fn from_header(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(&self.header_name)?.to_str().ok()?;
        let mut tokens = value.split(' ');
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(scheme), Some(credential), None)
                if scheme == self.scheme && !credential.is_empty() =>
            {
                Some(credential.to_string())
            }
            _ => None,
        }
    }

    /// Only a single, non-empty occurrence of the parameter counts
    fn from_query(&self, query: &str) -> Option<String> {
        let name = self.query_param_name.as_deref()?;
        let mut values = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned());

        match (values.next(), values.next()) {
            (Some(value), None) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialSource;
    use http::HeaderValue;

    fn guard(auth: ApiKeyAuth) -> ApiKeyGuard {
        ApiKeyGuard::with_resolver(&auth, |name| {
            (name == "mcp_api_key").then(|| "s3cret".to_string())
        })
        .unwrap()
    }

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_header() {
        let guard = guard(ApiKeyAuth::new());

        assert_eq!(
            guard.check(&headers("authorization", "Bearer s3cret"), None),
            CredentialCheckResult::Valid
        );
        assert_eq!(
            guard.check(&headers("authorization", "Bearer wrong"), None),
            CredentialCheckResult::Invalid
        );
        assert_eq!(
            guard.check(&HeaderMap::new(), None),
            CredentialCheckResult::Missing
        );
    }

    #[test]
    fn test_scheme_must_match_exactly() {
        let guard = guard(ApiKeyAuth::new());

        for value in [
            "bearer s3cret",
            "Token s3cret",
            "Bearer",
            "Bearer ",
            "s3cret",
            "Bearer  s3cret",
            "Bearer s3cret extra",
            "Bearer s3cret ",
        ] {
            let mut map = HeaderMap::new();
            map.insert("authorization", HeaderValue::from_str(value).unwrap());
            assert_eq!(
                guard.check(&map, None),
                CredentialCheckResult::Missing,
                "header {:?}",
                value
            );
        }
    }

    #[test]
    fn test_custom_header_and_scheme() {
        let guard = guard(ApiKeyAuth::new().header("x-api-key").scheme("ApiKey"));

        assert_eq!(
            guard.check(&headers("x-api-key", "ApiKey s3cret"), None),
            CredentialCheckResult::Valid
        );
        assert_eq!(
            guard.check(&headers("authorization", "Bearer s3cret"), None),
            CredentialCheckResult::Missing
        );
    }

    #[test]
    fn test_query_fallback() {
        let guard = guard(ApiKeyAuth::new().query_param("api_key"));

        assert_eq!(
            guard.check(&HeaderMap::new(), Some("api_key=s3cret")),
            CredentialCheckResult::Valid
        );
        assert_eq!(
            guard.check(&HeaderMap::new(), Some("other=1&api_key=nope")),
            CredentialCheckResult::Invalid
        );
        // percent-encoded value is decoded before comparison
        assert_eq!(
            guard.check(&HeaderMap::new(), Some("api_key=s3%63ret")),
            CredentialCheckResult::Valid
        );
    }

    #[test]
    fn test_repeated_query_param_is_not_a_credential() {
        let guard = guard(ApiKeyAuth::new().query_param("api_key"));

        assert_eq!(
            guard.check(&HeaderMap::new(), Some("api_key=s3cret&api_key=s3cret")),
            CredentialCheckResult::Missing
        );
        assert_eq!(
            guard.check(&HeaderMap::new(), Some("api_key=")),
            CredentialCheckResult::Missing
        );
    }

    #[test]
    fn test_malformed_header_falls_back_to_query() {
        let guard = guard(ApiKeyAuth::new().query_param("api_key"));

        assert_eq!(
            guard.check(
                &headers("authorization", "Bearer s3cret extra"),
                Some("api_key=s3cret")
            ),
            CredentialCheckResult::Valid
        );
    }

    #[test]
    fn test_header_wins_over_query() {
        let guard = guard(ApiKeyAuth::new().query_param("api_key"));

        assert_eq!(
            guard.check(
                &headers("authorization", "Bearer wrong"),
                Some("api_key=s3cret")
            ),
            CredentialCheckResult::Invalid
        );
    }

    #[test]
    fn test_query_ignored_without_param_name() {
        let guard = guard(ApiKeyAuth::new());

        assert_eq!(
            guard.check(&HeaderMap::new(), Some("api_key=s3cret")),
            CredentialCheckResult::Missing
        );
    }

    #[test]
    fn test_unresolved_credential_is_open() {
        let auth = ApiKeyAuth::from_env("UNSET_VARIABLE");
        let guard = ApiKeyGuard::with_resolver(&auth, |_| None).unwrap();

        assert!(guard.is_open());
        assert_eq!(
            guard.check(&HeaderMap::new(), None),
            CredentialCheckResult::Valid
        );
    }

    #[test]
    fn test_literal_credential() {
        let auth = ApiKeyAuth {
            credential_source: CredentialSource::Literal("lit".to_string()),
            ..ApiKeyAuth::new()
        };
        let guard = ApiKeyGuard::with_resolver(&auth, |_| None).unwrap();

        assert!(!guard.is_open());
        assert_eq!(
            guard.check(&headers("authorization", "Bearer lit"), None),
            CredentialCheckResult::Valid
        );
    }
}
