//! Request state carried through the admission stages

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::body::GatewayBody;
use crate::error::GatewayError;

enum BodyState {
    Pending(GatewayBody),
    Collected(Bytes),
    Taken,
}

/// Mutable view of a request while it is being admitted
pub struct AdmissionContext {
    parts: Parts,
    body: BodyState,
    path_param: Option<String>,
}

impl AdmissionContext {
    pub fn new(parts: Parts, body: GatewayBody) -> Self {
        Self {
            parts,
            body: BodyState::Pending(body),
            path_param: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Take the unread body; `None` once a stage has taken it
    pub fn take_body(&mut self) -> Option<GatewayBody> {
        match std::mem::replace(&mut self.body, BodyState::Taken) {
            BodyState::Pending(body) => Some(body),
            other => {
                self.body = other;
                None
            }
        }
    }

    pub fn set_collected_body(&mut self, bytes: Bytes) {
        self.body = BodyState::Collected(bytes);
    }

    pub fn collected_body(&self) -> Option<&Bytes> {
        match &self.body {
            BodyState::Collected(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn set_path_param(&mut self, value: impl Into<String>) {
        self.path_param = Some(value.into());
    }

    pub fn path_param(&self) -> Option<&str> {
        self.path_param.as_deref()
    }

    /// Finish admission; fails if no stage collected the body
    pub fn into_admitted(self) -> Result<AdmittedRequest, GatewayError> {
        match self.body {
            BodyState::Collected(body) => Ok(AdmittedRequest {
                parts: self.parts,
                body,
                path_param: self.path_param,
            }),
            _ => Err(GatewayError::Internal(
                "request body was not collected during admission".to_string(),
            )),
        }
    }
}

/// A request that passed every admission stage
#[derive(Debug)]
pub struct AdmittedRequest {
    pub parts: Parts,
    /// Complete body, within the size limit
    pub body: Bytes,
    /// Trimmed, decoded URL parameter when one is configured
    pub path_param: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::full;
    use http::Request;

    fn context() -> AdmissionContext {
        let (parts, _) = Request::post("/mcp").body(()).unwrap().into_parts();
        AdmissionContext::new(parts, full("{}"))
    }

    #[test]
    fn test_body_taken_once() {
        let mut ctx = context();
        assert!(ctx.take_body().is_some());
        assert!(ctx.take_body().is_none());
    }

    #[test]
    fn test_into_admitted_requires_collected_body() {
        assert!(context().into_admitted().is_err());

        let mut ctx = context();
        ctx.take_body();
        ctx.set_collected_body(Bytes::from_static(b"{}"));
        ctx.set_path_param("acme");
        let admitted = ctx.into_admitted().unwrap();

        assert_eq!(admitted.body, Bytes::from_static(b"{}"));
        assert_eq!(admitted.path_param.as_deref(), Some("acme"));
    }
}
