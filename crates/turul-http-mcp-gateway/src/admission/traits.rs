//! Core admission stage trait

use async_trait::async_trait;

use super::AdmissionContext;
use crate::error::GatewayError;

/// What a stage decided about the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Hand the request to the next stage
    Continue,
    /// Stop here and answer with an empty successful preflight response
    Preflight,
}

/// One step of the admission pipeline
///
/// Stages see the request head through the [`AdmissionContext`] and may
/// consume the body. Returning an error rejects the request; the error is
/// mapped to an HTTP response by the gateway.
#[async_trait]
pub trait AdmissionStage: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    async fn admit(&self, ctx: &mut AdmissionContext) -> Result<StageOutcome, GatewayError>;
}
