//! Admission pipeline execution

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, trace};

use super::{
    AdmissionContext, AdmissionStage, AdmittedRequest, AuthStage, BodyLimitStage, CorsStage,
    PathParameterStage, StageOutcome,
};
use crate::auth::ApiKeyGuard;
use crate::config::ServerConfig;
use crate::error::{GatewayError, panic_message};

/// Final decision for a request
#[derive(Debug)]
pub enum AdmissionResult {
    /// Passed every stage; ready for the session lifecycle
    Accepted(AdmittedRequest),
    /// Answered by a stage with an empty successful response
    Preflight,
    Rejected(GatewayError),
}

/// Ordered collection of admission stages
///
/// Stages run in registration order. The first stage that rejects the request
/// or answers a preflight ends the run; a stage that panics rejects the request
/// as an internal error.
#[derive(Default, Clone)]
pub struct AdmissionPipeline {
    stages: Vec<Arc<dyn AdmissionStage>>,
}

impl AdmissionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages for `config`, in the order the gateway runs them
    ///
    /// `guard` is the resolved API-key guard when API-key auth is configured.
    /// An open guard (no expected credential) installs no auth stage.
    pub fn for_config(config: &ServerConfig, guard: Option<Arc<ApiKeyGuard>>) -> Self {
        let mut pipeline = Self::new();
        pipeline.push(Arc::new(BodyLimitStage::new(
            config.body_limit_mb,
            config.body_limit_bytes,
        )));
        if config.cors_enabled {
            pipeline.push(Arc::new(CorsStage));
        }
        if let Some(name) = &config.url_param_name {
            pipeline.push(Arc::new(PathParameterStage::new(&config.mcp_path, name)));
        }
        if let Some(guard) = guard
            && !guard.is_open()
        {
            pipeline.push(Arc::new(AuthStage::new(guard)));
        }
        pipeline
    }

    /// Add a stage to the end of the pipeline
    pub fn push(&mut self, stage: Arc<dyn AdmissionStage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn run(&self, mut ctx: AdmissionContext) -> AdmissionResult {
        for stage in &self.stages {
            trace!(stage = stage.name(), "Running admission stage");

            let outcome = AssertUnwindSafe(stage.admit(&mut ctx)).catch_unwind().await;
            match outcome {
                Ok(Ok(StageOutcome::Continue)) => {}
                Ok(Ok(StageOutcome::Preflight)) => {
                    debug!(stage = stage.name(), "Answered preflight request");
                    return AdmissionResult::Preflight;
                }
                Ok(Err(err)) => {
                    debug!(stage = stage.name(), error = %err, "Admission stage rejected request");
                    return AdmissionResult::Rejected(err);
                }
                Err(panic) => {
                    return AdmissionResult::Rejected(GatewayError::Internal(format!(
                        "admission stage '{}' panicked: {}",
                        stage.name(),
                        panic_message(panic.as_ref())
                    )));
                }
            }
        }

        match ctx.into_admitted() {
            Ok(admitted) => AdmissionResult::Accepted(admitted),
            Err(err) => AdmissionResult::Rejected(err),
        }
    }
}
