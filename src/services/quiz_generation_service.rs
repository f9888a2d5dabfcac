use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    errors::{PipelineError, StageFailure},
    models::domain::{GenerationRequest, PipelineStage, QuizResult},
    services::{quiz_orchestrator::QuizOrchestrator, run_context::RunContext},
};

/// Front door for pipeline runs. Bounds how many run at once so the
/// provider's rate limits are respected.
pub struct QuizGenerationService {
    orchestrator: Arc<QuizOrchestrator>,
    permits: Arc<Semaphore>,
}

impl QuizGenerationService {
    pub fn new(orchestrator: QuizOrchestrator, max_concurrent: usize) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.orchestrator.provider_name()
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits for a free slot, then runs one request. Cancelling `cancel`
    /// while waiting or running aborts the run.
    pub async fn generate(
        &self,
        run_id: impl Into<String>,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<QuizResult, StageFailure> {
        let run_id = run_id.into();

        let _permit = tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("[{}] Cancelled while waiting for a generation slot", run_id);
                return Err(StageFailure::new(PipelineStage::Created, PipelineError::Cancelled));
            }
            permit = self.permits.acquire() => permit.map_err(|_| {
                StageFailure::new(PipelineStage::Created, PipelineError::Cancelled)
            })?,
        };

        log::info!(
            "[{}] Starting quiz generation ({} question(s) requested)",
            run_id,
            request.desired_question_count
        );
        let ctx = RunContext::new(run_id, cancel);
        self.orchestrator.run(request, &ctx).await
    }

    /// Runs every request concurrently under the same limit. Results come
    /// back in request order.
    pub async fn generate_batch(
        &self,
        requests: &[GenerationRequest],
        cancel: CancellationToken,
    ) -> Vec<Result<QuizResult, StageFailure>> {
        join_all(requests.iter().map(|request| {
            self.generate(Uuid::new_v4().to_string(), request, cancel.child_token())
        }))
        .await
    }
}
