use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use chrono::Utc;

use crate::{
    config::{Config, PipelineSettings},
    errors::{PipelineError, StageFailure},
    models::domain::{
        AuditTrail, ContentAnalysis, DifficultyCounts, GeneratedQuestion, GenerationRequest,
        PipelineStage, QualityReviewResult, QuizResult, StageRecord,
    },
    services::{
        agents::{
            ContentAnalyzer, DifficultyBalancer, QualityReview, QualityReviewer,
            QuestionGenerator, QuestionSlot,
        },
        ai_provider::{AiProvider, GenerationConfig, ProviderGateway},
        run_context::RunContext,
    },
};

/// Tracks the current stage of one run and the transitions it went through.
struct StageTracker<'a> {
    ctx: &'a RunContext,
    stage: PipelineStage,
    transitions: Vec<StageRecord>,
}

impl<'a> StageTracker<'a> {
    fn new(ctx: &'a RunContext) -> Self {
        Self {
            ctx,
            stage: PipelineStage::Created,
            transitions: vec![StageRecord {
                stage: PipelineStage::Created,
                entered_at: Utc::now(),
            }],
        }
    }

    fn enter(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "illegal transition {} -> {}",
            self.stage,
            next
        );
        log::info!("[{}] {} -> {}", self.ctx.run_id(), self.stage, next);
        self.stage = next;
        self.transitions.push(StageRecord {
            stage: next,
            entered_at: Utc::now(),
        });
    }

    fn fail(mut self, error: PipelineError) -> StageFailure {
        let failed_in = self.stage;
        log::error!(
            "[{}] Pipeline failed in {} stage: {}",
            self.ctx.run_id(),
            failed_in,
            error
        );
        self.enter(PipelineStage::Failed);
        StageFailure::new(failed_in, error)
    }
}

/// Best question list seen so far and the review it earned.
struct Snapshot {
    questions: Vec<GeneratedQuestion>,
    review: QualityReviewResult,
}

/// Drives one request through analysis, generation, review, balancing and
/// finalization.
pub struct QuizOrchestrator {
    gateway: Arc<ProviderGateway>,
    analyzer: ContentAnalyzer,
    generator: QuestionGenerator,
    reviewer: Arc<dyn QualityReview>,
    balancer: DifficultyBalancer,
    settings: PipelineSettings,
}

impl QuizOrchestrator {
    pub fn new(gateway: Arc<ProviderGateway>, settings: &PipelineSettings) -> Self {
        Self {
            analyzer: ContentAnalyzer::new(gateway.clone(), settings),
            generator: QuestionGenerator::new(gateway.clone(), settings),
            reviewer: Arc::new(QualityReviewer::new(settings)),
            balancer: DifficultyBalancer::new(settings),
            settings: settings.clone(),
            gateway,
        }
    }

    pub fn from_config(provider: Arc<dyn AiProvider>, config: &Config) -> Self {
        let gateway = Arc::new(ProviderGateway::new(
            provider,
            config.retry.clone(),
            GenerationConfig {
                max_tokens: config.provider.max_tokens,
                temperature: config.provider.temperature,
            },
        ));
        Self::new(gateway, &config.pipeline)
    }

    pub fn with_reviewer(mut self, reviewer: Arc<dyn QualityReview>) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.gateway.provider_name()
    }

    /// Runs the whole pipeline. On failure nothing but the failing stage and
    /// its cause is returned.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        ctx: &RunContext,
    ) -> Result<QuizResult, StageFailure> {
        let mut tracker = StageTracker::new(ctx);
        match self.execute(request, &mut tracker).await {
            Ok(result) => Ok(result),
            Err(error) => Err(tracker.fail(error)),
        }
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        tracker: &mut StageTracker<'_>,
    ) -> Result<QuizResult, PipelineError> {
        let ctx = tracker.ctx;
        validate_request(request)?;

        ctx.ensure_active()?;
        tracker.enter(PipelineStage::Analyzing);
        let analysis = self
            .analyzer
            .analyze(ctx, &request.content, request.topic_hint())
            .await?;

        ctx.ensure_active()?;
        tracker.enter(PipelineStage::Generating);
        let count = request.desired_question_count as usize;
        let generated = self
            .generator
            .generate(ctx, &analysis, &request.content, count)
            .await?;
        let mut warnings = generated.warnings;
        let mut questions = generated.questions;

        ctx.ensure_active()?;
        tracker.enter(PipelineStage::Reviewing);
        let mut review = self.reviewer.review(&questions, &analysis);
        let mut review_scores = vec![review.overall_score];
        let mut quality_retries = 0;
        let mut best = Snapshot {
            questions: questions.clone(),
            review: review.clone(),
        };

        while review.overall_score < request.min_quality_score
            && quality_retries < self.settings.max_quality_retries
            && !review.flagged_questions.is_empty()
        {
            quality_retries += 1;
            log::warn!(
                "[{}] Quality {:.1} below {:.1}, regenerating {} flagged question(s) (retry {}/{})",
                ctx.run_id(),
                review.overall_score,
                request.min_quality_score,
                review.flagged_questions.len(),
                quality_retries,
                self.settings.max_quality_retries
            );

            ctx.ensure_active()?;
            tracker.enter(PipelineStage::Generating);
            questions = self
                .regenerate_flagged(
                    ctx,
                    &analysis,
                    &request.content,
                    questions,
                    &review.flagged_questions,
                )
                .await?;

            ctx.ensure_active()?;
            tracker.enter(PipelineStage::Reviewing);
            review = self.reviewer.review(&questions, &analysis);
            review_scores.push(review.overall_score);
            if review.overall_score > best.review.overall_score {
                best = Snapshot {
                    questions: questions.clone(),
                    review: review.clone(),
                };
            }
        }

        let Snapshot { questions, review } = best;
        if review.overall_score < request.min_quality_score {
            warnings.push(format!(
                "quality below threshold: {:.1}",
                review.overall_score
            ));
        }

        ctx.ensure_active()?;
        tracker.enter(PipelineStage::Balancing);
        let scores = review.question_scores(questions.len(), &self.settings.severity_weights);
        let (questions, scores) = self.prune_flagged(
            ctx,
            questions,
            scores,
            &review.flagged_questions,
            &mut warnings,
        );
        let balanced = self
            .balancer
            .balance(questions, &request.target_distribution, &scores);
        if balanced.reclassified > 0 {
            log::info!(
                "[{}] Reclassified {} question difficulty level(s)",
                ctx.run_id(),
                balanced.reclassified
            );
        }
        warnings.extend(balanced.warnings);

        ctx.ensure_active()?;
        tracker.enter(PipelineStage::Finalizing);
        let mut result = self.finalize(
            &analysis,
            balanced.questions,
            count,
            review.overall_score,
            warnings,
        );

        tracker.enter(PipelineStage::Completed);
        if request.include_audit_trail {
            result.audit_trail = Some(AuditTrail {
                run_id: ctx.run_id().to_string(),
                transitions: tracker.transitions.clone(),
                review_scores,
                quality_retries,
                reclassified_questions: balanced.reclassified,
                tokens_used: ctx.tokens_used(),
            });
        }

        log::info!(
            "[{}] Quiz ready: {} question(s), {} points, quality {:.1}",
            ctx.run_id(),
            result.questions.len(),
            result.total_points,
            result.quality_score
        );
        Ok(result)
    }

    /// Replaces each flagged question in place. A slot whose replacement
    /// cannot be produced keeps its original question.
    async fn regenerate_flagged(
        &self,
        ctx: &RunContext,
        analysis: &ContentAnalysis,
        source: &str,
        mut questions: Vec<GeneratedQuestion>,
        flagged: &BTreeSet<usize>,
    ) -> Result<Vec<GeneratedQuestion>, PipelineError> {
        let mut taken: HashSet<String> = questions
            .iter()
            .enumerate()
            .filter(|(i, _)| !flagged.contains(i))
            .map(|(_, q)| q.text_key())
            .collect();

        for &index in flagged {
            let Some(current) = questions.get(index) else {
                continue;
            };
            let slot = QuestionSlot::for_question(current);
            let original_key = current.text_key();

            match self
                .generator
                .regenerate(ctx, analysis, source, &slot, &taken)
                .await?
            {
                Some(replacement) => {
                    taken.insert(replacement.text_key());
                    questions[index] = replacement;
                }
                None => {
                    log::warn!(
                        "[{}] No replacement for flagged question {} ({})",
                        ctx.run_id(),
                        index,
                        slot.concept
                    );
                    taken.insert(original_key);
                }
            }
        }

        Ok(questions)
    }

    /// Drops the questions the final review flagged, unless that would leave
    /// nothing to return.
    fn prune_flagged(
        &self,
        ctx: &RunContext,
        questions: Vec<GeneratedQuestion>,
        scores: Vec<f64>,
        flagged: &BTreeSet<usize>,
        warnings: &mut Vec<String>,
    ) -> (Vec<GeneratedQuestion>, Vec<f64>) {
        if flagged.is_empty() {
            return (questions, scores);
        }

        let (kept, kept_scores): (Vec<_>, Vec<_>) = questions
            .iter()
            .cloned()
            .zip(scores.iter().copied())
            .enumerate()
            .filter(|(i, _)| !flagged.contains(i))
            .map(|(_, pair)| pair)
            .unzip();

        if kept.is_empty() {
            log::warn!(
                "[{}] Every question was flagged, keeping them all",
                ctx.run_id()
            );
            warnings.push("all questions were flagged by quality review".to_string());
            return (questions, scores);
        }

        log::info!(
            "[{}] Removed {} flagged question(s)",
            ctx.run_id(),
            questions.len() - kept.len()
        );
        (kept, kept_scores)
    }

    fn finalize(
        &self,
        analysis: &ContentAnalysis,
        questions: Vec<GeneratedQuestion>,
        limit: usize,
        quality_score: f64,
        warnings: Vec<String>,
    ) -> QuizResult {
        let mut seen = HashSet::new();
        let questions: Vec<GeneratedQuestion> = questions
            .into_iter()
            .filter(|q| seen.insert(q.text_key()))
            .take(limit)
            .collect();

        let total_points = questions.iter().map(|q| q.points).sum();
        let difficulty_distribution =
            DifficultyCounts::from_difficulties(questions.iter().map(|q| q.difficulty));

        QuizResult {
            title: format!("{} - Assessment", analysis.topic),
            description: format!("Test your knowledge of {}", analysis.topic),
            estimated_time_minutes: estimated_minutes(analysis, questions.len()),
            questions,
            total_points,
            difficulty_distribution,
            quality_score,
            warnings,
            audit_trail: None,
        }
    }
}

/// Study time scaled by how many of the recommended questions survived.
fn estimated_minutes(analysis: &ContentAnalysis, question_count: usize) -> u32 {
    let recommended = analysis.recommended_question_count.max(1) as f64;
    let scaled = analysis.estimated_time_minutes as f64 * question_count as f64 / recommended;
    (scaled.round() as u32).max(1)
}

fn validate_request(request: &GenerationRequest) -> Result<(), PipelineError> {
    if request.desired_question_count == 0 {
        return Err(PipelineError::InvalidInput(
            "desired_question_count must be positive".to_string(),
        ));
    }
    if !request.target_distribution.is_valid_target() {
        return Err(PipelineError::InvalidInput(format!(
            "difficulty percentages must sum to 100, got {}",
            request.target_distribution.total()
        )));
    }
    if !(0.0..=100.0).contains(&request.min_quality_score) {
        return Err(PipelineError::InvalidInput(format!(
            "min_quality_score must be between 0 and 100, got {}",
            request.min_quality_score
        )));
    }
    Ok(())
}
