//! Stage logic shared by the blocking and streaming orchestrators.
//!
//! [`CouncilEngine`] owns the ports a council run needs. The stage methods
//! are crate-private; callers go through
//! [`RunCouncilUseCase`](crate::use_cases::run_council::RunCouncilUseCase) or
//! [`StreamCouncilUseCase`](crate::use_cases::stream_council::StreamCouncilUseCase).

use crate::ports::backend::{BackendAdapter, BackendRegistry, Completion, TextStream};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::knowledge::{KnowledgeEnhancer, NoKnowledge};
use crate::ports::metrics::{MetricsSink, NoMetrics};
use crate::ports::progress::ProgressNotifier;
use crate::use_cases::error::CouncilError;
use chrono::Utc;
use council_domain::{
    CouncilResult, DomainCatalog, DomainError, DomainProfile, ERROR_MARKER, ExpertAnswer,
    PeerReview, PromptTemplate, Query, ReviewStatus, Stage, StageTimings, SynthesisResult,
    default_rank, rank_or_default, select_synthesizer,
};
use serde_json::json;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The ports behind a council run.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct CouncilEngine {
    registry: Arc<BackendRegistry>,
    catalog: Arc<DomainCatalog>,
    knowledge: Arc<dyn KnowledgeEnhancer>,
    metrics: Arc<dyn MetricsSink>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

/// A query that passed preparation: profile resolved, adapters looked up,
/// knowledge context folded into the stage-1 prompt.
pub(crate) struct PreparedQuery {
    pub query_id: String,
    pub query: Query,
    pub profile: DomainProfile,
    /// Parallel to `profile.backends`
    pub adapters: Vec<Arc<dyn BackendAdapter>>,
    pub expert_prompt: String,
    pub knowledge_sources: Vec<String>,
}

impl PreparedQuery {
    pub fn into_result(
        self,
        stage1: Vec<ExpertAnswer>,
        stage2: Vec<PeerReview>,
        stage3: SynthesisResult,
        timings: StageTimings,
    ) -> CouncilResult {
        CouncilResult {
            query_id: self.query_id,
            domain: self.query.domain().clone(),
            original_query: self.query.text().to_string(),
            stage1,
            stage2,
            stage3,
            timings,
            timestamp: Utc::now(),
            knowledge_sources: self.knowledge_sources,
            disclaimer: self.profile.disclaimer,
        }
    }

    /// System prompt for stage 3: the domain persona plus the chair's brief
    fn synthesis_system(&self) -> String {
        format!(
            "{}\n\n{}",
            self.profile.system_prompt,
            PromptTemplate::synthesis_system()
        )
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

impl CouncilEngine {
    pub fn new(registry: Arc<BackendRegistry>, catalog: Arc<DomainCatalog>) -> Self {
        Self {
            registry,
            catalog,
            knowledge: Arc::new(NoKnowledge),
            metrics: Arc::new(NoMetrics),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeEnhancer>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    // ==================== Preparation ====================

    /// Resolve the profile and adapters for a query.
    ///
    /// Every failure here happens before any backend is contacted.
    pub(crate) async fn prepare(&self, query: Query) -> Result<PreparedQuery, CouncilError> {
        let profile = self.catalog.lookup(query.domain())?.clone();

        let adapters = profile
            .backends
            .iter()
            .map(|spec| {
                self.registry
                    .get(&spec.provider)
                    .ok_or_else(|| DomainError::UnregisteredProvider {
                        domain: profile.domain.to_string(),
                        provider: spec.provider.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let knowledge = self
            .knowledge
            .get_context(query.text(), query.domain())
            .await;
        let context = (!knowledge.is_empty()).then_some(knowledge.text.as_str());
        let expert_prompt = PromptTemplate::expert_query(query.text(), context);
        let knowledge_sources = if knowledge.is_empty() {
            Vec::new()
        } else {
            debug!("Knowledge context from {} source(s)", knowledge.sources.len());
            knowledge.sources
        };

        Ok(PreparedQuery {
            query_id: Uuid::new_v4().to_string(),
            query,
            profile,
            adapters,
            expert_prompt,
            knowledge_sources,
        })
    }

    // ==================== Stage 1 ====================

    /// Ask every backend of the profile concurrently.
    ///
    /// Returns exactly one answer per backend, in profile order.
    pub(crate) async fn run_experts(
        &self,
        prepared: &PreparedQuery,
        progress: &dyn ProgressNotifier,
    ) -> Vec<ExpertAnswer> {
        self.run_experts_observed(prepared, progress, &|_, _| {}).await
    }

    /// [`run_experts`](Self::run_experts), calling `on_settled` with the
    /// profile index of each answer as soon as it settles.
    pub(crate) async fn run_experts_observed(
        &self,
        prepared: &PreparedQuery,
        progress: &dyn ProgressNotifier,
        on_settled: &(dyn Fn(usize, &ExpertAnswer) + Send + Sync),
    ) -> Vec<ExpertAnswer> {
        let backends = &prepared.profile.backends;
        info!(
            query_id = %prepared.query_id,
            "Stage 1: consulting {} experts",
            backends.len()
        );
        progress.on_stage_start(Stage::Experts, backends.len());

        let mut join_set = JoinSet::new();

        for (index, (spec, adapter)) in backends.iter().zip(&prepared.adapters).enumerate() {
            let adapter = Arc::clone(adapter);
            let model = spec.model.clone();
            let system = prepared.profile.system_prompt.clone();
            let user = prepared.expert_prompt.clone();

            join_set.spawn(async move {
                let started = Instant::now();
                let result = adapter.generate(&model, &system, &user).await;
                (index, result, started.elapsed())
            });
        }

        let mut slots: Vec<Option<ExpertAnswer>> = vec![None; backends.len()];

        while let Some(joined) = join_set.join_next().await {
            let (index, result, latency) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!("Stage 1 task did not complete: {}", e);
                    continue;
                }
            };
            let spec = &backends[index];

            let answer = match result {
                Ok(completion) => {
                    debug!("{} answered in {:?}", spec, latency);
                    self.metrics.record_token_usage(
                        &prepared.query_id,
                        &spec.provider,
                        &spec.model,
                        completion.token_count(),
                    );
                    ExpertAnswer::success(&spec.provider, &spec.model, completion.text)
                }
                Err(e) => {
                    warn!("{} failed: {}", spec, e);
                    ExpertAnswer::failure(&spec.provider, &spec.model, e)
                }
            };

            self.metrics.record_provider_outcome(
                &prepared.query_id,
                &spec.provider,
                answer.succeeded,
                latency,
            );
            progress.on_task_complete(Stage::Experts, &spec.provider, answer.succeeded);
            on_settled(index, &answer);
            slots[index] = Some(answer);
        }

        let answers: Vec<ExpertAnswer> = slots
            .into_iter()
            .zip(backends)
            .enumerate()
            .map(|(index, (slot, spec))| {
                slot.unwrap_or_else(|| {
                    progress.on_task_complete(Stage::Experts, &spec.provider, false);
                    let answer =
                        ExpertAnswer::failure(&spec.provider, &spec.model, "task did not complete");
                    on_settled(index, &answer);
                    answer
                })
            })
            .collect();

        for answer in &answers {
            self.log_answer(prepared, answer);
        }

        progress.on_stage_complete(Stage::Experts);
        answers
    }

    // ==================== Stage 2 ====================

    /// Have every successful expert rank every other successful answer.
    ///
    /// With N successful answers this yields N×(N−1) reviews ordered by
    /// (reviewer, target) in profile order, or none when N < 2.
    pub(crate) async fn run_reviews(
        &self,
        prepared: &PreparedQuery,
        answers: &[ExpertAnswer],
        progress: &dyn ProgressNotifier,
    ) -> Vec<PeerReview> {
        let experts: Vec<(usize, &ExpertAnswer)> = answers
            .iter()
            .enumerate()
            .filter(|(_, answer)| answer.succeeded)
            .collect();

        if experts.len() < 2 {
            debug!(
                "Skipping peer review with {} successful answer(s)",
                experts.len()
            );
            progress.on_stage_skipped(Stage::Review, "fewer than two successful answers");
            return Vec::new();
        }

        let scale = experts.len() as u32;
        let pairs: Vec<(usize, usize)> = (0..experts.len())
            .flat_map(|r| {
                (0..experts.len())
                    .filter(move |&t| t != r)
                    .map(move |t| (r, t))
            })
            .collect();

        info!(
            query_id = %prepared.query_id,
            "Stage 2: {} peer reviews",
            pairs.len()
        );
        progress.on_stage_start(Stage::Review, pairs.len());

        let mut join_set = JoinSet::new();

        for (slot, &(r, t)) in pairs.iter().enumerate() {
            let (reviewer_index, reviewer) = experts[r];
            let target = experts[t].1;
            let adapter = Arc::clone(&prepared.adapters[reviewer_index]);
            let model = reviewer.model.clone();
            let user = PromptTemplate::review_prompt(
                prepared.query.text(),
                &PromptTemplate::answer_label(t),
                &target.text,
                scale,
            );

            join_set.spawn(async move {
                let started = Instant::now();
                let result = adapter
                    .generate(&model, PromptTemplate::review_system(), &user)
                    .await;
                (slot, result, started.elapsed())
            });
        }

        let mut slots: Vec<Option<PeerReview>> = vec![None; pairs.len()];

        while let Some(joined) = join_set.join_next().await {
            let (slot, result, latency) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!("Stage 2 task did not complete: {}", e);
                    continue;
                }
            };
            let (r, t) = pairs[slot];
            let reviewer = experts[r].1;
            let target = experts[t].1;

            self.metrics.record_provider_outcome(
                &prepared.query_id,
                &reviewer.provider,
                result.is_ok(),
                latency,
            );

            let review = match result {
                Ok(completion) => {
                    self.metrics.record_token_usage(
                        &prepared.query_id,
                        &reviewer.provider,
                        &reviewer.model,
                        completion.token_count(),
                    );
                    Self::parse_review(reviewer, target, scale, &completion)
                }
                Err(e) => {
                    warn!(
                        "Review of {} by {} failed: {}",
                        target.provider, reviewer.provider, e
                    );
                    Self::failed_review(reviewer, target, scale, e)
                }
            };

            progress.on_task_complete(
                Stage::Review,
                &format!("{} -> {}", reviewer.provider, target.provider),
                review.status != ReviewStatus::Failed,
            );
            slots[slot] = Some(review);
        }

        let reviews: Vec<PeerReview> = slots
            .into_iter()
            .zip(&pairs)
            .map(|(slot, &(r, t))| {
                slot.unwrap_or_else(|| {
                    Self::failed_review(experts[r].1, experts[t].1, scale, "task did not complete")
                })
            })
            .collect();

        for review in &reviews {
            self.log_review(prepared, review);
        }

        progress.on_stage_complete(Stage::Review);
        reviews
    }

    fn parse_review(
        reviewer: &ExpertAnswer,
        target: &ExpertAnswer,
        scale: u32,
        completion: &Completion,
    ) -> PeerReview {
        let (verdict, status) = rank_or_default(&completion.text, scale);
        if status == ReviewStatus::Unparseable {
            warn!(
                "No rank in {}'s review of {}; using default rank {}",
                reviewer.provider, target.provider, verdict.rank
            );
        }
        PeerReview::new(
            &reviewer.provider,
            &target.provider,
            verdict.rank,
            verdict.reasoning,
        )
        .with_status(status)
    }

    fn failed_review(
        reviewer: &ExpertAnswer,
        target: &ExpertAnswer,
        scale: u32,
        error: impl Display,
    ) -> PeerReview {
        PeerReview::new(
            &reviewer.provider,
            &target.provider,
            default_rank(scale),
            format!("{} {}", ERROR_MARKER, error),
        )
        .with_status(ReviewStatus::Failed)
    }

    // ==================== Stage 3 ====================

    /// Index into `answers` of the backend that should synthesize
    pub(crate) fn choose_synthesizer(
        answers: &[ExpertAnswer],
        reviews: &[PeerReview],
    ) -> Result<usize, CouncilError> {
        let candidates: Vec<&str> = answers
            .iter()
            .filter(|answer| answer.succeeded)
            .map(|answer| answer.provider.as_str())
            .collect();

        let provider =
            select_synthesizer(&candidates, reviews).ok_or(CouncilError::NoSuccessfulAnswers)?;

        answers
            .iter()
            .position(|answer| answer.succeeded && answer.provider == provider)
            .ok_or(CouncilError::NoSuccessfulAnswers)
    }

    /// Blocking synthesis by `answers[synthesizer]`
    pub(crate) async fn synthesize(
        &self,
        prepared: &PreparedQuery,
        synthesizer: usize,
        answers: &[ExpertAnswer],
        reviews: &[PeerReview],
    ) -> Result<SynthesisResult, CouncilError> {
        let chosen = &answers[synthesizer];
        let user = PromptTemplate::synthesis_prompt(prepared.query.text(), answers, reviews);

        let started = Instant::now();
        let result = prepared.adapters[synthesizer]
            .generate(&chosen.model, &prepared.synthesis_system(), &user)
            .await;
        self.metrics.record_provider_outcome(
            &prepared.query_id,
            &chosen.provider,
            result.is_ok(),
            started.elapsed(),
        );

        let completion = result.map_err(|e| CouncilError::Synthesis {
            provider: chosen.provider.clone(),
            message: e.to_string(),
        })?;
        self.metrics.record_token_usage(
            &prepared.query_id,
            &chosen.provider,
            &chosen.model,
            completion.token_count(),
        );

        Ok(SynthesisResult::new(
            &chosen.provider,
            &chosen.model,
            completion.text,
        ))
    }

    /// Open the synthesis stream of `answers[synthesizer]`
    pub(crate) async fn open_synthesis_stream(
        &self,
        prepared: &PreparedQuery,
        synthesizer: usize,
        answers: &[ExpertAnswer],
        reviews: &[PeerReview],
    ) -> Result<TextStream, CouncilError> {
        let chosen = &answers[synthesizer];
        let user = PromptTemplate::synthesis_prompt(prepared.query.text(), answers, reviews);

        prepared.adapters[synthesizer]
            .stream_generate(&chosen.model, &prepared.synthesis_system(), &user)
            .await
            .map_err(|e| {
                self.metrics.record_provider_outcome(
                    &prepared.query_id,
                    &chosen.provider,
                    false,
                    Duration::ZERO,
                );
                CouncilError::Synthesis {
                    provider: chosen.provider.clone(),
                    message: e.to_string(),
                }
            })
    }

    // ==================== Recording ====================

    pub(crate) fn record_stage(&self, prepared: &PreparedQuery, stage: Stage, duration: Duration) {
        debug!(
            query_id = %prepared.query_id,
            "{} finished in {:?}",
            stage,
            duration
        );
        self.metrics
            .record_stage_duration(&prepared.query_id, stage, duration);
    }

    pub(crate) fn record_synthesis_stream(
        &self,
        prepared: &PreparedQuery,
        synthesis: &SynthesisResult,
        duration: Duration,
    ) {
        self.metrics.record_provider_outcome(
            &prepared.query_id,
            &synthesis.provider,
            true,
            duration,
        );
        self.metrics.record_token_usage(
            &prepared.query_id,
            &synthesis.provider,
            &synthesis.model,
            Completion::new(synthesis.synthesis.as_str()).token_count(),
        );
    }

    fn log_answer(&self, prepared: &PreparedQuery, answer: &ExpertAnswer) {
        self.conversation_logger.log(ConversationEvent::new(
            "expert_answer",
            json!({
                "query_id": prepared.query_id,
                "conversation_id": prepared.query.conversation_id(),
                "domain": prepared.query.domain(),
                "provider": answer.provider,
                "model": answer.model,
                "succeeded": answer.succeeded,
                "text": answer.text,
            }),
        ));
    }

    fn log_review(&self, prepared: &PreparedQuery, review: &PeerReview) {
        self.conversation_logger.log(ConversationEvent::new(
            "peer_review",
            json!({
                "query_id": prepared.query_id,
                "conversation_id": prepared.query.conversation_id(),
                "reviewer": review.reviewer,
                "target": review.target,
                "rank": review.rank,
                "status": review.status,
                "reasoning": review.reasoning,
            }),
        ));
    }

    pub(crate) fn log_synthesis(&self, prepared: &PreparedQuery, synthesis: &SynthesisResult) {
        self.conversation_logger.log(ConversationEvent::new(
            "synthesis",
            json!({
                "query_id": prepared.query_id,
                "conversation_id": prepared.query.conversation_id(),
                "provider": synthesis.provider,
                "model": synthesis.model,
                "text": synthesis.synthesis,
            }),
        ));
    }
}
