//! Run Council use case
//!
//! Blocking orchestration of the three-stage council flow:
//! `Experts → Review → Synthesis`, returning one [`CouncilResult`].

use crate::config::CouncilParams;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::use_cases::engine::{CouncilEngine, millis};
use crate::use_cases::error::CouncilError;
use council_domain::{CouncilResult, Query, Stage, StageTimings};
use std::time::Instant;
use tracing::info;

/// Use case for running a council and waiting for the full result
pub struct RunCouncilUseCase {
    engine: CouncilEngine,
    params: CouncilParams,
}

impl RunCouncilUseCase {
    pub fn new(engine: CouncilEngine) -> Self {
        Self {
            engine,
            params: CouncilParams::default(),
        }
    }

    pub fn with_params(mut self, params: CouncilParams) -> Self {
        self.params = params;
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, query: Query) -> Result<CouncilResult, CouncilError> {
        self.execute_with_progress(query, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        query: Query,
        progress: &dyn ProgressNotifier,
    ) -> Result<CouncilResult, CouncilError> {
        let prepared = self.engine.prepare(query).await?;

        info!(
            query_id = %prepared.query_id,
            domain = %prepared.profile.domain,
            "Starting council with {} experts",
            prepared.profile.backends.len()
        );

        // Stage 1: Expert answers
        let started = Instant::now();
        let answers = self.engine.run_experts(&prepared, progress).await;
        let stage1 = started.elapsed();
        self.engine.record_stage(&prepared, Stage::Experts, stage1);

        if !answers.iter().any(|answer| answer.succeeded) {
            return Err(CouncilError::NoSuccessfulAnswers);
        }

        // Stage 2: Peer review
        let started = Instant::now();
        let reviews = if self.params.enable_review {
            self.engine.run_reviews(&prepared, &answers, progress).await
        } else {
            progress.on_stage_skipped(Stage::Review, "peer review disabled");
            Vec::new()
        };
        let stage2 = started.elapsed();
        self.engine.record_stage(&prepared, Stage::Review, stage2);

        // Stage 3: Synthesis
        let synthesizer = CouncilEngine::choose_synthesizer(&answers, &reviews)?;
        let chosen = &answers[synthesizer].provider;
        info!(query_id = %prepared.query_id, "Stage 3: {} synthesizes", chosen);
        progress.on_stage_start(Stage::Synthesis, 1);

        let started = Instant::now();
        let result = self
            .engine
            .synthesize(&prepared, synthesizer, &answers, &reviews)
            .await;
        progress.on_task_complete(Stage::Synthesis, chosen, result.is_ok());
        let synthesis = result?;
        progress.on_stage_complete(Stage::Synthesis);
        let stage3 = started.elapsed();
        self.engine.record_stage(&prepared, Stage::Synthesis, stage3);
        self.engine.log_synthesis(&prepared, &synthesis);

        let timings = StageTimings::new(millis(stage1), millis(stage2), millis(stage3));
        info!(
            query_id = %prepared.query_id,
            "Council finished in {}ms",
            timings.total_ms
        );

        Ok(prepared.into_result(answers, reviews, synthesis, timings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
    use crate::ports::knowledge::{KnowledgeContext, KnowledgeEnhancer};
    use crate::ports::metrics::MetricsSink;
    use crate::use_cases::test_support::{MockBackend, engine_with, profile};
    use async_trait::async_trait;
    use council_domain::{Domain, DomainError, ERROR_MARKER};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct StaticKnowledge;

    #[async_trait]
    impl KnowledgeEnhancer for StaticKnowledge {
        async fn get_context(&self, _query: &str, domain: &Domain) -> KnowledgeContext {
            if *domain == Domain::Healthcare {
                KnowledgeContext::new(
                    "Hypertension is blood pressure of 130/80 mmHg or higher.",
                    vec!["guidelines/hypertension.md".to_string()],
                )
            } else {
                KnowledgeContext::empty()
            }
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressNotifier for RecordingProgress {
        fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {} {}", stage.as_str(), total_tasks));
        }

        fn on_task_complete(&self, stage: Stage, label: &str, success: bool) {
            self.events
                .lock()
                .unwrap()
                .push(format!("task {} {} {}", stage.as_str(), label, success));
        }

        fn on_stage_complete(&self, stage: Stage) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {}", stage.as_str()));
        }

        fn on_stage_skipped(&self, stage: Stage, _reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("skip {}", stage.as_str()));
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    #[derive(Default)]
    struct RecordingMetrics {
        stages: Mutex<Vec<Stage>>,
        outcomes: Mutex<Vec<(String, bool)>>,
    }

    impl MetricsSink for RecordingMetrics {
        fn record_stage_duration(&self, _query_id: &str, stage: Stage, _duration: Duration) {
            self.stages.lock().unwrap().push(stage);
        }

        fn record_token_usage(&self, _query_id: &str, _provider: &str, _model: &str, _tokens: u64) {}

        fn record_provider_outcome(
            &self,
            _query_id: &str,
            provider: &str,
            success: bool,
            _latency: Duration,
        ) {
            self.outcomes
                .lock()
                .unwrap()
                .push((provider.to_string(), success));
        }
    }

    fn hypertension() -> Query {
        Query::new("What is hypertension?", "healthcare").unwrap()
    }

    #[tokio::test]
    async fn test_hypertension_scenario() {
        // openai rates anthropic worse than anthropic rates openai
        let openai = MockBackend::new("openai").with_review(r#"{"rank": 2, "reasoning": "thin"}"#);
        let anthropic =
            MockBackend::new("anthropic").with_review(r#"{"rank": 1, "reasoning": "thorough"}"#);
        let engine = engine_with(
            &[&openai, &anthropic],
            vec![
                profile(Domain::Healthcare, &["openai", "anthropic"])
                    .with_disclaimer("Not medical advice."),
            ],
        );

        let result = RunCouncilUseCase::new(engine)
            .execute(hypertension())
            .await
            .unwrap();

        assert_eq!(result.domain, Domain::Healthcare);
        assert_eq!(result.original_query, "What is hypertension?");
        assert_eq!(result.stage1.len(), 2);
        assert!(result.stage1.iter().all(|a| a.succeeded));
        assert_eq!(result.stage2.len(), 2);
        assert_eq!(result.stage3.provider, "openai");
        assert_eq!(result.stage3.synthesis, "Council answer");
        assert_eq!(result.disclaimer.as_deref(), Some("Not medical advice."));
        assert_eq!(
            result.timings.total_ms,
            result.timings.stage1_ms + result.timings.stage2_ms + result.timings.stage3_ms
        );
    }

    #[tokio::test]
    async fn test_one_backend_failing() {
        let openai = MockBackend::new("openai");
        let anthropic = MockBackend::failing("anthropic", "connection refused");
        let engine = engine_with(
            &[&openai, &anthropic],
            vec![profile(Domain::Healthcare, &["openai", "anthropic"])],
        );

        let result = RunCouncilUseCase::new(engine)
            .execute(hypertension())
            .await
            .unwrap();

        assert_eq!(result.stage1.len(), 2);
        assert_eq!(result.failed_answers().count(), 1);
        assert_eq!(
            result.stage1[1].text,
            format!("{} Other error: connection refused", ERROR_MARKER)
        );
        assert!(result.stage2.is_empty());
        assert_eq!(result.stage3.provider, "openai");
        // The failed expert is never asked to review or synthesize
        assert_eq!(anthropic.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_domain_makes_no_backend_calls() {
        let openai = MockBackend::new("openai");
        let engine = engine_with(
            &[&openai],
            vec![profile(Domain::Healthcare, &["openai"])],
        );

        let err = RunCouncilUseCase::new(engine)
            .execute(Query::new("Will Mercury retrograde hurt me?", "astrology").unwrap())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CouncilError::Configuration(DomainError::UnknownDomain("astrology".to_string()))
        );
        assert_eq!(openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_three_backends_review_count() {
        let a = MockBackend::new("a");
        let b = MockBackend::new("b").with_review("3/3, misses the point");
        let c = MockBackend::failing("c", "quota exceeded");
        let d = MockBackend::new("d").with_review("garbled");
        let engine = engine_with(
            &[&a, &b, &c, &d],
            vec![profile(Domain::General, &["a", "b", "c", "d"])],
        );

        let result = RunCouncilUseCase::new(engine)
            .execute(Query::new("hello", "general").unwrap())
            .await
            .unwrap();

        assert_eq!(result.stage1.len(), 4);
        assert_eq!(result.successful_answers().count(), 3);
        assert_eq!(result.stage2.len(), 6);
        assert!(result.stage2.iter().all(|r| (1..=3).contains(&r.rank)));
        assert!(result.stage2.iter().all(|r| r.reviewer != "c" && r.target != "c"));
    }

    #[tokio::test]
    async fn test_all_backends_failing() {
        let a = MockBackend::failing("a", "down");
        let b = MockBackend::failing("b", "down");
        let engine = engine_with(&[&a, &b], vec![profile(Domain::General, &["a", "b"])]);

        let err = RunCouncilUseCase::new(engine)
            .execute(Query::new("hello", "general").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, CouncilError::NoSuccessfulAnswers);
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_fatal() {
        let a = MockBackend::new("a").with_failing_synthesis();
        let engine = engine_with(&[&a], vec![profile(Domain::General, &["a"])]);

        let err = RunCouncilUseCase::new(engine)
            .execute(Query::new("hello", "general").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, CouncilError::Synthesis { ref provider, .. } if provider == "a"));
    }

    #[tokio::test]
    async fn test_review_disabled() {
        let a = MockBackend::new("a");
        let b = MockBackend::new("b");
        let engine = engine_with(&[&a, &b], vec![profile(Domain::General, &["a", "b"])]);

        let result = RunCouncilUseCase::new(engine)
            .with_params(CouncilParams::default().with_review(false))
            .execute(Query::new("hello", "general").unwrap())
            .await
            .unwrap();

        assert!(result.stage2.is_empty());
        assert_eq!(result.stage3.provider, "a");
    }

    #[tokio::test]
    async fn test_knowledge_context_reaches_experts() {
        let openai = MockBackend::new("openai");
        let engine = engine_with(
            &[&openai],
            vec![profile(Domain::Healthcare, &["openai"])],
        )
        .with_knowledge(Arc::new(StaticKnowledge));

        let result = RunCouncilUseCase::new(engine)
            .execute(hypertension())
            .await
            .unwrap();

        assert_eq!(result.knowledge_sources, vec!["guidelines/hypertension.md"]);
        let first_prompt = &openai.prompts()[0];
        assert!(first_prompt.contains("130/80"));
        assert!(first_prompt.contains("What is hypertension?"));
    }

    #[tokio::test]
    async fn test_progress_logging_and_metrics() {
        let a = MockBackend::new("a");
        let b = MockBackend::new("b");
        let logger = Arc::new(RecordingLogger::default());
        let metrics = Arc::new(RecordingMetrics::default());
        let engine = engine_with(&[&a, &b], vec![profile(Domain::General, &["a", "b"])])
            .with_conversation_logger(logger.clone())
            .with_metrics(metrics.clone());
        let progress = RecordingProgress::default();

        RunCouncilUseCase::new(engine)
            .execute_with_progress(Query::new("hello", "general").unwrap(), &progress)
            .await
            .unwrap();

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(events.first().map(String::as_str), Some("start stage1 2"));
        assert!(events.contains(&"start stage2 2".to_string()));
        assert!(events.contains(&"task stage2 a -> b true".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("done stage3"));

        assert_eq!(
            *logger.events.lock().unwrap(),
            vec!["expert_answer", "expert_answer", "peer_review", "peer_review", "synthesis"]
        );
        assert_eq!(
            *metrics.stages.lock().unwrap(),
            vec![Stage::Experts, Stage::Review, Stage::Synthesis]
        );
        // 2 answers + 2 reviews + 1 synthesis
        assert_eq!(metrics.outcomes.lock().unwrap().len(), 5);
    }
}
