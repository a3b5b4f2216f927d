//! Stream Council use case
//!
//! Runs stages 1 and 2 in a background task and streams the stage-3
//! synthesis as it is generated.
//!
//! A stream is `Init, Token*, Complete`, or ends with a single `Error`. A
//! query that fails preparation yields only `Error`.
//!
//! Settled stage-1 answers reach the foreground through a watch channel.
//! The foreground waits for every expert up to
//! [`CouncilParams::first_answer_timeout`]; past that ceiling it goes on
//! with the answers that succeeded, and times out only if there are none.
//! The background task is cancelled when the stream is dropped.

use crate::config::CouncilParams;
use crate::ports::backend::TextStream;
use crate::ports::progress::NoProgress;
use crate::ports::stream_observer::StreamObserver;
use crate::use_cases::engine::{CouncilEngine, PreparedQuery, millis};
use crate::use_cases::error::CouncilError;
use council_domain::{
    CouncilEvent, ExpertAnswer, PeerReview, Query, Stage, StageTimings, SynthesisResult,
};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

pub type CouncilEventStream = BoxStream<'static, CouncilEvent>;

/// Use case for running a council with a streamed synthesis
pub struct StreamCouncilUseCase {
    engine: CouncilEngine,
    params: CouncilParams,
}

impl StreamCouncilUseCase {
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

    /// Start a streaming run.
    ///
    /// Nothing happens until the stream is polled. Each stream owns its own
    /// background task; concurrent streams share no mutable state.
    pub fn execute(&self, query: Query, observer: Arc<dyn StreamObserver>) -> CouncilEventStream {
        let run = StreamRun {
            engine: self.engine.clone(),
            params: self.params.clone(),
            observer,
            phase: Phase::Start(query),
        };

        stream::unfold(run, |mut run| async move {
            let event = run.next_event().await?;
            Some((event, run))
        })
        .boxed()
    }
}

/// Answers settled so far, indexed like the profile's backends
type ExpertSlots = Vec<Option<ExpertAnswer>>;

/// What the stage 1+2 task produced; `None` if it was cancelled
type ReviewOutcome = Option<StagesDone>;

struct StagesDone {
    answers: Vec<ExpertAnswer>,
    reviews: Vec<PeerReview>,
    review_time: Duration,
}

/// Handle on the stage 1+2 task. Dropping it cancels the task.
struct Background {
    handle: JoinHandle<ReviewOutcome>,
    _cancel: DropGuard,
}

struct AwaitingExperts {
    prepared: Arc<PreparedQuery>,
    slots_rx: watch::Receiver<ExpertSlots>,
    started: Instant,
    background: Background,
}

struct Synthesizing {
    prepared: Arc<PreparedQuery>,
    answers: Vec<ExpertAnswer>,
    stage1: Duration,
    /// Already joined when `await_reviews` is set
    reviews: Option<StagesDone>,
    background: Option<Background>,
    synthesizer: usize,
    tokens: TextStream,
    text: String,
    started: Instant,
}

enum Phase {
    Start(Query),
    AwaitingExperts(Box<AwaitingExperts>),
    Synthesizing(Box<Synthesizing>),
    Done,
}

struct StreamRun {
    engine: CouncilEngine,
    params: CouncilParams,
    observer: Arc<dyn StreamObserver>,
    phase: Phase,
}

impl StreamRun {
    async fn next_event(&mut self) -> Option<CouncilEvent> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Start(query) => return Some(self.start(query).await),
                Phase::AwaitingExperts(waiting) => match self.begin_synthesis(*waiting).await {
                    Ok(synthesizing) => {
                        self.phase = Phase::Synthesizing(Box::new(synthesizing));
                    }
                    Err(e) => return Some(self.fail(e)),
                },
                Phase::Synthesizing(mut synthesizing) => match synthesizing.tokens.next().await {
                    Some(Ok(fragment)) => {
                        if fragment.is_empty() {
                            self.phase = Phase::Synthesizing(synthesizing);
                            continue;
                        }
                        self.observer.on_token(&fragment);
                        synthesizing.text.push_str(&fragment);
                        self.phase = Phase::Synthesizing(synthesizing);
                        return Some(CouncilEvent::token(fragment));
                    }
                    Some(Err(e)) => {
                        let provider = synthesizing.answers[synthesizing.synthesizer]
                            .provider
                            .clone();
                        return Some(self.fail(CouncilError::Synthesis {
                            provider,
                            message: e.to_string(),
                        }));
                    }
                    None => return Some(self.finish(*synthesizing).await),
                },
                Phase::Done => return None,
            }
        }
    }

    /// Prepare the query and launch stages 1 and 2
    async fn start(&mut self, query: Query) -> CouncilEvent {
        let prepared = match self.engine.prepare(query).await {
            Ok(prepared) => Arc::new(prepared),
            Err(e) => return self.fail(e),
        };

        info!(
            query_id = %prepared.query_id,
            domain = %prepared.profile.domain,
            "Starting streaming council with {} experts",
            prepared.profile.backends.len()
        );

        let (slots_tx, slots_rx) = watch::channel(vec![None; prepared.profile.backends.len()]);
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let handle = tokio::spawn(run_stages(
            self.engine.clone(),
            Arc::clone(&prepared),
            self.params.enable_review,
            slots_tx,
            cancel.clone(),
        ));

        let init = CouncilEvent::Init {
            query_id: prepared.query_id.clone(),
            domain: prepared.query.domain().clone(),
        };

        self.phase = Phase::AwaitingExperts(Box::new(AwaitingExperts {
            prepared,
            slots_rx,
            started,
            background: Background {
                handle,
                _cancel: cancel.drop_guard(),
            },
        }));

        init
    }

    /// Wait for stage 1, choose the synthesizer and open its stream
    async fn begin_synthesis(
        &mut self,
        waiting: AwaitingExperts,
    ) -> Result<Synthesizing, CouncilError> {
        let AwaitingExperts {
            prepared,
            mut slots_rx,
            started,
            mut background,
        } = waiting;
        let waited = self.params.first_answer_timeout;

        let settled = timeout(waited, slots_rx.wait_for(|slots| slots.iter().all(Option::is_some)))
            .await
            .map(|ready| ready.is_ok());
        let slots = slots_rx.borrow().clone();
        let stage1 = started.elapsed();

        let answers = match settled {
            Ok(true) => settled_answers(&prepared, slots, "task did not complete"),
            Ok(false) => {
                return Err(CouncilError::Background(
                    "stage task ended before the expert answers were ready".to_string(),
                ));
            }
            Err(_) => {
                let answers = settled_answers(&prepared, slots, "timed out");
                if !answers.iter().any(|answer| answer.succeeded) {
                    return Err(CouncilError::Timeout { waited });
                }
                warn!(
                    query_id = %prepared.query_id,
                    "Going on with {} of {} experts after {:?}",
                    answers.iter().filter(|answer| answer.succeeded).count(),
                    answers.len(),
                    waited
                );
                answers
            }
        };

        self.engine.record_stage(&prepared, Stage::Experts, stage1);
        self.observer.on_stage1_complete(&answers);

        if !answers.iter().any(|answer| answer.succeeded) {
            return Err(CouncilError::NoSuccessfulAnswers);
        }

        let (answers, reviews, background) = if self.params.await_reviews {
            match timeout(waited, &mut background.handle).await {
                Ok(joined) => match self.review_outcome(joined) {
                    Some(done) => (done.answers.clone(), Some(done), None),
                    None => (answers, None, None),
                },
                Err(_) => return Err(CouncilError::Timeout { waited }),
            }
        } else {
            (answers, None, Some(background))
        };

        let ranked: &[PeerReview] = match &reviews {
            Some(done) => &done.reviews,
            None => &[],
        };
        let synthesizer = CouncilEngine::choose_synthesizer(&answers, ranked)?;
        info!(
            query_id = %prepared.query_id,
            "Stage 3: {} streams the synthesis",
            answers[synthesizer].provider
        );

        let started = Instant::now();
        let tokens = self
            .engine
            .open_synthesis_stream(&prepared, synthesizer, &answers, ranked)
            .await?;

        Ok(Synthesizing {
            prepared,
            answers,
            stage1,
            reviews,
            background,
            synthesizer,
            tokens,
            text: String::new(),
            started,
        })
    }

    /// Join the background task and build the completion marker
    async fn finish(&mut self, synthesizing: Synthesizing) -> CouncilEvent {
        let Synthesizing {
            prepared,
            answers,
            stage1,
            reviews,
            background,
            synthesizer,
            text,
            started,
            ..
        } = synthesizing;
        let stage3 = started.elapsed();

        let done = match (reviews, background) {
            (Some(done), _) => Some(done),
            (None, Some(mut background)) => {
                let waited = self.params.first_answer_timeout;
                match timeout(waited, &mut background.handle).await {
                    Ok(joined) => self.review_outcome(joined),
                    Err(_) => {
                        self.report(CouncilError::Timeout { waited });
                        None
                    }
                }
            }
            (None, None) => None,
        };

        let chosen = &answers[synthesizer];
        let synthesis = SynthesisResult::new(&chosen.provider, &chosen.model, text);

        // Late answers replace the placeholders once the task has joined
        let (answers, reviews, stage2) = match done {
            Some(done) => (done.answers, done.reviews, done.review_time),
            None => (answers, Vec::new(), Duration::ZERO),
        };

        self.engine.record_stage(&prepared, Stage::Review, stage2);
        self.engine.record_stage(&prepared, Stage::Synthesis, stage3);
        self.observer.on_stage2_complete(&reviews);

        self.engine
            .record_synthesis_stream(&prepared, &synthesis, stage3);
        self.engine.log_synthesis(&prepared, &synthesis);

        let timings = StageTimings::new(millis(stage1), millis(stage2), millis(stage3));
        info!(
            query_id = %prepared.query_id,
            "Streaming council finished in {}ms",
            timings.total_ms
        );

        CouncilEvent::Complete {
            query_id: prepared.query_id.clone(),
            stage1: answers,
            stage2: reviews,
            stage3: synthesis,
            timings,
            knowledge_sources: prepared.knowledge_sources.clone(),
            disclaimer: prepared.profile.disclaimer.clone(),
        }
    }

    /// Outcome of a joined background task. A failed task yields nothing;
    /// the failure goes to the observer.
    fn review_outcome(&self, joined: Result<ReviewOutcome, JoinError>) -> Option<StagesDone> {
        match joined {
            Ok(Some(done)) => Some(done),
            Ok(None) => {
                self.report(CouncilError::Background(
                    "review task was cancelled".to_string(),
                ));
                None
            }
            Err(e) => {
                self.report(CouncilError::Background(e.to_string()));
                None
            }
        }
    }

    /// A non-terminal failure
    fn report(&self, error: CouncilError) {
        warn!("{}", error);
        self.observer.on_error(&error);
    }

    /// A terminal failure; the stream ends after this event
    fn fail(&mut self, error: CouncilError) -> CouncilEvent {
        warn!("Streaming council failed: {}", error);
        self.observer.on_error(&error);
        self.phase = Phase::Done;
        CouncilEvent::error(error.to_string())
    }
}

/// Fill the slots that have not settled with failed answers
fn settled_answers(
    prepared: &PreparedQuery,
    slots: ExpertSlots,
    unsettled: &str,
) -> Vec<ExpertAnswer> {
    slots
        .into_iter()
        .zip(&prepared.profile.backends)
        .map(|(slot, spec)| {
            slot.unwrap_or_else(|| ExpertAnswer::failure(&spec.provider, &spec.model, unsettled))
        })
        .collect()
}

/// Stages 1 and 2, run off the foreground task
async fn run_stages(
    engine: CouncilEngine,
    prepared: Arc<PreparedQuery>,
    enable_review: bool,
    slots_tx: watch::Sender<ExpertSlots>,
    cancel: CancellationToken,
) -> ReviewOutcome {
    let stages = async {
        let publish = |index: usize, answer: &ExpertAnswer| {
            slots_tx.send_modify(|slots| slots[index] = Some(answer.clone()));
        };
        let answers = engine
            .run_experts_observed(&prepared, &NoProgress, &publish)
            .await;
        if slots_tx.is_closed() {
            debug!("Stream gone before stage 1 finished");
        }

        let started = Instant::now();
        let reviews = if enable_review {
            engine.run_reviews(&prepared, &answers, &NoProgress).await
        } else {
            Vec::new()
        };
        StagesDone {
            answers,
            reviews,
            review_time: started.elapsed(),
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(query_id = %prepared.query_id, "Stage task cancelled");
            None
        }
        outcome = stages => Some(outcome),
    }
}
