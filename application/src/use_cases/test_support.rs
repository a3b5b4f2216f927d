//! Mock adapters shared by the use case tests.

use crate::ports::backend::{BackendAdapter, BackendError, BackendRegistry, Completion, TextStream};
use crate::use_cases::engine::CouncilEngine;
use async_trait::async_trait;
use council_domain::{Domain, DomainCatalog, DomainProfile, PromptTemplate};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted backend. Clones share their call counters.
#[derive(Clone)]
pub(crate) struct MockBackend {
    id: String,
    answer: Result<String, String>,
    review: Result<String, String>,
    synthesis: Result<Vec<String>, String>,
    delay: Duration,
    panic_on_answer: bool,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

enum Role {
    Expert,
    Reviewer,
    Synthesizer,
}

impl MockBackend {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            answer: Ok(format!("{} says: drink more water", id)),
            review: Ok(r#"{"rank": 1, "reasoning": "clear and correct"}"#.to_string()),
            synthesis: Ok(vec!["Council ".to_string(), "answer".to_string()]),
            delay: Duration::ZERO,
            panic_on_answer: false,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(id: &str, message: &str) -> Self {
        let mut backend = Self::new(id);
        backend.answer = Err(message.to_string());
        backend
    }

    pub fn with_review(mut self, text: &str) -> Self {
        self.review = Ok(text.to_string());
        self
    }

    pub fn with_failing_review(mut self) -> Self {
        self.review = Err("review refused".to_string());
        self
    }

    pub fn with_synthesis(mut self, fragments: &[&str]) -> Self {
        self.synthesis = Ok(fragments.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_failing_synthesis(mut self) -> Self {
        self.synthesis = Err("synthesis refused".to_string());
        self
    }

    /// Delay applied to stage-1 answers only
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_answer = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn role(system: &str) -> Role {
        if system == PromptTemplate::review_system() {
            Role::Reviewer
        } else if system.contains(PromptTemplate::synthesis_system()) {
            Role::Synthesizer
        } else {
            Role::Expert
        }
    }

    fn record(&self, user: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user.to_string());
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn generate(
        &self,
        _model: &str,
        system: &str,
        user: &str,
    ) -> Result<Completion, BackendError> {
        self.record(user);
        let text = match Self::role(system) {
            Role::Expert => {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if self.panic_on_answer {
                    panic!("{} crashed", self.id);
                }
                self.answer.clone()
            }
            Role::Reviewer => self.review.clone(),
            Role::Synthesizer => self.synthesis.clone().map(|fragments| fragments.concat()),
        };
        text.map(Completion::new).map_err(BackendError::Other)
    }

    async fn stream_generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<TextStream, BackendError> {
        match Self::role(system) {
            Role::Synthesizer => {
                self.record(user);
                let fragments = self.synthesis.clone().map_err(BackendError::Other)?;
                Ok(stream::iter(fragments.into_iter().map(Ok)).boxed())
            }
            _ => {
                let completion = self.generate(model, system, user).await?;
                Ok(stream::once(async move { Ok(completion.text) }).boxed())
            }
        }
    }
}

pub(crate) fn profile(domain: Domain, providers: &[&str]) -> DomainProfile {
    providers.iter().fold(
        DomainProfile::new(domain, "You are a careful expert."),
        |profile, provider| profile.with_backend(*provider, format!("{}-model", provider)),
    )
}

pub(crate) fn engine_with(backends: &[&MockBackend], profiles: Vec<DomainProfile>) -> CouncilEngine {
    let mut registry = BackendRegistry::new();
    for backend in backends {
        registry.register(Arc::new((*backend).clone()));
    }
    let catalog = profiles
        .into_iter()
        .fold(DomainCatalog::new(), DomainCatalog::with_profile);
    CouncilEngine::new(Arc::new(registry), Arc::new(catalog))
}
