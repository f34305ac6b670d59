//! Shared stubs for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use reelforge::adapters::{
    ArtifactStore, DerivationError, GenerationError, IdeaSource, JobOutcome, Ledger, LedgerError,
    PromptDeriver, PublishError, Publisher, RemoteJobClient, StorageError,
};
use reelforge::core::{BackoffPolicy, Collaborators, Orchestrator};
use reelforge::domain::{
    Artifact, FailureStage, GenerationPrompt, Idea, PublishedVideo, RenderedMedia,
};

pub fn idea(title: &str) -> Idea {
    Idea {
        title: title.to_string(),
        description: format!("{} explained", title),
        hook: "Nobody tells you this".to_string(),
        target_audience: "Young professionals".to_string(),
        virality_score: 7,
        keywords: vec!["mindset".to_string(), "growth".to_string()],
    }
}

pub fn ideas(titles: &[&str]) -> Vec<Idea> {
    titles.iter().map(|t| idea(t)).collect()
}

pub fn policy(max_attempts: u32, base_wait_secs: u64) -> BackoffPolicy {
    BackoffPolicy {
        max_attempts,
        base_wait: Duration::from_secs(base_wait_secs),
        call_timeout: Duration::from_secs(300),
    }
}

pub fn ready() -> JobOutcome {
    JobOutcome::Ready(RenderedMedia::mp4(vec![0u8; 64]))
}

/// One scripted answer from the render backend
#[derive(Debug, Clone)]
pub enum Step {
    Answer(JobOutcome),
    /// Never completes, so the call timeout fires
    Hang,
}

/// Render backend that replays a script and records when it was called
///
/// Once the script runs out the last step repeats.
pub struct ScriptedRenderer {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedRenderer {
    pub fn new(script: Vec<Step>) -> Self {
        let last = script
            .last()
            .cloned()
            .unwrap_or(Step::Answer(JobOutcome::NotReady));
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answers(outcomes: Vec<JobOutcome>) -> Self {
        Self::new(outcomes.into_iter().map(Step::Answer).collect())
    }

    pub fn always(outcome: JobOutcome) -> Self {
        Self::answers(vec![outcome])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time between consecutive calls
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl RemoteJobClient for ScriptedRenderer {
    async fn submit_or_poll(&self, _prompt: &GenerationPrompt) -> JobOutcome {
        self.calls.lock().unwrap().push(Instant::now());

        let step = {
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(step) => {
                    *self.last.lock().unwrap() = step.clone();
                    step
                }
                None => self.last.lock().unwrap().clone(),
            }
        };

        match step {
            Step::Answer(outcome) => outcome,
            Step::Hang => std::future::pending().await,
        }
    }
}

pub struct StubIdeas {
    ideas: Vec<Idea>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl StubIdeas {
    pub fn new(ideas: Vec<Idea>) -> Self {
        Self {
            ideas,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ideas: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdeaSource for StubIdeas {
    async fn generate(&self, count: usize) -> Result<Vec<Idea>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::Upstream("rate limited".to_string()));
        }
        Ok(self.ideas.iter().take(count).cloned().collect())
    }
}

/// Derives `prompt for <title>`, failing for selected titles
#[derive(Default)]
pub struct StubPrompts {
    fail_titles: HashSet<String>,
    pub derived: Mutex<Vec<String>>,
}

impl StubPrompts {
    pub fn failing_for(titles: &[&str]) -> Self {
        Self {
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            derived: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.derived.lock().unwrap().len()
    }
}

#[async_trait]
impl PromptDeriver for StubPrompts {
    async fn derive(&self, idea: &Idea) -> Result<GenerationPrompt, DerivationError> {
        self.derived.lock().unwrap().push(idea.title.clone());
        if self.fail_titles.contains(&idea.title) {
            return Err(DerivationError::Empty);
        }
        Ok(GenerationPrompt::new(format!("prompt for {}", idea.title)))
    }
}

/// In-memory artifact store counting releases per artifact
#[derive(Default)]
pub struct CountingStore {
    persisted: AtomicUsize,
    pub releases: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingStore {
    pub fn persisted(&self) -> usize {
        self.persisted.load(Ordering::SeqCst)
    }

    pub fn release_counts(&self) -> Vec<usize> {
        let releases = self.releases.lock().unwrap();
        let mut counts: Vec<(PathBuf, usize)> =
            releases.iter().map(|(p, c)| (p.clone(), *c)).collect();
        counts.sort();
        counts.into_iter().map(|(_, c)| c).collect()
    }
}

#[async_trait]
impl ArtifactStore for CountingStore {
    async fn persist(
        &self,
        media: &RenderedMedia,
        _prompt: &GenerationPrompt,
    ) -> Result<Artifact, StorageError> {
        let n = self.persisted.fetch_add(1, Ordering::SeqCst) + 1;
        let path = PathBuf::from(format!("/artifacts/video_{}.mp4", n));
        self.releases.lock().unwrap().insert(path.clone(), 0);
        Ok(Artifact::new(
            path,
            media.content_type.clone(),
            media.len() as u64,
        ))
    }

    async fn release(&self, artifact: &Artifact) -> Result<(), StorageError> {
        *self
            .releases
            .lock()
            .unwrap()
            .entry(artifact.path.clone())
            .or_insert(0) += 1;
        Ok(())
    }
}

/// Publisher that fails for selected titles and can fire a cancel token
#[derive(Default)]
pub struct StubPublisher {
    fail_titles: HashSet<String>,
    cancel_on: Option<(String, CancellationToken)>,
    pub published: Mutex<Vec<String>>,
}

impl StubPublisher {
    pub fn failing_for(titles: &[&str]) -> Self {
        Self {
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Cancel `token` while publishing `title`
    pub fn cancelling_on(title: &str, token: CancellationToken) -> Self {
        Self {
            cancel_on: Some((title.to_string(), token)),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for StubPublisher {
    async fn publish(
        &self,
        _artifact: &Artifact,
        idea: &Idea,
    ) -> Result<PublishedVideo, PublishError> {
        self.published.lock().unwrap().push(idea.title.clone());

        if let Some((title, token)) = &self.cancel_on {
            if *title == idea.title {
                token.cancel();
            }
        }

        if self.fail_titles.contains(&idea.title) {
            return Err(PublishError::Upstream("quotaExceeded".to_string()));
        }

        let id = format!("vid-{}", idea.title.replace(' ', "-"));
        Ok(PublishedVideo {
            url: format!("https://youtube.com/watch?v={}", id),
            id,
        })
    }
}

/// What the orchestrator told the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logged {
    Idea(String),
    Video(String),
    Error(String, FailureStage),
}

/// Ledger that records calls, optionally failing every write
#[derive(Default)]
pub struct RecordingLedger {
    fail: bool,
    pub entries: Mutex<Vec<Logged>>,
}

impl RecordingLedger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<Logged> {
        self.entries.lock().unwrap().clone()
    }

    fn push(&self, entry: Logged) -> Result<(), LedgerError> {
        self.entries.lock().unwrap().push(entry);
        if self.fail {
            return Err(LedgerError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "ledger is read-only",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn log_idea(&self, idea: &Idea) -> Result<(), LedgerError> {
        self.push(Logged::Idea(idea.title.clone()))
    }

    async fn log_video(&self, idea: &Idea, _video: &PublishedVideo) -> Result<(), LedgerError> {
        self.push(Logged::Video(idea.title.clone()))
    }

    async fn log_error(
        &self,
        idea: &Idea,
        _reason: &str,
        stage: FailureStage,
    ) -> Result<(), LedgerError> {
        self.push(Logged::Error(idea.title.clone(), stage))
    }
}

/// All stubs wired into one orchestrator
pub struct Harness {
    pub ideas: Arc<StubIdeas>,
    pub prompts: Arc<StubPrompts>,
    pub renderer: Arc<ScriptedRenderer>,
    pub store: Arc<CountingStore>,
    pub publisher: Arc<StubPublisher>,
    pub ledger: Arc<RecordingLedger>,
}

impl Harness {
    pub fn new(titles: &[&str]) -> Self {
        Self {
            ideas: Arc::new(StubIdeas::new(ideas(titles))),
            prompts: Arc::new(StubPrompts::default()),
            renderer: Arc::new(ScriptedRenderer::always(ready())),
            store: Arc::new(CountingStore::default()),
            publisher: Arc::new(StubPublisher::default()),
            ledger: Arc::new(RecordingLedger::default()),
        }
    }

    pub fn orchestrator(&self, policy: BackoffPolicy) -> Orchestrator {
        Orchestrator::new(
            Collaborators {
                ideas: self.ideas.clone(),
                prompts: self.prompts.clone(),
                renderer: self.renderer.clone(),
                artifacts: self.store.clone(),
                publisher: self.publisher.clone(),
                ledger: self.ledger.clone(),
            },
            policy,
        )
    }
}
