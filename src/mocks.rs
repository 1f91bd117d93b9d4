//! Scripted collaborator fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::api::{
    AnswerFeedback, BioTone, CareerApi, ContentDraft, ContentItem, ContentKind, JobPosting,
};
use crate::auth::{AuthManager, BridgeEvent, BridgeSession, CredentialStore, IdentityBridge};
use crate::capture::{RecognizerEvent, Segment, SpeechRecognizer};
use crate::error::Result;

type Queue<T> = Mutex<VecDeque<Result<T>>>;

/// Scripted [`CareerApi`] whose per-endpoint outcomes are queued by the
/// test. A call with no queued outcome panics, so unexpected remote
/// traffic fails loudly.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<String>>,
    fetch_content: Queue<ContentItem>,
    list_content: Queue<Vec<ContentItem>>,
    save_content: Queue<ContentItem>,
    update_title: Queue<ContentItem>,
    delete_content: Queue<()>,
    generate_cover_letter: Queue<String>,
    generate_bio: Queue<String>,
    generate_questions: Queue<Vec<String>>,
    analyze_answer: Queue<AnswerFeedback>,
    list_jobs: Queue<Vec<JobPosting>>,
    match_jobs: Queue<Vec<JobPosting>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn take<T>(queue: &Queue<T>, name: &str) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted outcome left for {name}"))
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn push_fetch_content(&self, outcome: Result<ContentItem>) {
        self.fetch_content.lock().unwrap().push_back(outcome);
    }

    pub fn push_list_content(&self, outcome: Result<Vec<ContentItem>>) {
        self.list_content.lock().unwrap().push_back(outcome);
    }

    pub fn push_save_content(&self, outcome: Result<ContentItem>) {
        self.save_content.lock().unwrap().push_back(outcome);
    }

    pub fn push_update_title(&self, outcome: Result<ContentItem>) {
        self.update_title.lock().unwrap().push_back(outcome);
    }

    pub fn push_delete_content(&self, outcome: Result<()>) {
        self.delete_content.lock().unwrap().push_back(outcome);
    }

    pub fn push_generate_cover_letter(&self, outcome: Result<String>) {
        self.generate_cover_letter.lock().unwrap().push_back(outcome);
    }

    pub fn push_generate_bio(&self, outcome: Result<String>) {
        self.generate_bio.lock().unwrap().push_back(outcome);
    }

    pub fn push_generate_questions(&self, outcome: Result<Vec<String>>) {
        self.generate_questions.lock().unwrap().push_back(outcome);
    }

    pub fn push_analyze_answer(&self, outcome: Result<AnswerFeedback>) {
        self.analyze_answer.lock().unwrap().push_back(outcome);
    }

    pub fn push_list_jobs(&self, outcome: Result<Vec<JobPosting>>) {
        self.list_jobs.lock().unwrap().push_back(outcome);
    }

    pub fn push_match_jobs(&self, outcome: Result<Vec<JobPosting>>) {
        self.match_jobs.lock().unwrap().push_back(outcome);
    }
}

#[async_trait]
impl CareerApi for ScriptedApi {
    async fn login(&self, _email: &str, _password: &str) -> Result<String> {
        panic!("unexpected call: login");
    }

    async fn signup(&self, _email: &str, _password: &str) -> Result<()> {
        panic!("unexpected call: signup");
    }

    async fn list_content(&self, _token: &str) -> Result<Vec<ContentItem>> {
        self.record("list_content");
        Self::take(&self.list_content, "list_content")
    }

    async fn fetch_content(&self, _token: &str, _id: u64) -> Result<ContentItem> {
        self.record("fetch_content");
        Self::take(&self.fetch_content, "fetch_content")
    }

    async fn save_content(&self, _token: &str, _draft: &ContentDraft) -> Result<ContentItem> {
        self.record("save_content");
        Self::take(&self.save_content, "save_content")
    }

    async fn update_title(&self, _token: &str, _id: u64, _title: &str) -> Result<ContentItem> {
        self.record("update_title");
        Self::take(&self.update_title, "update_title")
    }

    async fn delete_content(&self, _token: &str, _id: u64) -> Result<()> {
        self.record("delete_content");
        Self::take(&self.delete_content, "delete_content")
    }

    async fn generate_cover_letter(
        &self,
        _token: &str,
        _job_description: &str,
        _user_info: &str,
    ) -> Result<String> {
        self.record("generate_cover_letter");
        Self::take(&self.generate_cover_letter, "generate_cover_letter")
    }

    async fn generate_bio(&self, _token: &str, _user_info: &str, _tone: BioTone) -> Result<String> {
        self.record("generate_bio");
        Self::take(&self.generate_bio, "generate_bio")
    }

    async fn generate_questions(
        &self,
        _token: &str,
        _cv_text: &str,
        _job_description: &str,
    ) -> Result<Vec<String>> {
        self.record("generate_questions");
        Self::take(&self.generate_questions, "generate_questions")
    }

    async fn analyze_answer(
        &self,
        _token: &str,
        _question: &str,
        _answer: &str,
    ) -> Result<AnswerFeedback> {
        self.record("analyze_answer");
        Self::take(&self.analyze_answer, "analyze_answer")
    }

    async fn list_jobs(&self, _token: &str) -> Result<Vec<JobPosting>> {
        self.record("list_jobs");
        Self::take(&self.list_jobs, "list_jobs")
    }

    async fn match_jobs(&self, _token: &str, _cv_text: &str) -> Result<Vec<JobPosting>> {
        self.record("match_jobs");
        Self::take(&self.match_jobs, "match_jobs")
    }
}

/// In-memory [`CredentialStore`].
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new(token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(token.map(str::to_string)),
        })
    }

    pub fn stored(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

impl CredentialStore for MemoryStore {
    fn load_token(&self) -> Result<Option<String>> {
        Ok(self.stored())
    }

    fn store_token(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

/// [`IdentityBridge`] that never answers the initial query and never
/// emits events, leaving the session exactly as restored.
pub struct HangingBridge {
    rx: async_channel::Receiver<BridgeEvent>,
}

impl HangingBridge {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = async_channel::unbounded();
        std::mem::forget(tx);
        Arc::new(Self { rx })
    }
}

#[async_trait]
impl IdentityBridge for HangingBridge {
    async fn current_session(&self) -> Result<Option<BridgeSession>> {
        std::future::pending().await
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    fn events(&self) -> async_channel::Receiver<BridgeEvent> {
        self.rx.clone()
    }
}

/// An [`AuthManager`] holding the given token, with a bridge that stays
/// silent for the whole test.
pub fn signed_in_auth(token: &str) -> Arc<AuthManager> {
    Arc::new(AuthManager::new(
        HangingBridge::new(),
        MemoryStore::new(Some(token)),
    ))
}

pub fn signed_out_auth() -> Arc<AuthManager> {
    Arc::new(AuthManager::new(HangingBridge::new(), MemoryStore::new(None)))
}

/// Scripted [`SpeechRecognizer`]. With `auto_end` set, every `stop`
/// request immediately produces [`RecognizerEvent::Ended`], like an
/// engine that winds down instantly.
pub struct ScriptedRecognizer {
    available: bool,
    start_fails: bool,
    auto_end: bool,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    tx: async_channel::Sender<RecognizerEvent>,
    rx: async_channel::Receiver<RecognizerEvent>,
}

impl ScriptedRecognizer {
    pub fn new() -> Arc<Self> {
        Self::with(true, false, false)
    }

    pub fn auto_ending() -> Arc<Self> {
        Self::with(true, false, true)
    }

    pub fn with(available: bool, start_fails: bool, auto_end: bool) -> Arc<Self> {
        let (tx, rx) = async_channel::unbounded();
        Arc::new(Self {
            available,
            start_fails,
            auto_end,
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            tx,
            rx,
        })
    }

    pub async fn emit(&self, event: RecognizerEvent) {
        self.tx.send(event).await.unwrap();
    }

    /// A cumulative result whose segments are all final.
    pub async fn emit_final(&self, texts: &[&str]) {
        self.emit(RecognizerEvent::Result {
            segments: texts.iter().map(|t| Self::final_segment(t)).collect(),
        })
        .await;
    }

    pub fn final_segment(text: &str) -> Segment {
        Segment {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn interim_segment(text: &str) -> Segment {
        Segment {
            text: text.into(),
            is_final: false,
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&self) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.start_fails {
            Err(crate::error::ClientError::CaptureDenied(
                "microphone denied".into(),
            ))
        } else {
            Ok(())
        }
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        if self.auto_end {
            let _ = self.tx.try_send(RecognizerEvent::Ended);
        }
    }

    fn events(&self) -> async_channel::Receiver<RecognizerEvent> {
        self.rx.clone()
    }
}

pub fn content_item(id: u64, title: &str) -> ContentItem {
    ContentItem {
        id,
        title: title.into(),
        body: format!("{title} body"),
        kind: ContentKind::CoverLetter,
        created_at: Utc::now(),
        source_cv_text: Some("ten years of backend work".into()),
        source_job_description: Some("senior backend role".into()),
    }
}

pub fn feedback(tag: &str) -> AnswerFeedback {
    AnswerFeedback {
        positive: format!("{tag}: good structure"),
        constructive: format!("{tag}: quantify the impact"),
        example_improvement: format!("{tag}: lead with the outcome"),
    }
}
