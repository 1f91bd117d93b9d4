use std::sync::Arc;

use tokio::sync::watch;

use crate::api::CareerApi;
use crate::auth::AuthManager;
use crate::capture::{CaptureEngine, CaptureEvent};
use crate::coach::state::{
    AnalysisState, CoachEvent, CoachStage, CoachState, QuestionReview, RecordingState,
};
use crate::error::ClientError;
use crate::task::TaskGuard;

/// Interview practice for one saved content item.
///
/// Drives the pipeline: fetch the item, generate questions from its
/// source texts, then record and analyze answers per question. All
/// traffic, whether user action, stage completion, or capture outcome,
/// lands in one event queue applied in order by a single driver task, so
/// per-question transitions never interleave.
///
/// The session borrows the shared [`CaptureEngine`]; at most one
/// question holds it at a time, and dropping the session releases it.
pub struct CoachSession {
    state: watch::Sender<CoachState>,
    events: async_channel::Sender<CoachEvent>,
    capture: Arc<CaptureEngine>,
    _driver: TaskGuard,
    _forwarder: TaskGuard,
}

impl CoachSession {
    pub fn new(
        content_id: u64,
        api: Arc<dyn CareerApi>,
        auth: Arc<AuthManager>,
        capture: Arc<CaptureEngine>,
    ) -> Self {
        let (state, _) = watch::channel(CoachState::new(content_id));
        let (events_tx, events_rx) = async_channel::unbounded();

        let capture_events = capture.capture_events();
        // Notifications queued while no session held the engine belong to
        // a previous holder, not to this one.
        while capture_events.try_recv().is_ok() {}
        let forward = events_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Ok(event) = capture_events.recv().await {
                if forward.send(CoachEvent::Capture(event)).await.is_err() {
                    break;
                }
            }
        });

        let driver = Driver {
            state: state.clone(),
            events: events_tx.clone(),
            api: api.clone(),
            auth: auth.clone(),
            capture: capture.clone(),
            pending_target: None,
            analysis_seqs: Vec::new(),
        };
        let driver = tokio::spawn(driver.run(events_rx));

        dispatch_load(events_tx.clone(), api, auth, content_id);

        Self {
            state,
            events: events_tx,
            capture,
            _driver: TaskGuard::new(driver),
            _forwarder: TaskGuard::new(forwarder),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CoachState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> CoachState {
        self.state.borrow().clone()
    }

    /// Toggle recording for one question: the active question stops, any
    /// other question becomes the new target once the engine lets go.
    pub fn toggle_recording(&self, index: usize) {
        let _ = self.events.try_send(CoachEvent::ToggleRecording(index));
    }
}

impl Drop for CoachSession {
    fn drop(&mut self) {
        // Release the shared engine if this session was holding it.
        self.capture.stop_listening();
    }
}

/// Stage 1: fetch the content item the session practices against.
fn dispatch_load(
    events: async_channel::Sender<CoachEvent>,
    api: Arc<dyn CareerApi>,
    auth: Arc<AuthManager>,
    content_id: u64,
) {
    tokio::spawn(async move {
        let outcome = match auth.token() {
            Some(token) => api.fetch_content(&token, content_id).await,
            None => Err(ClientError::Unauthorized),
        };
        let _ = events.send(CoachEvent::Loaded(outcome)).await;
    });
}

struct Driver {
    state: watch::Sender<CoachState>,
    events: async_channel::Sender<CoachEvent>,
    api: Arc<dyn CareerApi>,
    auth: Arc<AuthManager>,
    capture: Arc<CaptureEngine>,
    /// Question waiting to record once the engine finishes stopping.
    pending_target: Option<usize>,
    /// Monotonic per-question analysis counter; a completion whose seq
    /// is stale lost to a newer recording and is discarded.
    analysis_seqs: Vec<u64>,
}

impl Driver {
    async fn run(mut self, events: async_channel::Receiver<CoachEvent>) {
        while let Ok(event) = events.recv().await {
            self.handle(event).await;
        }
    }

    async fn handle(&mut self, event: CoachEvent) {
        match event {
            CoachEvent::Loaded(Ok(item)) => match item.generation_sources() {
                Some((cv, jd)) => {
                    log::info!("Loaded content item {}, generating questions", item.id);
                    let (cv, jd) = (cv.to_string(), jd.to_string());
                    self.state
                        .send_modify(|s| s.stage = CoachStage::GeneratingQuestions);
                    self.dispatch_questions(cv, jd);
                }
                None => {
                    log::error!("Content item {} lacks generation sources", item.id);
                    self.fail_load(ClientError::IncompleteSource.user_message());
                }
            },
            CoachEvent::Loaded(Err(e)) => {
                log::error!("Could not load content item: {e}");
                self.force_logout_if_unauthorized(&e).await;
                self.fail_load(e.user_message());
            }
            CoachEvent::QuestionsReady(Ok(questions)) => {
                log::info!("Generated {} interview questions", questions.len());
                self.analysis_seqs = vec![0; questions.len()];
                let reviews = vec![QuestionReview::default(); questions.len()];
                self.state.send_modify(move |s| {
                    s.reviews = reviews;
                    s.questions = questions;
                    s.stage = CoachStage::Ready;
                });
            }
            CoachEvent::QuestionsReady(Err(e)) => {
                log::error!("Question generation failed: {e}");
                self.force_logout_if_unauthorized(&e).await;
                self.fail_load(e.user_message());
            }
            CoachEvent::ToggleRecording(index) => {
                let (ready, active) = {
                    let s = self.state.borrow();
                    let ready = s.stage == CoachStage::Ready && index < s.questions.len();
                    (ready, s.recording_question())
                };
                if !ready {
                    return;
                }
                match active {
                    Some(current) if current == index => self.capture.stop_listening(),
                    Some(_) => {
                        self.pending_target = Some(index);
                        self.capture.stop_listening();
                    }
                    None => self.begin_recording(index),
                }
            }
            CoachEvent::Capture(CaptureEvent::Transcript(text)) => {
                let active = self.state.borrow().recording_question();
                if let Some(index) = active {
                    self.state.send_modify(move |s| {
                        if let Some(r) = s.reviews.get_mut(index) {
                            r.answer = text;
                        }
                    });
                }
            }
            CoachEvent::Capture(CaptureEvent::Stopped { transcript }) => {
                let active = self.state.borrow().recording_question();
                if let Some(index) = active {
                    self.finish_recording(index, transcript);
                }
                if let Some(next) = self.pending_target.take() {
                    self.begin_recording(next);
                }
            }
            CoachEvent::Capture(CaptureEvent::Failed(message)) => {
                log::error!("Speech capture failed: {message}");
                let active = self.state.borrow().recording_question();
                self.pending_target = None;
                self.state.send_modify(move |s| {
                    if let Some(r) = active.and_then(|i| s.reviews.get_mut(i)) {
                        r.recording = RecordingState::Idle;
                    }
                    s.error = Some(message);
                });
            }
            CoachEvent::Analyzed {
                index,
                seq,
                outcome,
            } => {
                if self.analysis_seqs.get(index).copied() != Some(seq) {
                    log::info!("Discarding superseded analysis for question {index}");
                    return;
                }
                match outcome {
                    Ok(feedback) => {
                        self.state.send_modify(move |s| {
                            if let Some(r) = s.reviews.get_mut(index) {
                                r.analysis = AnalysisState::Done;
                                r.feedback = Some(feedback);
                            }
                        });
                    }
                    Err(e) => {
                        log::error!("Answer analysis failed for question {index}: {e}");
                        self.force_logout_if_unauthorized(&e).await;
                        let message = e.user_message();
                        // Prior feedback stays until an analysis succeeds.
                        self.state.send_modify(move |s| {
                            if let Some(r) = s.reviews.get_mut(index) {
                                r.analysis = AnalysisState::Failed;
                            }
                            s.error = Some(message);
                        });
                    }
                }
            }
        }
    }

    fn begin_recording(&mut self, index: usize) {
        // The engine hears the request first, so a question showing as
        // recording implies the engine is already listening.
        self.capture.start_listening();
        self.state.send_modify(|s| {
            if let Some(r) = s.reviews.get_mut(index) {
                r.recording = RecordingState::Recording;
                r.answer.clear();
            }
        });
    }

    /// The engine released the episode for question `index`; a non-empty
    /// answer goes straight to analysis.
    fn finish_recording(&mut self, index: usize, transcript: String) {
        let question = self.state.borrow().questions.get(index).cloned();
        let analyze = !transcript.trim().is_empty() && question.is_some();
        let answer = transcript.clone();
        self.state.send_modify(move |s| {
            if let Some(r) = s.reviews.get_mut(index) {
                r.recording = RecordingState::Idle;
                r.answer = answer;
                if analyze {
                    r.analysis = AnalysisState::Analyzing;
                }
            }
        });
        if analyze {
            if let Some(question) = question {
                log::info!("Analyzing answer for question {index}");
                let seq = self.next_seq(index);
                self.dispatch_analysis(index, seq, question, transcript);
            }
        }
    }

    fn next_seq(&mut self, index: usize) -> u64 {
        match self.analysis_seqs.get_mut(index) {
            Some(slot) => {
                *slot += 1;
                *slot
            }
            None => 0,
        }
    }

    /// Stage 2: derive interview questions from the item's source texts.
    fn dispatch_questions(&self, cv_text: String, job_description: String) {
        let events = self.events.clone();
        let api = self.api.clone();
        let auth = self.auth.clone();
        tokio::spawn(async move {
            let outcome = match auth.token() {
                Some(token) => {
                    api.generate_questions(&token, &cv_text, &job_description)
                        .await
                }
                None => Err(ClientError::Unauthorized),
            };
            let _ = events.send(CoachEvent::QuestionsReady(outcome)).await;
        });
    }

    /// Stage 4: score one answer against its question.
    fn dispatch_analysis(&self, index: usize, seq: u64, question: String, answer: String) {
        let events = self.events.clone();
        let api = self.api.clone();
        let auth = self.auth.clone();
        tokio::spawn(async move {
            let outcome = match auth.token() {
                Some(token) => api.analyze_answer(&token, &question, &answer).await,
                None => Err(ClientError::Unauthorized),
            };
            let _ = events
                .send(CoachEvent::Analyzed {
                    index,
                    seq,
                    outcome,
                })
                .await;
        });
    }

    fn fail_load(&self, message: String) {
        self.state
            .send_modify(move |s| s.stage = CoachStage::LoadFailed(message));
    }

    async fn force_logout_if_unauthorized(&self, e: &ClientError) {
        if e.is_unauthorized() {
            log::warn!("Session token rejected, signing out");
            self.auth.logout().await;
        }
    }
}
